//! EC2 query API transport
//!
//! Encodes a flat parameter map as a form body, signs it, posts it to the
//! regional endpoint and runs the answer through the supplied parser.

use super::creds::AwsCreds;
use super::parser::{self, ResponseParser};
use super::signer::RequestSigner;
use crate::error::{sanitize_for_log, CloudError};
use crate::response::Response;
use anyhow::{Context, Result};
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// EC2 API version sent with every request
pub const API_VERSION: &str = "2016-11-15";

const CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Flat request parameters, e.g. `Action=CreateVolume`
pub type Params = BTreeMap<String, String>;

/// Signed HTTP client for one EC2 region
#[derive(Clone)]
pub struct Ec2Client {
    client: Client,
    creds: AwsCreds,
    signer: RequestSigner,
    endpoint: Url,
}

impl Ec2Client {
    /// Client for the public endpoint of `region`
    pub fn new(region: &str, creds: AwsCreds) -> Result<Self> {
        let endpoint = format!("https://ec2.{}.amazonaws.com/", region);
        Self::with_endpoint(region, creds, &endpoint)
    }

    /// Client for a custom endpoint (VPC endpoints, local test servers)
    pub fn with_endpoint(region: &str, creds: AwsCreds, endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("nimbus/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid EC2 endpoint: {}", endpoint))?;

        Ok(Self {
            client,
            creds,
            signer: RequestSigner::new("ec2", region),
            endpoint,
        })
    }

    /// Send one query API request and parse the answer
    pub async fn request(
        &self,
        mut params: Params,
        parser: &dyn ResponseParser,
    ) -> Result<Response> {
        params
            .entry("Version".to_string())
            .or_insert_with(|| API_VERSION.to_string());

        let action = params.get("Action").cloned().unwrap_or_default();
        tracing::debug!("POST {} Action={}", self.endpoint, action);

        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params.iter())
            .finish();

        let headers = self.signer.sign(
            "POST",
            &self.endpoint,
            CONTENT_TYPE,
            body.as_bytes(),
            &self.creds,
            chrono::Utc::now(),
        )?;

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(CloudError::from_reqwest)?;

        let status = response.status();
        let text = response.text().await.map_err(CloudError::from_reqwest)?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("EC2 API error: {} - {}", status, sanitize_for_log(&text));
            let (code, message) = parser::parse_error(&text)
                .unwrap_or_else(|| (status.as_str().to_string(), sanitize_for_log(&text)));
            return Err(CloudError::Provider {
                provider: "ec2",
                status: status.as_u16(),
                code,
                message,
            }
            .into());
        }

        let body = parser
            .parse(&text)
            .with_context(|| format!("Failed to parse {} response", action))?;

        Ok(Response::new(status.as_u16(), body))
    }
}
