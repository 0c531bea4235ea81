//! AWS Signature Version 4
//!
//! Signs a request by adding `X-Amz-Date`, `Authorization` and, for
//! temporary credentials, `X-Amz-Security-Token` headers. The signed header
//! set is fixed: `content-type`, `host`, `x-amz-date` and the session token
//! when present.

use super::creds::AwsCreds;
use crate::error::CloudError;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

#[derive(Debug, Clone)]
pub struct RequestSigner {
    service: String,
    region: String,
}

impl RequestSigner {
    pub fn new(service: &str, region: &str) -> Self {
        Self {
            service: service.to_string(),
            region: region.to_string(),
        }
    }

    /// Compute the headers to attach to a request
    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        content_type: &str,
        body: &[u8],
        creds: &AwsCreds,
        now: DateTime<Utc>,
    ) -> Result<Vec<(&'static str, String)>, CloudError> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        let host = host_header(url)?;

        let mut canonical_headers = vec![
            ("content-type", content_type.to_string()),
            ("host", host),
            ("x-amz-date", amz_date.clone()),
        ];
        if let Some(token) = creds.session_token() {
            canonical_headers.push(("x-amz-security-token", token.to_string()));
        }

        let signed_headers = canonical_headers
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(";");

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method,
            canonical_uri(url),
            canonical_query(url),
            canonical_headers
                .iter()
                .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
                .collect::<String>(),
            signed_headers,
            sha256_hex(body),
        );

        let scope = format!("{}/{}/{}/aws4_request", date, self.region, self.service);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            sha256_hex(canonical_request.as_bytes())
        );

        let key = signing_key(creds.secret_access_key(), &date, &self.region, &self.service)?;
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            creds.access_key_id(),
            scope,
            signed_headers,
            signature
        );

        let mut headers = vec![("x-amz-date", amz_date), ("authorization", authorization)];
        if let Some(token) = creds.session_token() {
            headers.push(("x-amz-security-token", token.to_string()));
        }

        Ok(headers)
    }
}

fn host_header(url: &Url) -> Result<String, CloudError> {
    let host = url
        .host_str()
        .ok_or_else(|| CloudError::Signature(format!("URL has no host: {}", url)))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn canonical_uri(url: &Url) -> &str {
    match url.path() {
        "" => "/",
        path => path,
    }
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            (
                urlencoding::encode(&k).into_owned(),
                urlencoding::encode(&v).into_owned(),
            )
        })
        .collect();
    pairs.sort();

    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CloudError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| CloudError::Signature(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the per-day, per-region, per-service signing key
pub(crate) fn signing_key(
    secret: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, CloudError> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}
