//! AWS EC2 provider
//!
//! # Module Structure
//!
//! - [`creds`] - Access key credentials
//! - [`signer`] - Signature Version 4 request signing
//! - [`http`] - Signed query API transport
//! - [`parser`] - XML response parsing
//! - [`mock`] - Simulated volume requests
//! - [`ec2`] - Volume operations, live or mocked
//!
//! # Example
//!
//! ```ignore
//! use nimbus::aws::{Ec2, Ec2Client, AwsCreds};
//! use nimbus::service::VolumeService;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let client = Ec2Client::new("us-east-1", AwsCreds::from_env()?)?;
//!     let ec2 = Ec2::live(client);
//!     let response = ec2.create_volume(Some("us-east-1a"), Some(10), None).await?;
//!     println!("{}", response.body["volumeId"]);
//!     Ok(())
//! }
//! ```

pub mod creds;
pub mod ec2;
pub mod http;
pub mod mock;
pub mod parser;
pub mod signer;

pub use creds::AwsCreds;
pub use ec2::Ec2;
pub use http::Ec2Client;
