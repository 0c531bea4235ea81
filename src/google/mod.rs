//! Google Compute Engine provider
//!
//! # Module Structure
//!
//! - [`auth`] - Access tokens and gcloud defaults
//! - [`client`] - Authenticated client and URL builders
//! - [`http`] - HTTP utilities for REST API calls
//! - [`mock`] - Simulated disk requests
//! - [`compute`] - Disk operations, live or mocked
//!
//! # Example
//!
//! ```ignore
//! use nimbus::google::{Compute, GcpClient};
//! use nimbus::service::DiskService;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let compute = Compute::live(GcpClient::new("my-project").await?);
//!     let disk = compute.get_disk("disk-1", "us-central1-a").await?;
//!     println!("{}", disk.body["status"]);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod compute;
pub mod http;
pub mod mock;

pub use client::GcpClient;
pub use compute::Compute;
