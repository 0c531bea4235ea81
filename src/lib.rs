//! nimbus: a small multi-provider cloud client
//!
//! Provider services ([`aws::Ec2`], [`google::Compute`]) implement the
//! capability traits in [`service`] and run either against the live API or
//! against a shared [`mock::MockStore`]. Typed models in [`model`] sit on top
//! of those traits.

pub mod aws;
pub mod config;
pub mod error;
pub mod google;
pub mod mock;
pub mod model;
pub mod response;
pub mod service;

pub use error::CloudError;
pub use mock::MockStore;
pub use response::Response;

/// Version injected at compile time via NIMBUS_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("NIMBUS_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
