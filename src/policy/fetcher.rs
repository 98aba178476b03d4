//! Certificate retrieval boundary.

use crate::name::Name;
use crate::packet::Data;
use async_trait::async_trait;
use thiserror::Error;

/// Errors a [`CertificateFetcher`] may report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// No answer in time. The only error that is retried.
    #[error("timed out fetching {name}")]
    Timeout { name: Name },

    #[error("no certificate published under {name}")]
    NotFound { name: Name },

    #[error("fetching {name} failed: {reason}")]
    Failed { name: Name, reason: String },
}

/// Retrieves certificate data packets by key name.
///
/// Implemented by the network layer; tests use in-memory maps.
#[async_trait]
pub trait CertificateFetcher: Send + Sync {
    async fn fetch(&self, certificate_name: &Name) -> Result<Data, FetchError>;
}
