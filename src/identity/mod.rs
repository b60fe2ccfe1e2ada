//! Requester eligibility extension point
//!
//! The lock workflow may consult an identity/reputation service before
//! committing a reservation. No such service is integrated yet, so the
//! coordinator defaults to [`NoopRequesterVerifier`].

use async_trait::async_trait;

/// Why a requester check did not pass
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequesterError {
    /// The identity service refused the requester
    #[error("requester {requester_id} rejected: {reason}")]
    Rejected { requester_id: String, reason: String },

    /// The identity service could not be consulted
    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

/// Capability to vet a requester before a reservation is written
#[async_trait]
pub trait RequesterVerifier: Send + Sync {
    async fn verify(&self, requester_id: &str) -> Result<(), RequesterError>;
}

/// Accepts every requester
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRequesterVerifier;

#[async_trait]
impl RequesterVerifier for NoopRequesterVerifier {
    async fn verify(&self, _requester_id: &str) -> Result<(), RequesterError> {
        Ok(())
    }
}
