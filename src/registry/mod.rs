//! Resource registry (vehicle service) integration
//!
//! The registry owns vehicle records and their eligibility status. This
//! module exposes the verification capability the coordinator depends on
//! and an HTTP implementation of it.
//!
//! # Failure taxonomy
//!
//! | Variant                     | Meaning                                        |
//! |-----------------------------|------------------------------------------------|
//! | [`VerifyError::Transport`]  | unreachable, timed out, bad status, malformed  |
//! | [`VerifyError::NotFound`]   | registry answered with no record               |
//! | [`VerifyError::Ineligible`] | record exists, status is not `ACTIVE`          |

pub mod client;

use async_trait::async_trait;
use std::time::Duration;

use crate::models::{ResourceId, ResourceSnapshot};

pub use client::{RegistryClient, RegistryClientConfig, UNKNOWN_STATUS};

// ============================================================================
// Errors
// ============================================================================

/// Why a registry round trip produced no usable answer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No response within the configured bound
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection could not be established or was dropped
    #[error("registry unreachable: {0}")]
    Unreachable(String),

    /// Registry answered with a non-success HTTP status
    #[error("registry returned HTTP {status}")]
    HttpStatus { status: u16 },

    /// Body was not the expected shape
    #[error("malformed registry response: {0}")]
    Malformed(String),
}

/// Result of verifying one vehicle against the registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("vehicle {resource_id} not found in registry")]
    NotFound { resource_id: ResourceId },

    #[error("vehicle {label} ({resource_id}) is not bookable, status {status}")]
    Ineligible {
        resource_id: ResourceId,
        label: String,
        status: String,
    },
}

impl VerifyError {
    /// Transport failures are the only transient kind
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

// ============================================================================
// Verifier Capability
// ============================================================================

/// Capability to look up vehicles in the registry
///
/// Implementations perform exactly one attempt per call and must bound
/// their latency; a timeout is reported as [`TransportError::Timeout`].
#[async_trait]
pub trait ResourceVerifier: Send + Sync {
    /// Fetch the registry's view of a vehicle, `None` if it has no record
    async fn lookup(
        &self,
        resource_id: ResourceId,
    ) -> Result<Option<ResourceSnapshot>, VerifyError>;

    /// Require the vehicle to exist and be eligible
    async fn verify(&self, resource_id: ResourceId) -> Result<ResourceSnapshot, VerifyError> {
        let snapshot = self
            .lookup(resource_id)
            .await?
            .ok_or(VerifyError::NotFound { resource_id })?;

        if !snapshot.eligible {
            return Err(VerifyError::Ineligible {
                resource_id,
                label: snapshot.label,
                status: snapshot.status,
            });
        }

        Ok(snapshot)
    }
}
