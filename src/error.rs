//! Unified error handling for the fleet-availability crate
//!
//! Module errors stay precise ([`LockError`], [`VerifyError`],
//! [`StoreError`], [`ConfigError`]); [`Error`] wraps them for code that
//! crosses module boundaries, such as the CLI.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fleet_availability::error::{Error, FleetErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Retrying: {err}");
//!     } else {
//!         eprintln!("Giving up: {err}");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::config::ConfigError;
pub use crate::coordinator::lock::{LockError, LockErrorKind};
pub use crate::registry::{TransportError, VerifyError};
pub use crate::storage::StoreError;

/// Common trait for all fleet-availability error types
pub trait FleetErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Remote dependency unreachable, slow or misbehaving
    Network,
    /// Persistence errors
    Storage,
    /// The slot is already taken
    Conflict,
    /// The request names something that cannot be booked
    Validation,
    /// Configuration errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Storage => "storage",
            Self::Conflict => "conflict",
            Self::Validation => "validation",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

impl FleetErrorTrait for LockError {
    fn is_recoverable(&self) -> bool {
        LockError::is_recoverable(self)
    }

    fn category(&self) -> ErrorCategory {
        match self.kind() {
            LockErrorKind::DependencyUnavailable => ErrorCategory::Network,
            LockErrorKind::StorageFailure => ErrorCategory::Storage,
            LockErrorKind::SlotAlreadyLocked => ErrorCategory::Conflict,
            LockErrorKind::ResourceNotFound
            | LockErrorKind::ResourceIneligible
            | LockErrorKind::RequesterRejected => ErrorCategory::Validation,
        }
    }
}

impl FleetErrorTrait for VerifyError {
    fn is_recoverable(&self) -> bool {
        self.is_transport()
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) => ErrorCategory::Network,
            Self::NotFound { .. } | Self::Ineligible { .. } => ErrorCategory::Validation,
        }
    }
}

impl FleetErrorTrait for StoreError {
    fn is_recoverable(&self) -> bool {
        !self.is_conflict() && !matches!(self, Self::CorruptRow { .. })
    }

    fn category(&self) -> ErrorCategory {
        if self.is_conflict() {
            ErrorCategory::Conflict
        } else {
            ErrorCategory::Storage
        }
    }
}

/// Unified error type for the fleet-availability crate
#[derive(Error, Debug)]
pub enum Error {
    /// Lock workflow failures
    #[error("Lock error: {0}")]
    Lock(#[from] LockError),

    /// Registry verification failures
    #[error("Registry error: {0}")]
    Verify(#[from] VerifyError),

    /// Reservation storage failures
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl FleetErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Lock(e) => FleetErrorTrait::is_recoverable(e),
            Self::Verify(e) => e.is_recoverable(),
            Self::Store(e) => e.is_recoverable(),
            Self::Config(_) => false,
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Http(_) => true,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Lock(e) => e.category(),
            Self::Verify(e) => e.category(),
            Self::Store(e) => e.category(),
            Self::Config(_) => ErrorCategory::Config,
            Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) | Self::Other { .. } => ErrorCategory::Other,
            Self::Http(_) => ErrorCategory::Network,
        }
    }
}

impl Error {
    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::lock::{Dependency, LockStage};
    use crate::models::{ResourceId, Slot};
    use chrono::NaiveDate;
    use std::time::Duration;

    fn slot() -> Slot {
        Slot::new(ResourceId(7), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
    }

    #[test]
    fn test_lock_error_category() {
        let conflict = Error::Lock(LockError::SlotAlreadyLocked {
            slot: slot(),
            stage: LockStage::Committing,
        });
        assert_eq!(conflict.category(), ErrorCategory::Conflict);
        assert!(!conflict.is_recoverable());

        let unavailable = Error::Lock(LockError::DependencyUnavailable {
            dependency: Dependency::ResourceRegistry,
            reason: "timed out".to_string(),
        });
        assert_eq!(unavailable.category(), ErrorCategory::Network);
        assert!(unavailable.is_recoverable());
    }

    #[test]
    fn test_verify_error_conversion() {
        let err: Error = VerifyError::from(TransportError::Timeout(Duration::from_secs(1))).into();
        assert!(matches!(err, Error::Verify(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_store_conflict_not_recoverable() {
        let err: Error = StoreError::SlotTaken { slot: slot() }.into();
        assert_eq!(err.category(), ErrorCategory::Conflict);
        assert!(!err.is_recoverable());

        let poisoned: Error = StoreError::LockPoisoned.into();
        assert_eq!(poisoned.category(), ErrorCategory::Storage);
        assert!(poisoned.is_recoverable());
    }

    #[test]
    fn test_config_error() {
        let err: Error = ConfigError::MissingField {
            field: "registry.url".to_string(),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_other_error() {
        let err = Error::other("Something went wrong");
        assert_eq!(err.category(), ErrorCategory::Other);
        assert_eq!(err.to_string(), "Something went wrong");
    }
}
