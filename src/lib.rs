//! fleet-availability - vehicle schedule locking
//!
//! Coordinates one-day reservations of vehicles whose eligibility is owned
//! by a remote vehicle registry.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`coordinator`] - Lock workflow, availability query and HTTP API
//! - [`registry`] - Vehicle registry client and verification capability
//! - [`identity`] - Requester verification extension point
//! - [`storage`] - Reservation persistence (SQLite)
//! - [`models`] - Core data structures and types
//! - [`metrics`] - Prometheus metrics
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use fleet_availability::config::Config;
//! use fleet_availability::coordinator::AvailabilityServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let server = AvailabilityServer::from_config(&config)?;
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::coordinator::{
        AvailabilityQuery, AvailabilityServer, LockError, LockErrorKind, ReservationCoordinator,
    };
    pub use crate::error::{Error, ErrorCategory, FleetErrorTrait, Result};
    pub use crate::identity::{NoopRequesterVerifier, RequesterVerifier};
    pub use crate::models::{Reservation, ResourceId, ResourceSnapshot, Slot};
    pub use crate::registry::{RegistryClient, ResourceVerifier, VerifyError};
    pub use crate::storage::{ReservationRepository, SqliteReservationRepository};
}

// Direct re-exports for convenience
pub use error::{Error, Result};
pub use models::{Reservation, ResourceId, Slot};
