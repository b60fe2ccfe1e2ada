//! Reservation coordination and its HTTP surface
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │               Availability Server             │
//! │                                               │
//! │  ┌─────────────────────────────────────────┐  │
//! │  │                REST API                 │  │
//! │  │  GET  /api/availability                 │  │
//! │  │  POST /api/schedules/lock               │  │
//! │  └─────────────────────────────────────────┘  │
//! │                      │                        │
//! │  ┌─────────────────────────────────────────┐  │
//! │  │        ReservationCoordinator           │  │
//! │  │  1. verify vehicle (registry, remote)   │  │
//! │  │  2. verify requester (extension point)  │  │
//! │  │  3. conflict check (AvailabilityQuery)  │  │
//! │  │  4. commit (ReservationRepository)      │  │
//! │  └─────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use fleet_availability::config::Config;
//! use fleet_availability::coordinator::AvailabilityServer;
//!
//! let config = Config::from_env()?;
//! let server = AvailabilityServer::from_config(&config)?;
//! server.start().await?;
//! ```

pub mod api;
pub mod availability;
pub mod config;
pub mod lock;
pub mod server;

// Re-export main types
pub use availability::AvailabilityQuery;
pub use config::ServerConfig;
pub use lock::{Dependency, LockError, LockErrorKind, LockStage, ReservationCoordinator};
pub use server::{AppState, AvailabilityServer, ServerError};
