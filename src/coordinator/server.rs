//! Availability server implementation
//!
//! Wires the coordinator into an axum router and runs it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::metrics;
use crate::registry::{RegistryClient, RegistryClientConfig};
use crate::storage;

use super::api::create_router;
use super::config::ServerConfig;
use super::lock::ReservationCoordinator;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Lock workflow and availability view
    pub coordinator: ReservationCoordinator,

    /// Server start time
    pub start_time: Instant,
}

// ============================================================================
// Availability Server
// ============================================================================

/// HTTP front end for the reservation coordinator
pub struct AvailabilityServer {
    config: ServerConfig,
    state: AppState,
}

impl AvailabilityServer {
    /// Create a server around an already assembled coordinator
    pub fn new(config: ServerConfig, coordinator: ReservationCoordinator) -> Self {
        let state = AppState {
            coordinator,
            start_time: Instant::now(),
        };

        Self { config, state }
    }

    /// Assemble store, registry client and coordinator from configuration
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::ConfigError(e.to_string()))?;

        let repo = storage::open_repository(&config.database)
            .map_err(|e| ServerError::InitError(format!("reservation store: {e}")))?;

        let registry = RegistryClient::new(RegistryClientConfig::from(&config.registry))
            .map_err(|e| ServerError::InitError(format!("registry client: {e}")))?;

        let coordinator = ReservationCoordinator::new(repo, Arc::new(registry));
        Ok(Self::new(config.server.clone(), coordinator))
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Start with graceful shutdown
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        if let Err(e) = metrics::init_metrics() {
            tracing::warn!(error = %e, "Metrics initialization failed, continuing without metrics");
        }

        let router = self.build_router();
        let addr = self.config.bind_address;

        tracing::info!("Starting availability server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        tracing::info!("Availability server shutdown complete");
        Ok(())
    }

    /// Start the server, stopping on ctrl-c
    pub async fn start(&self) -> Result<(), ServerError> {
        self.start_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            bind_address: self.config.bind_address,
            cors_enabled: self.config.enable_cors,
            request_logging_enabled: self.config.enable_request_logging,
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: SocketAddr,
    pub cors_enabled: bool,
    pub request_logging_enabled: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "Availability Server\n\
             {:-<40}\n\
             Bind Address: {}\n\
             CORS: {}\n\
             Request Logging: {}",
            "",
            self.bind_address,
            if self.cors_enabled { "enabled" } else { "disabled" },
            if self.request_logging_enabled { "enabled" } else { "disabled" }
        )
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),

    #[error("Failed to bind: {0}")]
    BindError(String),

    #[error("Server error: {0}")]
    ServeError(String),
}

// ============================================================================
// Tests
// ============================================================================
