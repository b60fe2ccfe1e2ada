//! HTTP client for the vehicle registry
//!
//! The registry speaks GraphQL over HTTP POST. Each lookup sends
//!
//! ```text
//! query { getVehicleById(id: N) { id model status } }
//! ```
//!
//! and expects `{"data": {"getVehicleById": {...} | null}}` back.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use crate::config::RegistryConfig;
use crate::metrics;
use crate::models::{ResourceId, ResourceSnapshot};

use super::{ResourceVerifier, TransportError, VerifyError};

// ============================================================================
// Client Configuration
// ============================================================================

/// Configuration for the registry client
#[derive(Debug, Clone)]
pub struct RegistryClientConfig {
    /// GraphQL endpoint of the vehicle service
    pub url: String,

    /// Upper bound for a whole request, connect through body
    pub timeout: Duration,

    /// Upper bound for establishing the connection
    pub connect_timeout: Duration,
}

impl RegistryClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        }
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl From<&RegistryConfig> for RegistryClientConfig {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            url: config.url.clone(),
            timeout: config.timeout(),
            connect_timeout: config.connect_timeout(),
        }
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Int(i64),
    Text(String),
}

impl WireId {
    fn into_i64(self) -> Option<i64> {
        match self {
            Self::Int(id) => Some(id),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VehicleRecord {
    id: WireId,
    model: Option<String>,
    status: Option<String>,
}

/// Status recorded for a vehicle whose registry status is null
pub const UNKNOWN_STATUS: &str = "UNKNOWN";

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

fn vehicle_query(resource_id: ResourceId) -> Value {
    json!({
        "query": format!(
            "query {{ getVehicleById(id: {}) {{ id model status }} }}",
            resource_id
        )
    })
}

/// Interpret a registry response body
///
/// Any GraphQL `errors` entry makes the answer unusable, even when `data`
/// carries a null record: resolvers that fail return exactly that shape.
fn parse_vehicle_response(
    resource_id: ResourceId,
    body: &Value,
) -> Result<Option<ResourceSnapshot>, TransportError> {
    let errors: Vec<GraphQlError> = body
        .get("errors")
        .cloned()
        .and_then(|e| serde_json::from_value(e).ok())
        .unwrap_or_default();
    if !errors.is_empty() {
        let reason = errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(TransportError::Malformed(reason));
    }

    let data = body
        .get("data")
        .filter(|data| !data.is_null())
        .ok_or_else(|| TransportError::Malformed("missing data field".to_string()))?;

    let record = data
        .get("getVehicleById")
        .ok_or_else(|| TransportError::Malformed("missing getVehicleById field".to_string()))?;

    if record.is_null() {
        return Ok(None);
    }

    let record: VehicleRecord = serde_json::from_value(record.clone())
        .map_err(|e| TransportError::Malformed(format!("vehicle record: {e}")))?;

    let id = record
        .id
        .into_i64()
        .ok_or_else(|| TransportError::Malformed("vehicle id is not an integer".to_string()))?;
    if id != resource_id.get() {
        return Err(TransportError::Malformed(format!(
            "asked for vehicle {resource_id}, registry answered with {id}"
        )));
    }

    let label = record
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("vehicle {resource_id}"));

    let status = record
        .status
        .unwrap_or_else(|| UNKNOWN_STATUS.to_string());

    Ok(Some(ResourceSnapshot::new(resource_id, label, status)))
}

// ============================================================================
// Registry Client
// ============================================================================

/// GraphQL client for the vehicle registry
///
/// One attempt per call; retry policy belongs to the caller.
pub struct RegistryClient {
    config: RegistryClientConfig,
    http_client: Client,
}

impl RegistryClient {
    /// Create a new registry client
    pub fn new(config: RegistryClientConfig) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("fleet-availability/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Endpoint this client talks to
    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.config.timeout)
        } else if err.is_decode() {
            TransportError::Malformed(err.to_string())
        } else {
            TransportError::Unreachable(err.to_string())
        }
    }

    async fn fetch(
        &self,
        resource_id: ResourceId,
    ) -> Result<Option<ResourceSnapshot>, TransportError> {
        let response = self
            .http_client
            .post(&self.config.url)
            .json(&vehicle_query(resource_id))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(|e| self.classify(e))?;
        parse_vehicle_response(resource_id, &body)
    }
}

#[async_trait]
impl ResourceVerifier for RegistryClient {
    async fn lookup(
        &self,
        resource_id: ResourceId,
    ) -> Result<Option<ResourceSnapshot>, VerifyError> {
        let started = Instant::now();
        let result = self.fetch(resource_id).await;

        let outcome = match &result {
            Ok(Some(_)) => "found",
            Ok(None) => "not_found",
            Err(TransportError::Timeout(_)) => "timeout",
            Err(_) => "transport_error",
        };
        metrics::record_registry_call(outcome, started.elapsed().as_secs_f64());

        match &result {
            Ok(snapshot) => tracing::debug!(
                resource_id = %resource_id,
                found = snapshot.is_some(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Registry lookup completed"
            ),
            Err(e) => tracing::warn!(
                resource_id = %resource_id,
                url = %self.config.url,
                error = %e,
                "Registry lookup failed"
            ),
        }

        Ok(result?)
    }
}

// ============================================================================
// Tests
// ============================================================================
