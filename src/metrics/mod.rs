//! Prometheus metrics for the availability service
//!
//! This module tracks:
//! - Lock attempts by outcome
//! - Registry call latency by result
//! - Availability checks
//! - HTTP API requests
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! Until then (or if registration fails) every recording function is a no-op.

use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::sync::{Mutex, OnceLock};

// ============================================================================
// Metrics Storage
// ============================================================================

struct ServiceMetrics {
    lock_attempts: CounterVec,
    registry_duration: HistogramVec,
    availability_checks: CounterVec,
    api_requests: CounterVec,
    api_duration: HistogramVec,
}

static SERVICE_METRICS: OnceLock<ServiceMetrics> = OnceLock::new();

/// Serializes registration so the default registry never sees duplicates
static INIT_LOCK: Mutex<()> = Mutex::new(());

// ============================================================================
// Initialization
// ============================================================================

/// Register all metrics with the default Prometheus registry
///
/// Safe to call more than once; only the first successful call registers.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let _guard = INIT_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if SERVICE_METRICS.get().is_some() {
        return Ok(());
    }

    let metrics = ServiceMetrics {
        lock_attempts: register_counter_vec!(
            "fleet_lock_attempts_total",
            "Schedule lock attempts by outcome",
            &["outcome"]
        )?,
        registry_duration: register_histogram_vec!(
            "fleet_registry_request_duration_seconds",
            "Vehicle registry lookup latency",
            &["result"],
            vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
        )?,
        availability_checks: register_counter_vec!(
            "fleet_availability_checks_total",
            "Availability checks by result",
            &["available"]
        )?,
        api_requests: register_counter_vec!(
            "fleet_api_requests_total",
            "API requests by endpoint and status",
            &["endpoint", "status"]
        )?,
        api_duration: register_histogram_vec!(
            "fleet_api_request_duration_seconds",
            "API request latency by endpoint",
            &["endpoint"]
        )?,
    };

    let _ = SERVICE_METRICS.set(metrics);
    tracing::debug!("Prometheus metrics registered");
    Ok(())
}

/// Whether metrics have been registered
pub fn metrics_initialized() -> bool {
    SERVICE_METRICS.get().is_some()
}

/// Encode all gathered metrics in the Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

// ============================================================================
// Recording
// ============================================================================

/// Record the outcome of a lock attempt (`locked` or a failure kind)
pub fn record_lock_outcome(outcome: &str) {
    if let Some(m) = SERVICE_METRICS.get() {
        m.lock_attempts.with_label_values(&[outcome]).inc();
    }
}

/// Record a registry round trip
pub fn record_registry_call(result: &str, duration_secs: f64) {
    if let Some(m) = SERVICE_METRICS.get() {
        m.registry_duration
            .with_label_values(&[result])
            .observe(duration_secs);
    }
}

/// Record an availability check
pub fn record_availability_check(available: bool) {
    if let Some(m) = SERVICE_METRICS.get() {
        let label = if available { "true" } else { "false" };
        m.availability_checks.with_label_values(&[label]).inc();
    }
}

/// Record an API request
pub fn record_api_request(endpoint: &str, status: u16, duration_secs: f64) {
    let Some(m) = SERVICE_METRICS.get() else {
        return;
    };

    let status_str = status.to_string();
    m.api_requests
        .with_label_values(&[endpoint, status_str.as_str()])
        .inc();
    m.api_duration
        .with_label_values(&[endpoint])
        .observe(duration_secs);
}
