//! REST API handlers for the availability service
//!
//! | Method | Path                  | Operation           |
//! |--------|-----------------------|---------------------|
//! | GET    | `/`                   | liveness            |
//! | GET    | `/api/health`         | health with uptime  |
//! | GET    | `/api/availability`   | `checkAvailability` |
//! | POST   | `/api/schedules/lock` | `lockSchedule`      |
//! | GET    | `/metrics`            | Prometheus scrape   |

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::metrics;
use crate::models::{parse_date, Reservation, ResourceId};

use super::lock::{LockError, LockErrorKind, LockStage};
use super::server::AppState;

// ============================================================================
// API Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Error response; lock failures carry their structured kind
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<LockErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<LockStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            kind: None,
            stage: None,
            retryable: None,
        }
    }
}

impl From<&LockError> for ErrorResponse {
    fn from(err: &LockError) -> Self {
        Self {
            success: false,
            error: err.to_string(),
            kind: Some(err.kind()),
            stage: Some(err.stage()),
            retryable: Some(err.is_recoverable()),
        }
    }
}

/// HTTP status for a lock failure
pub fn lock_error_status(kind: LockErrorKind) -> StatusCode {
    match kind {
        LockErrorKind::ResourceNotFound => StatusCode::NOT_FOUND,
        LockErrorKind::ResourceIneligible => StatusCode::UNPROCESSABLE_ENTITY,
        LockErrorKind::RequesterRejected => StatusCode::FORBIDDEN,
        LockErrorKind::SlotAlreadyLocked => StatusCode::CONFLICT,
        LockErrorKind::DependencyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        LockErrorKind::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Query string for `checkAvailability`
#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    #[serde(rename = "vehicleId", alias = "resourceId")]
    pub vehicle_id: i64,
    pub date: String,
}

/// Body of `checkAvailability`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub vehicle_id: ResourceId,
    pub date: NaiveDate,
    pub available: bool,
}

/// Body of `lockSchedule`
#[derive(Debug, Deserialize)]
pub struct LockRequest {
    #[serde(rename = "vehicleId", alias = "resourceId")]
    pub vehicle_id: i64,
    pub date: String,
    #[serde(rename = "userId", alias = "requesterId")]
    pub user_id: String,
}

fn invalid_date(raw: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(format!(
            "Invalid date format: {raw}. Expected YYYY-MM-DD"
        ))),
    )
        .into_response()
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health_check))
        .route("/api/availability", get(check_availability))
        .route("/api/schedules/lock", post(lock_schedule))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
}

// ============================================================================
// Health Handlers
// ============================================================================

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "Availability Service Running",
        "docs": "/api/health",
    }))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    }))
}

async fn metrics_endpoint() -> Response {
    match metrics::encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(format!("Failed to encode metrics: {e}"))),
        )
            .into_response(),
    }
}

// ============================================================================
// Schedule Handlers
// ============================================================================

/// `checkAvailability(vehicleId, date)`
async fn check_availability(
    State(state): State<AppState>,
    Query(params): Query<AvailabilityParams>,
) -> Response {
    let started = Instant::now();

    let response = match parse_date(&params.date) {
        Err(_) => invalid_date(&params.date),
        Ok(date) => {
            let resource_id = ResourceId(params.vehicle_id);
            match state.coordinator.availability().check(resource_id, date).await {
                Ok(available) => (
                    StatusCode::OK,
                    Json(ApiResponse::success(AvailabilityResponse {
                        vehicle_id: resource_id,
                        date,
                        available,
                    })),
                )
                    .into_response(),
                Err(e) => {
                    tracing::error!(
                        resource_id = %resource_id,
                        error = %e,
                        "Availability check failed"
                    );
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(ErrorResponse::new(format!("Failed to check availability: {e}"))),
                    )
                        .into_response()
                }
            }
        }
    };

    metrics::record_api_request(
        "/api/availability",
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

/// `lockSchedule(vehicleId, date, userId)`
async fn lock_schedule(
    State(state): State<AppState>,
    Json(request): Json<LockRequest>,
) -> Response {
    let started = Instant::now();

    let response = match parse_date(&request.date) {
        Err(_) => invalid_date(&request.date),
        Ok(date) => {
            match state
                .coordinator
                .lock(ResourceId(request.vehicle_id), date, &request.user_id)
                .await
            {
                Ok(reservation) => {
                    (StatusCode::OK, Json(ApiResponse::<Reservation>::success(reservation)))
                        .into_response()
                }
                Err(e) => {
                    (lock_error_status(e.kind()), Json(ErrorResponse::from(&e))).into_response()
                }
            }
        }
    };

    metrics::record_api_request(
        "/api/schedules/lock",
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

// ============================================================================
// Tests
// ============================================================================
