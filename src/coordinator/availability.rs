//! Read-side slot availability
//!
//! Answered entirely from local storage. The result may be stale relative
//! to the registry's view of the vehicle; eligibility is re-checked when a
//! lock is attempted.

use chrono::NaiveDate;
use std::sync::Arc;

use crate::metrics;
use crate::models::ResourceId;
use crate::storage::{self, ReservationRepository, StoreResult};

/// Read-only slot availability check
#[derive(Clone)]
pub struct AvailabilityQuery {
    repo: Arc<dyn ReservationRepository>,
}

impl AvailabilityQuery {
    pub fn new(repo: Arc<dyn ReservationRepository>) -> Self {
        Self { repo }
    }

    /// True iff no reservation exists for `(resource_id, date)`
    pub fn is_available(&self, resource_id: ResourceId, date: NaiveDate) -> StoreResult<bool> {
        let taken = self.repo.is_slot_taken(resource_id, date)?;
        metrics::record_availability_check(!taken);

        tracing::debug!(
            resource_id = %resource_id,
            date = %date,
            available = !taken,
            "Availability checked"
        );
        Ok(!taken)
    }

    /// [`is_available`](Self::is_available) off the async worker threads
    pub async fn check(&self, resource_id: ResourceId, date: NaiveDate) -> StoreResult<bool> {
        let query = self.clone();
        storage::run_blocking(move || query.is_available(resource_id, date)).await
    }
}
