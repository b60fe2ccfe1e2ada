//! Common test utilities

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use fleet_availability::coordinator::ReservationCoordinator;
use fleet_availability::models::{NewReservation, Reservation, ResourceId, ResourceSnapshot};
use fleet_availability::registry::{ResourceVerifier, TransportError, VerifyError};
use fleet_availability::storage::{
    ReservationRepository, SqliteReservationRepository, StoreError, StoreResult,
};

/// Registry double backed by a fixed set of vehicles
#[derive(Default)]
pub struct FakeRegistry {
    vehicles: HashMap<ResourceId, ResourceSnapshot>,
    failure: Option<TransportError>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vehicle(mut self, id: i64, model: &str, status: &str) -> Self {
        self.vehicles
            .insert(ResourceId(id), ResourceSnapshot::new(ResourceId(id), model, status));
        self
    }

    /// Every lookup fails with the given transport error
    pub fn failing(failure: TransportError) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceVerifier for FakeRegistry {
    async fn lookup(
        &self,
        resource_id: ResourceId,
    ) -> Result<Option<ResourceSnapshot>, VerifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = &self.failure {
            return Err(failure.clone().into());
        }
        Ok(self.vehicles.get(&resource_id).cloned())
    }
}

/// Registry used by the scenario tests: 7 active, 3 in maintenance, 9 absent
pub fn scenario_registry() -> FakeRegistry {
    FakeRegistry::new()
        .with_vehicle(7, "Toyota Avanza", "ACTIVE")
        .with_vehicle(3, "Daihatsu Xenia", "MAINTENANCE")
}

/// SQLite store whose inserts fail as if the disk were full
pub struct DiskFullStore {
    inner: SqliteReservationRepository,
}

#[allow(dead_code)]
impl DiskFullStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteReservationRepository::in_memory().expect("in-memory sqlite"),
        }
    }
}

impl ReservationRepository for DiskFullStore {
    fn find_by_slot(&self, id: ResourceId, date: NaiveDate) -> StoreResult<Option<Reservation>> {
        self.inner.find_by_slot(id, date)
    }

    fn insert(&self, _reservation: &NewReservation) -> StoreResult<Reservation> {
        Err(StoreError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
            Some("database or disk is full".to_string()),
        )))
    }

    fn count(&self) -> StoreResult<usize> {
        self.inner.count()
    }
}

/// Coordinator over an in-memory SQLite store
#[allow(dead_code)]
pub fn sqlite_coordinator(
    registry: Arc<FakeRegistry>,
) -> (ReservationCoordinator, Arc<dyn ReservationRepository>) {
    let repo: Arc<dyn ReservationRepository> =
        Arc::new(SqliteReservationRepository::in_memory().expect("in-memory sqlite"));
    let coordinator = ReservationCoordinator::new(Arc::clone(&repo), registry);
    (coordinator, repo)
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid test date")
}
