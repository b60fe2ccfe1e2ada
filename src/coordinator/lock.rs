//! Reservation lock workflow
//!
//! A lock attempt runs these steps in order, aborting on the first failure
//! with no partial write:
//!
//! ```text
//! Start → Verifying ──────────┬─→ VerifyFailed
//!                             └─→ Verified
//!         CheckingRequester ──┬─→ RequesterFailed
//!                             └─→ RequesterAccepted
//!         CheckingConflict ───┬─→ Conflict
//!                             └─→ Clear
//!         Committing ─────────┬─→ CommitFailed
//!                             └─→ Committed
//! ```
//!
//! The registry is consulted before storage is touched. The conflict check
//! runs right before the write; the storage uniqueness guard covers the gap
//! between the two.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::identity::{NoopRequesterVerifier, RequesterError, RequesterVerifier};
use crate::metrics;
use crate::models::{NewReservation, Reservation, ResourceId, Slot};
use crate::registry::{ResourceVerifier, VerifyError};
use crate::storage::{self, ReservationRepository, StoreError};

use super::availability::AvailabilityQuery;

// ============================================================================
// Stages
// ============================================================================

/// Step of a lock attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStage {
    Verifying,
    CheckingRequester,
    CheckingConflict,
    Committing,
}

impl LockStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verifying => "verifying",
            Self::CheckingRequester => "checking_requester",
            Self::CheckingConflict => "checking_conflict",
            Self::Committing => "committing",
        }
    }
}

impl fmt::Display for LockStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Which dependency could not be consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dependency {
    ResourceRegistry,
    IdentityService,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceRegistry => f.write_str("vehicle registry"),
            Self::IdentityService => f.write_str("identity service"),
        }
    }
}

/// Failure kinds of a lock attempt, without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LockErrorKind {
    ResourceNotFound,
    ResourceIneligible,
    DependencyUnavailable,
    RequesterRejected,
    SlotAlreadyLocked,
    StorageFailure,
}

impl LockErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceNotFound => "resource_not_found",
            Self::ResourceIneligible => "resource_ineligible",
            Self::DependencyUnavailable => "dependency_unavailable",
            Self::RequesterRejected => "requester_rejected",
            Self::SlotAlreadyLocked => "slot_already_locked",
            Self::StorageFailure => "storage_failure",
        }
    }
}

/// Why a lock attempt failed
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("vehicle {resource_id} was not found in the vehicle registry")]
    ResourceNotFound { resource_id: ResourceId },

    #[error("vehicle {label} is not available for booking (status {status})")]
    ResourceIneligible {
        resource_id: ResourceId,
        label: String,
        status: String,
    },

    #[error("{dependency} unavailable: {reason}")]
    DependencyUnavailable {
        dependency: Dependency,
        reason: String,
    },

    #[error("requester {requester_id} was rejected: {reason}")]
    RequesterRejected { requester_id: String, reason: String },

    /// Raised by the pre-insert check (`CheckingConflict`) or by the storage
    /// uniqueness guard when a concurrent attempt won the race (`Committing`)
    #[error("schedule for {slot} is already locked")]
    SlotAlreadyLocked { slot: Slot, stage: LockStage },

    #[error("reservation storage failed during {stage}: {source}")]
    StorageFailure {
        stage: LockStage,
        #[source]
        source: StoreError,
    },
}

impl LockError {
    pub fn kind(&self) -> LockErrorKind {
        match self {
            Self::ResourceNotFound { .. } => LockErrorKind::ResourceNotFound,
            Self::ResourceIneligible { .. } => LockErrorKind::ResourceIneligible,
            Self::DependencyUnavailable { .. } => LockErrorKind::DependencyUnavailable,
            Self::RequesterRejected { .. } => LockErrorKind::RequesterRejected,
            Self::SlotAlreadyLocked { .. } => LockErrorKind::SlotAlreadyLocked,
            Self::StorageFailure { .. } => LockErrorKind::StorageFailure,
        }
    }

    /// Stage the attempt was in when it failed
    pub fn stage(&self) -> LockStage {
        match self {
            Self::ResourceNotFound { .. } | Self::ResourceIneligible { .. } => LockStage::Verifying,
            Self::DependencyUnavailable { dependency, .. } => match dependency {
                Dependency::ResourceRegistry => LockStage::Verifying,
                Dependency::IdentityService => LockStage::CheckingRequester,
            },
            Self::RequesterRejected { .. } => LockStage::CheckingRequester,
            Self::SlotAlreadyLocked { stage, .. } | Self::StorageFailure { stage, .. } => *stage,
        }
    }

    /// Whether the caller may safely retry the same request
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DependencyUnavailable { .. } | Self::StorageFailure { .. }
        )
    }

    fn from_verify(err: VerifyError) -> Self {
        match err {
            VerifyError::Transport(e) => Self::DependencyUnavailable {
                dependency: Dependency::ResourceRegistry,
                reason: e.to_string(),
            },
            VerifyError::NotFound { resource_id } => Self::ResourceNotFound { resource_id },
            VerifyError::Ineligible {
                resource_id,
                label,
                status,
            } => Self::ResourceIneligible {
                resource_id,
                label,
                status,
            },
        }
    }

    fn from_requester(err: RequesterError) -> Self {
        match err {
            RequesterError::Rejected {
                requester_id,
                reason,
            } => Self::RequesterRejected {
                requester_id,
                reason,
            },
            RequesterError::Unavailable(reason) => Self::DependencyUnavailable {
                dependency: Dependency::IdentityService,
                reason,
            },
        }
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Orchestrates verification, conflict detection and commit of reservations
///
/// The coordinator is the only writer of the reservation store.
#[derive(Clone)]
pub struct ReservationCoordinator {
    repo: Arc<dyn ReservationRepository>,
    availability: AvailabilityQuery,
    resources: Arc<dyn ResourceVerifier>,
    requesters: Arc<dyn RequesterVerifier>,
}

impl ReservationCoordinator {
    /// Create a coordinator with requester verification disabled
    pub fn new(repo: Arc<dyn ReservationRepository>, resources: Arc<dyn ResourceVerifier>) -> Self {
        Self {
            availability: AvailabilityQuery::new(Arc::clone(&repo)),
            repo,
            resources,
            requesters: Arc::new(NoopRequesterVerifier),
        }
    }

    /// Plug in a requester eligibility check
    pub fn with_requester_verifier(mut self, requesters: Arc<dyn RequesterVerifier>) -> Self {
        self.requesters = requesters;
        self
    }

    /// Read-side view over the same store
    pub fn availability(&self) -> &AvailabilityQuery {
        &self.availability
    }

    /// Lock a vehicle for one day on behalf of a requester
    #[tracing::instrument(
        name = "lock_schedule",
        skip_all,
        fields(resource_id = %resource_id, date = %date, requester_id = %requester_id)
    )]
    pub async fn lock(
        &self,
        resource_id: ResourceId,
        date: NaiveDate,
        requester_id: &str,
    ) -> Result<Reservation, LockError> {
        let result = self.run(resource_id, date, requester_id).await;

        match &result {
            Ok(reservation) => {
                metrics::record_lock_outcome("locked");
                tracing::info!(reservation_id = reservation.id, "Schedule locked");
            }
            Err(e) => {
                metrics::record_lock_outcome(e.kind().as_str());
                if e.is_recoverable() {
                    tracing::warn!(
                        stage = %e.stage(),
                        kind = e.kind().as_str(),
                        error = %e,
                        "Lock attempt failed"
                    );
                } else {
                    tracing::info!(
                        stage = %e.stage(),
                        kind = e.kind().as_str(),
                        error = %e,
                        "Lock attempt refused"
                    );
                }
            }
        }

        result
    }

    async fn run(
        &self,
        resource_id: ResourceId,
        date: NaiveDate,
        requester_id: &str,
    ) -> Result<Reservation, LockError> {
        tracing::debug!(stage = %LockStage::Verifying, "Verifying vehicle with registry");
        let snapshot = self
            .resources
            .verify(resource_id)
            .await
            .map_err(LockError::from_verify)?;
        tracing::debug!(label = %snapshot.label, "Vehicle verified");

        tracing::debug!(stage = %LockStage::CheckingRequester, "Verifying requester");
        self.requesters
            .verify(requester_id)
            .await
            .map_err(LockError::from_requester)?;

        tracing::debug!(stage = %LockStage::CheckingConflict, "Checking slot conflict");
        let slot = Slot::new(resource_id, date);
        let available = self
            .availability
            .check(resource_id, date)
            .await
            .map_err(|source| LockError::StorageFailure {
                stage: LockStage::CheckingConflict,
                source,
            })?;
        if !available {
            return Err(LockError::SlotAlreadyLocked {
                slot,
                stage: LockStage::CheckingConflict,
            });
        }

        tracing::debug!(stage = %LockStage::Committing, "Committing reservation");
        let repo = Arc::clone(&self.repo);
        let reservation = NewReservation::new(resource_id, date, requester_id);
        storage::run_blocking(move || repo.insert(&reservation))
            .await
            .map_err(|source| match source {
                StoreError::SlotTaken { slot } => LockError::SlotAlreadyLocked {
                    slot,
                    stage: LockStage::Committing,
                },
                source => LockError::StorageFailure {
                    stage: LockStage::Committing,
                    source,
                },
            })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceSnapshot;
    use crate::registry::TransportError;
    use crate::storage::{MockReservationRepository, StoreResult};
    use async_trait::async_trait;
    use std::time::Duration;

    struct StubVerifier(Result<Option<ResourceSnapshot>, VerifyError>);

    #[async_trait]
    impl ResourceVerifier for StubVerifier {
        async fn lookup(&self, _id: ResourceId) -> Result<Option<ResourceSnapshot>, VerifyError> {
            self.0.clone()
        }
    }

    struct RejectAll;

    #[async_trait]
    impl RequesterVerifier for RejectAll {
        async fn verify(&self, requester_id: &str) -> Result<(), RequesterError> {
            Err(RequesterError::Rejected {
                requester_id: requester_id.to_string(),
                reason: "low reputation".to_string(),
            })
        }
    }

    struct IdentityDown;

    #[async_trait]
    impl RequesterVerifier for IdentityDown {
        async fn verify(&self, _requester_id: &str) -> Result<(), RequesterError> {
            Err(RequesterError::Unavailable("connection refused".to_string()))
        }
    }

    /// Store whose writes always fail
    #[derive(Default)]
    struct BrokenWrites {
        inner: MockReservationRepository,
    }

    impl ReservationRepository for BrokenWrites {
        fn find_by_slot(
            &self,
            resource_id: ResourceId,
            date: NaiveDate,
        ) -> StoreResult<Option<Reservation>> {
            self.inner.find_by_slot(resource_id, date)
        }

        fn insert(&self, _reservation: &NewReservation) -> StoreResult<Reservation> {
            Err(StoreError::LockPoisoned)
        }

        fn count(&self) -> StoreResult<usize> {
            self.inner.count()
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn coordinator(
        verifier: StubVerifier,
    ) -> (ReservationCoordinator, Arc<MockReservationRepository>) {
        let repo = Arc::new(MockReservationRepository::new());
        let coordinator = ReservationCoordinator::new(repo.clone(), Arc::new(verifier));
        (coordinator, repo)
    }

    fn active(id: i64) -> StubVerifier {
        StubVerifier(Ok(Some(ResourceSnapshot::new(ResourceId(id), "Avanza", "ACTIVE"))))
    }

    #[tokio::test]
    async fn test_lock_success() {
        let (coordinator, repo) = coordinator(active(7));

        let reservation = coordinator.lock(ResourceId(7), day(), "u1").await.unwrap();
        assert!(reservation.locked);
        assert_eq!(reservation.requester_id, "u1");
        assert_eq!(repo.count().unwrap(), 1);
        assert!(!coordinator.availability().is_available(ResourceId(7), day()).unwrap());
    }

    #[tokio::test]
    async fn test_second_lock_conflicts() {
        let (coordinator, _repo) = coordinator(active(7));

        coordinator.lock(ResourceId(7), day(), "u1").await.unwrap();
        let err = coordinator.lock(ResourceId(7), day(), "u2").await.unwrap_err();

        assert_eq!(err.kind(), LockErrorKind::SlotAlreadyLocked);
        assert_eq!(err.stage(), LockStage::CheckingConflict);
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_not_found_writes_nothing() {
        let (coordinator, repo) = coordinator(StubVerifier(Ok(None)));

        let err = coordinator.lock(ResourceId(9), day(), "u2").await.unwrap_err();
        assert_eq!(err.kind(), LockErrorKind::ResourceNotFound);
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_ineligible_message_names_vehicle() {
        let (coordinator, repo) = coordinator(StubVerifier(Ok(Some(ResourceSnapshot::new(
            ResourceId(3),
            "Xenia",
            "MAINTENANCE",
        )))));

        let err = coordinator.lock(ResourceId(3), day(), "u1").await.unwrap_err();
        assert_eq!(err.kind(), LockErrorKind::ResourceIneligible);
        assert!(err.to_string().contains("Xenia"));
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_is_dependency_unavailable() {
        let (coordinator, repo) = coordinator(StubVerifier(Err(
            TransportError::Timeout(Duration::from_millis(50)).into(),
        )));

        let err = coordinator.lock(ResourceId(3), day(), "u1").await.unwrap_err();
        assert_eq!(err.kind(), LockErrorKind::DependencyUnavailable);
        assert_eq!(err.stage(), LockStage::Verifying);
        assert!(err.is_recoverable());
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_requester_rejection_blocks_write() {
        let (coordinator, repo) = coordinator(active(7));
        let coordinator = coordinator.with_requester_verifier(Arc::new(RejectAll));

        let err = coordinator.lock(ResourceId(7), day(), "u1").await.unwrap_err();
        assert_eq!(err.kind(), LockErrorKind::RequesterRejected);
        assert_eq!(err.stage(), LockStage::CheckingRequester);
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_identity_outage_is_dependency_unavailable() {
        let (coordinator, repo) = coordinator(active(7));
        let coordinator = coordinator.with_requester_verifier(Arc::new(IdentityDown));

        let err = coordinator.lock(ResourceId(7), day(), "u1").await.unwrap_err();
        assert!(matches!(
            err,
            LockError::DependencyUnavailable {
                dependency: Dependency::IdentityService,
                ..
            }
        ));
        assert_eq!(err.stage(), LockStage::CheckingRequester);
        assert!(err.is_recoverable());
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_write_is_storage_failure() {
        let repo = Arc::new(BrokenWrites::default());
        let coordinator = ReservationCoordinator::new(repo.clone(), Arc::new(active(7)));

        let err = coordinator.lock(ResourceId(7), day(), "u1").await.unwrap_err();
        assert_eq!(err.kind(), LockErrorKind::StorageFailure);
        assert_eq!(err.stage(), LockStage::Committing);
        assert!(err.is_recoverable());
        assert_eq!(repo.count().unwrap(), 0);
        assert!(coordinator.availability().is_available(ResourceId(7), day()).unwrap());
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&LockErrorKind::SlotAlreadyLocked).unwrap();
        assert_eq!(json, "\"slot_already_locked\"");
        assert_eq!(LockErrorKind::SlotAlreadyLocked.as_str(), "slot_already_locked");
    }
}
