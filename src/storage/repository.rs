//! Repository Pattern for reservation persistence
//!
//! The coordinator talks to storage only through [`ReservationRepository`],
//! which keeps the lock workflow independent of the backing store and lets
//! tests swap in the in-memory implementation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │          ReservationCoordinator / AvailabilityQuery         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ReservationRepository trait                 │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                         │
//!                    ▼                         ▼
//!         ┌─────────────────────┐   ┌─────────────────────┐
//!         │       SQLite        │   │        Mock         │
//!         │  UNIQUE(vehicle,    │   │  check + insert     │
//!         │         date)       │   │  under one lock     │
//!         └─────────────────────┘   └─────────────────────┘
//! ```
//!
//! Both implementations enforce the one-reservation-per-slot invariant at
//! insert time and report a violation as [`StoreError::SlotTaken`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{NewReservation, Reservation, ResourceId, Slot, DATE_FORMAT};

// ============================================================================
// Errors
// ============================================================================

/// Result type for repository operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by reservation storage
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The slot already holds a reservation (uniqueness guard fired)
    #[error("slot already reserved: {slot}")]
    SlotTaken { slot: Slot },

    /// Underlying SQLite failure
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row could not be decoded
    #[error("corrupt reservation row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },

    /// Another thread panicked while holding the storage handle
    #[error("storage handle poisoned")]
    LockPoisoned,

    /// Filesystem error while preparing the database location
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking storage task panicked or was cancelled
    #[error("storage task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Whether this error is the uniqueness guard rather than a fault
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::SlotTaken { .. })
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::LockPoisoned
    }
}

// ============================================================================
// Repository Trait
// ============================================================================

/// Persistence contract for reservations
///
/// Implementations must make `insert` atomic with respect to the slot:
/// of any number of concurrent inserts for the same `(resource, date)`
/// exactly one succeeds and the rest fail with [`StoreError::SlotTaken`].
pub trait ReservationRepository: Send + Sync {
    /// Find the reservation occupying a slot, if any
    fn find_by_slot(&self, resource_id: ResourceId, date: NaiveDate)
        -> StoreResult<Option<Reservation>>;

    /// Check whether a slot holds a reservation
    fn is_slot_taken(&self, resource_id: ResourceId, date: NaiveDate) -> StoreResult<bool> {
        Ok(self.find_by_slot(resource_id, date)?.is_some())
    }

    /// Persist a new locked reservation and return it with its assigned id
    fn insert(&self, reservation: &NewReservation) -> StoreResult<Reservation>;

    /// Total number of reservations
    fn count(&self) -> StoreResult<usize>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of [`ReservationRepository`]
///
/// The connection sits behind a `Mutex`; every operation holds the guard
/// only for its own duration.
pub struct SqliteReservationRepository {
    conn: Mutex<Connection>,
}

impl SqliteReservationRepository {
    /// Open (or create) a database file
    pub fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;

        tracing::info!(path = %path.display(), "SQLite reservation store initialized");
        Ok(repo)
    }

    /// Create in-memory repository (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;
        Ok(repo)
    }

    fn connection(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        Ok(self.conn.lock()?)
    }

    fn create_schema(&self) -> StoreResult<()> {
        let conn = self.connection()?;
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS schedules (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    vehicle_id INTEGER NOT NULL,
                    date TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    is_locked INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL,
                    UNIQUE (vehicle_id, date)
                );

                CREATE INDEX IF NOT EXISTS idx_schedules_vehicle
                    ON schedules(vehicle_id);
                "#,
        )?;

        Ok(())
    }

    fn row_to_reservation(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
        Ok(RawRow {
            id: row.get(0)?,
            vehicle_id: row.get(1)?,
            date: row.get(2)?,
            user_id: row.get(3)?,
            is_locked: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

/// Undecoded `schedules` row
struct RawRow {
    id: i64,
    vehicle_id: i64,
    date: String,
    user_id: String,
    is_locked: bool,
    created_at: String,
}

impl TryFrom<RawRow> for Reservation {
    type Error = StoreError;

    fn try_from(row: RawRow) -> StoreResult<Self> {
        let date = NaiveDate::parse_from_str(&row.date, DATE_FORMAT).map_err(|e| {
            StoreError::CorruptRow {
                id: row.id,
                reason: format!("date '{}': {e}", row.date),
            }
        })?;
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::CorruptRow {
                id: row.id,
                reason: format!("created_at '{}': {e}", row.created_at),
            })?;

        Ok(Reservation {
            id: row.id,
            resource_id: ResourceId(row.vehicle_id),
            date,
            requester_id: row.user_id,
            locked: row.is_locked,
            created_at,
        })
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}

impl ReservationRepository for SqliteReservationRepository {
    fn find_by_slot(
        &self,
        resource_id: ResourceId,
        date: NaiveDate,
    ) -> StoreResult<Option<Reservation>> {
        let conn = self.connection()?;
        let row = conn
            .query_row(
                "SELECT id, vehicle_id, date, user_id, is_locked, created_at
                 FROM schedules WHERE vehicle_id = ?1 AND date = ?2",
                params![resource_id.get(), date.format(DATE_FORMAT).to_string()],
                Self::row_to_reservation,
            )
            .optional()?;

        row.map(Reservation::try_from).transpose()
    }

    fn is_slot_taken(&self, resource_id: ResourceId, date: NaiveDate) -> StoreResult<bool> {
        let conn = self.connection()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM schedules WHERE vehicle_id = ?1 AND date = ?2)",
            params![resource_id.get(), date.format(DATE_FORMAT).to_string()],
            |row| row.get(0),
        )?;

        Ok(exists)
    }

    fn insert(&self, reservation: &NewReservation) -> StoreResult<Reservation> {
        let mut conn = self.connection()?;
        let created_at = Utc::now();

        // Dropping the transaction without commit rolls it back.
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT INTO schedules (vehicle_id, date, user_id, is_locked, created_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![
                reservation.resource_id.get(),
                reservation.date.format(DATE_FORMAT).to_string(),
                reservation.requester_id,
                created_at.to_rfc3339(),
            ],
        );

        if let Err(e) = inserted {
            if is_unique_violation(&e) {
                return Err(StoreError::SlotTaken {
                    slot: reservation.slot(),
                });
            }
            return Err(e.into());
        }

        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(Reservation {
            id,
            resource_id: reservation.resource_id,
            date: reservation.date,
            requester_id: reservation.requester_id.clone(),
            locked: true,
            created_at,
        })
    }

    fn count(&self) -> StoreResult<usize> {
        let conn = self.connection()?;
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM schedules", [], |row| row.get(0))?;
        Ok(total as usize)
    }
}

// ============================================================================
// Mock Implementation (for testing)
// ============================================================================

/// In-memory implementation of [`ReservationRepository`]
///
/// The uniqueness check and the insert happen under the same write lock.
#[derive(Default)]
pub struct MockReservationRepository {
    reservations: RwLock<HashMap<Slot, Reservation>>,
    next_id: Mutex<i64>,
}

impl MockReservationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all reservations
    pub fn clear(&self) {
        if let Ok(mut reservations) = self.reservations.write() {
            reservations.clear();
        }
    }
}

impl ReservationRepository for MockReservationRepository {
    fn find_by_slot(
        &self,
        resource_id: ResourceId,
        date: NaiveDate,
    ) -> StoreResult<Option<Reservation>> {
        let reservations = self.reservations.read()?;
        Ok(reservations.get(&Slot::new(resource_id, date)).cloned())
    }

    fn insert(&self, reservation: &NewReservation) -> StoreResult<Reservation> {
        let mut reservations = self.reservations.write()?;
        let slot = reservation.slot();

        if reservations.contains_key(&slot) {
            return Err(StoreError::SlotTaken { slot });
        }

        let id = {
            let mut next_id = self.next_id.lock()?;
            *next_id += 1;
            *next_id
        };

        let stored = Reservation {
            id,
            resource_id: reservation.resource_id,
            date: reservation.date,
            requester_id: reservation.requester_id.clone(),
            locked: true,
            created_at: Utc::now(),
        };
        reservations.insert(slot, stored.clone());

        Ok(stored)
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.reservations.read()?.len())
    }
}

// ============================================================================
// Tests
// ============================================================================
