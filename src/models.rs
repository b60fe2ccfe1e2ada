//! Core data structures for vehicle reservations
//!
//! This module contains the shared types passed between the registry
//! client, the reservation store and the lock coordinator.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry status value that permits booking
pub const ELIGIBLE_STATUS: &str = "ACTIVE";

/// Date format accepted on every external surface
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// Identifiers
// ============================================================================

/// Reference to a vehicle owned by the resource registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub i64);

impl ResourceId {
    /// Raw integer value
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ResourceId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A `(resource, day)` pair; conflict detection is keyed on this
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub resource_id: ResourceId,
    pub date: NaiveDate,
}

impl Slot {
    pub fn new(resource_id: ResourceId, date: NaiveDate) -> Self {
        Self { resource_id, date }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vehicle {} on {}", self.resource_id, self.date.format(DATE_FORMAT))
    }
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(input: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
}

// ============================================================================
// Reservation
// ============================================================================

/// A persisted claim on a vehicle for one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    /// Store-assigned identifier
    pub id: i64,

    /// Vehicle reference (validated against the registry at lock time only)
    pub resource_id: ResourceId,

    /// Reserved calendar day
    pub date: NaiveDate,

    /// Opaque requester identifier supplied by the caller
    pub requester_id: String,

    /// Always true in the current design
    pub locked: bool,

    /// When the reservation was committed
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn slot(&self) -> Slot {
        Slot::new(self.resource_id, self.date)
    }
}

/// Insert payload for the reservation store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub resource_id: ResourceId,
    pub date: NaiveDate,
    pub requester_id: String,
}

impl NewReservation {
    pub fn new(resource_id: ResourceId, date: NaiveDate, requester_id: impl Into<String>) -> Self {
        Self {
            resource_id,
            date,
            requester_id: requester_id.into(),
        }
    }

    pub fn slot(&self) -> Slot {
        Slot::new(self.resource_id, self.date)
    }
}

// ============================================================================
// Registry view
// ============================================================================

/// What the registry reported about a vehicle at verification time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub id: ResourceId,

    /// Human-readable label (vehicle model)
    pub label: String,

    /// Raw registry status, e.g. `ACTIVE` or `MAINTENANCE`
    pub status: String,

    pub eligible: bool,
}

impl ResourceSnapshot {
    /// Build a snapshot, deriving eligibility from the status value
    pub fn new(id: ResourceId, label: impl Into<String>, status: impl Into<String>) -> Self {
        let status = status.into();
        let eligible = status == ELIGIBLE_STATUS;
        Self {
            id,
            label: label.into(),
            status,
            eligible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        let date = parse_date("2024-05-01").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());

        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("01-05-2024").is_err());
        assert!(parse_date("2024-05-01T10:00:00").is_err());
    }

    #[test]
    fn test_snapshot_eligibility() {
        assert!(ResourceSnapshot::new(ResourceId(7), "Avanza", "ACTIVE").eligible);
        assert!(!ResourceSnapshot::new(ResourceId(3), "Xenia", "MAINTENANCE").eligible);
        assert!(!ResourceSnapshot::new(ResourceId(3), "Xenia", "active").eligible);
    }

    #[test]
    fn test_reservation_serializes_camel_case() {
        let reservation = Reservation {
            id: 1,
            resource_id: ResourceId(7),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            requester_id: "u1".to_string(),
            locked: true,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&reservation).unwrap();
        assert_eq!(json["resourceId"], 7);
        assert_eq!(json["date"], "2024-05-01");
        assert_eq!(json["requesterId"], "u1");
        assert_eq!(json["locked"], true);
    }

    #[test]
    fn test_slot_display() {
        let slot = Slot::new(ResourceId(7), NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(slot.to_string(), "vehicle 7 on 2024-05-01");
    }
}
