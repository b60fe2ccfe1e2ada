//! Reservation persistence
//!
//! SQLite is the production backend; the in-memory repository backs unit
//! and integration tests.

pub mod repository;

use std::sync::Arc;

use crate::config::DatabaseConfig;

pub use repository::{
    MockReservationRepository, ReservationRepository, SqliteReservationRepository, StoreError,
    StoreResult,
};

/// Run a synchronous store call on the blocking thread pool
pub async fn run_blocking<T, F>(op: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op).await?
}

/// Open the configured reservation store
pub fn open_repository(config: &DatabaseConfig) -> StoreResult<Arc<dyn ReservationRepository>> {
    let repo = SqliteReservationRepository::new(&config.sqlite_path)?;
    Ok(Arc::new(repo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_repository_creates_file() {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            sqlite_path: dir.path().join("data").join("availability.db"),
        };

        let repo = open_repository(&config).unwrap();
        assert_eq!(repo.count().unwrap(), 0);
        assert!(config.sqlite_path.exists());
    }

    #[tokio::test]
    async fn test_run_blocking_reports_panics() {
        let ok = run_blocking(|| Ok(3)).await.unwrap();
        assert_eq!(ok, 3);

        let err = run_blocking::<(), _>(|| panic!("store crashed")).await.unwrap_err();
        assert!(matches!(err, StoreError::Task(_)));
    }
}
