use chrono::{DateTime, Utc};
use elemizer_core::models::NewObservation;
use elemizer_db::{Database, DatabaseConfig, ObservationRepository};

/// Opens a fresh in-memory database with all migrations applied.
///
/// Each call gets its own private database; the pool holds exactly one connection.
pub async fn setup_test_db() -> Database {
    let db = Database::connect(&DatabaseConfig::in_memory())
        .await
        .expect("Failed to open in-memory database");
    db.migrate().await.expect("Failed to run migrations");
    db
}

pub async fn setup_repo() -> ObservationRepository {
    setup_test_db().await.observation_repo()
}

pub fn new_observation(
    domain: &str,
    url: &str,
    element: &str,
    element_count: u64,
    duration_ms: f64,
    fetched_at: DateTime<Utc>,
) -> NewObservation {
    NewObservation {
        domain: domain.into(),
        url: url.into(),
        element: element.into(),
        element_count,
        duration_ms,
        fetched_at,
    }
}
