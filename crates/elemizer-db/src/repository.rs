use chrono::{DateTime, Utc};
use elemizer_core::error::AppError;
use elemizer_core::models::{DimensionRef, NewObservation, Observation, ObservationId};
use elemizer_core::stats::ElementCountPolicy;
use elemizer_core::traits::{ObservationStore, StatsStore};
use sqlx::{Pool, Sqlite, SqliteConnection, SqlitePool};

/// Repository for observations and their dimension rows in SQLite.
#[derive(Clone)]
pub struct ObservationRepository {
    pool: Pool<Sqlite>,
}

/// The three dimension tables.
#[derive(Debug, Clone, Copy)]
enum Dimension {
    Domain,
    Url,
    Element,
}

impl Dimension {
    fn table(self) -> &'static str {
        match self {
            Dimension::Domain => "domains",
            Dimension::Url => "urls",
            Dimension::Element => "elements",
        }
    }
}

const OBSERVATION_COLUMNS: &str = r#"
    SELECT o.id, d.name AS domain, u.name AS url, e.name AS element,
           o.element_count, o.duration_ms, o.fetched_at
    FROM observations o
    JOIN domains d ON d.id = o.domain_id
    JOIN urls u ON u.id = o.url_id
    JOIN elements e ON e.id = o.element_id
"#;

/// Keeps only the newest observation of each (url, element) pair; id breaks timestamp ties.
const LATEST_PER_URL_FILTER: &str = r#"
    AND NOT EXISTS (
        SELECT 1 FROM observations newer
        WHERE newer.url_id = o.url_id
          AND newer.element_id = o.element_id
          AND (newer.fetched_at > o.fetched_at
               OR (newer.fetched_at = o.fetched_at AND newer.id > o.id))
    )
"#;

fn policy_filter(policy: ElementCountPolicy) -> &'static str {
    match policy {
        ElementCountPolicy::LatestPerUrl => LATEST_PER_URL_FILTER,
        ElementCountPolicy::AllHistory => "",
    }
}

/// Insert-if-absent then read back. `DO NOTHING` keeps the row untouched, which the
/// no-update triggers require.
async fn find_or_create(
    conn: &mut SqliteConnection,
    dimension: Dimension,
    name: &str,
) -> Result<DimensionRef, AppError> {
    let table = dimension.table();

    let inserted: Option<(i64,)> = sqlx::query_as(&format!(
        "INSERT INTO {table} (name) VALUES (?) ON CONFLICT(name) DO NOTHING RETURNING id"
    ))
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(e.to_string()))?;

    let id = match inserted {
        Some((id,)) => {
            tracing::debug!(table, name, id, "Created dimension row");
            id
        }
        None => {
            let (id,): (i64,) = sqlx::query_as(&format!("SELECT id FROM {table} WHERE name = ?"))
                .bind(name)
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;
            id
        }
    };

    Ok(DimensionRef {
        id,
        name: name.to_string(),
    })
}

impl ObservationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn find_or_create_standalone(
        &self,
        dimension: Dimension,
        name: &str,
    ) -> Result<DimensionRef, AppError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        find_or_create(&mut conn, dimension, name).await
    }

    /// Save a new observation. Dimension rows and the observation commit together.
    pub async fn save(&self, observation: &NewObservation) -> Result<ObservationId, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        let domain = find_or_create(&mut tx, Dimension::Domain, &observation.domain).await?;
        let url = find_or_create(&mut tx, Dimension::Url, &observation.url).await?;
        let element = find_or_create(&mut tx, Dimension::Element, &observation.element).await?;

        let element_count = i64::try_from(observation.element_count)
            .map_err(|_| AppError::Internal("element count out of range".into()))?;

        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO observations (domain_id, url_id, element_id, element_count, duration_ms, fetched_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(domain.id)
        .bind(url.id)
        .bind(element.id)
        .bind(element_count)
        .bind(observation.duration_ms)
        .bind(observation.fetched_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(ObservationId(row.0))
    }

    /// Get the newest observation of a (url, element) pair fetched at or after `since`.
    pub async fn find_recent(
        &self,
        url: &str,
        element: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Observation>, AppError> {
        let row = sqlx::query_as::<_, ObservationRow>(&format!(
            r#"{OBSERVATION_COLUMNS}
            WHERE u.name = ? AND e.name = ? AND o.fetched_at >= ?
            ORDER BY o.fetched_at DESC, o.id DESC
            LIMIT 1
            "#
        ))
        .bind(url)
        .bind(element)
        .bind(since)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    /// Get a single observation by id.
    pub async fn get(&self, id: ObservationId) -> Result<Option<Observation>, AppError> {
        let row =
            sqlx::query_as::<_, ObservationRow>(&format!("{OBSERVATION_COLUMNS} WHERE o.id = ?"))
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    pub async fn domain_total_urls(&self, domain: &str) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT o.url_id)
            FROM observations o
            JOIN domains d ON d.id = o.domain_id
            WHERE d.name = ?
            "#,
        )
        .bind(domain)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(count)
    }

    pub async fn domain_avg_response_time(
        &self,
        domain: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<f64>, AppError> {
        let (avg,): (Option<f64>,) = sqlx::query_as(
            r#"
            SELECT AVG(o.duration_ms)
            FROM observations o
            JOIN domains d ON d.id = o.domain_id
            WHERE d.name = ? AND o.fetched_at >= ?
            "#,
        )
        .bind(domain)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(avg)
    }

    pub async fn elements_count_on_domain(
        &self,
        domain: &str,
        element: &str,
        policy: ElementCountPolicy,
    ) -> Result<i64, AppError> {
        let (sum,): (i64,) = sqlx::query_as(&format!(
            r#"
            SELECT COALESCE(SUM(o.element_count), 0)
            FROM observations o
            JOIN domains d ON d.id = o.domain_id
            JOIN elements e ON e.id = o.element_id
            WHERE d.name = ? AND e.name = ?
            {}
            "#,
            policy_filter(policy)
        ))
        .bind(domain)
        .bind(element)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(sum)
    }

    pub async fn element_count_on_all_requests(
        &self,
        element: &str,
        policy: ElementCountPolicy,
    ) -> Result<i64, AppError> {
        let (sum,): (i64,) = sqlx::query_as(&format!(
            r#"
            SELECT COALESCE(SUM(o.element_count), 0)
            FROM observations o
            JOIN elements e ON e.id = o.element_id
            WHERE e.name = ?
            {}
            "#,
            policy_filter(policy)
        ))
        .bind(element)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(sum)
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct ObservationRow {
    id: i64,
    domain: String,
    url: String,
    element: String,
    element_count: i64,
    duration_ms: f64,
    fetched_at: DateTime<Utc>,
}

impl From<ObservationRow> for Observation {
    fn from(row: ObservationRow) -> Self {
        Observation {
            id: ObservationId(row.id),
            domain: row.domain,
            url: row.url,
            element: row.element,
            // CHECK (element_count >= 0) holds for every stored row
            element_count: row.element_count.max(0) as u64,
            duration_ms: row.duration_ms,
            fetched_at: row.fetched_at,
        }
    }
}

// -- Trait implementations --

impl ObservationStore for ObservationRepository {
    async fn find_or_create_domain(&self, name: &str) -> Result<DimensionRef, AppError> {
        self.find_or_create_standalone(Dimension::Domain, name).await
    }

    async fn find_or_create_url(&self, name: &str) -> Result<DimensionRef, AppError> {
        self.find_or_create_standalone(Dimension::Url, name).await
    }

    async fn find_or_create_element(&self, name: &str) -> Result<DimensionRef, AppError> {
        self.find_or_create_standalone(Dimension::Element, name)
            .await
    }

    async fn save(&self, observation: &NewObservation) -> Result<ObservationId, AppError> {
        ObservationRepository::save(self, observation).await
    }

    async fn find_recent(
        &self,
        url: &str,
        element: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Observation>, AppError> {
        ObservationRepository::find_recent(self, url, element, since).await
    }
}

impl StatsStore for ObservationRepository {
    async fn domain_total_urls(&self, domain: &str) -> Result<i64, AppError> {
        ObservationRepository::domain_total_urls(self, domain).await
    }

    async fn domain_avg_response_time(
        &self,
        domain: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<f64>, AppError> {
        ObservationRepository::domain_avg_response_time(self, domain, since).await
    }

    async fn elements_count_on_domain(
        &self,
        domain: &str,
        element: &str,
        policy: ElementCountPolicy,
    ) -> Result<i64, AppError> {
        ObservationRepository::elements_count_on_domain(self, domain, element, policy).await
    }

    async fn element_count_on_all_requests(
        &self,
        element: &str,
        policy: ElementCountPolicy,
    ) -> Result<i64, AppError> {
        ObservationRepository::element_count_on_all_requests(self, element, policy).await
    }
}
