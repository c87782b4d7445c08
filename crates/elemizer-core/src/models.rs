use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Primary key of a stored observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ObservationId(pub i64);

impl fmt::Display for ObservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A row of one of the dimension tables (domains, urls, elements).
///
/// Dimension rows are created on first sighting and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionRef {
    pub id: i64,
    pub name: String,
}

/// Result of a successful outbound fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status_code: u16,
    pub body: String,
    /// Host component of the URL the body was served from.
    pub domain_name: String,
    /// Wall-clock time of the whole request/response cycle, body included.
    pub total_duration_ms: f64,
}

/// DTO for inserting a new observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewObservation {
    pub domain: String,
    pub url: String,
    pub element: String,
    pub element_count: u64,
    pub duration_ms: f64,
    pub fetched_at: DateTime<Utc>,
}

/// One stored fetch: "element X appeared N times on URL Y at time T, taking D ms".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub id: ObservationId,
    pub domain: String,
    pub url: String,
    pub element: String,
    pub element_count: u64,
    pub duration_ms: f64,
    pub fetched_at: DateTime<Utc>,
}

/// Aggregates computed over the stored observations for one (domain, element) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    /// Distinct URLs ever fetched on the domain.
    pub domain_total_urls: i64,
    /// Mean fetch duration on the domain inside the averaging window; `None` means no data.
    pub domain_avg_response_time: Option<f64>,
    pub elements_count_on_domain: i64,
    pub element_count_on_all_requests: i64,
}

/// What the count pipeline produced for one request.
#[derive(Debug, Clone, Serialize)]
pub struct CountOutcome {
    pub observation: Observation,
    pub stats: Stats,
    /// True when the observation was served from the de-dup window instead of a fresh fetch.
    pub cached: bool,
}
