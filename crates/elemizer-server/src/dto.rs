use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use elemizer_core::models::{CountOutcome, Stats};

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_VALIDATION_ERROR: &str = "validation-error";
pub const STATUS_ERROR_MESSAGE: &str = "error-message";

// ---------------------------------------------------------------------------
// Count elements
// ---------------------------------------------------------------------------

/// Missing fields are treated as empty strings and fail validation.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountElementsRequest {
    #[schema(example = "https://example.com")]
    pub target_url: Option<String>,
    #[schema(example = "div")]
    pub target_element: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountElementsData {
    pub domain_name: String,
    pub url: String,
    pub element: String,
    pub count: u64,
    pub fetch_duration_ms: f64,
    pub fetched_at: DateTime<Utc>,
    /// True when served from an observation inside the de-dup window.
    pub cached: bool,
    pub stats: StatsData,
}

impl From<CountOutcome> for CountElementsData {
    fn from(outcome: CountOutcome) -> Self {
        let observation = outcome.observation;
        Self {
            domain_name: observation.domain,
            url: observation.url,
            element: observation.element,
            count: observation.element_count,
            fetch_duration_ms: observation.duration_ms,
            fetched_at: observation.fetched_at,
            cached: outcome.cached,
            stats: outcome.stats.into(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CountElementsResponse {
    #[schema(example = "success")]
    pub status: &'static str,
    pub data: CountElementsData,
}

impl CountElementsResponse {
    pub fn new(data: CountElementsData) -> Self {
        Self {
            status: STATUS_SUCCESS,
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatsQuery {
    pub domain: String,
    pub element: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsData {
    pub domain_total_urls: i64,
    /// Milliseconds; `null` when the domain has no fetches inside the averaging window.
    pub domain_avg_response_time: Option<f64>,
    pub elements_count_on_domain: i64,
    pub element_count_on_all_requests: i64,
}

impl From<Stats> for StatsData {
    fn from(stats: Stats) -> Self {
        Self {
            domain_total_urls: stats.domain_total_urls,
            domain_avg_response_time: stats.domain_avg_response_time,
            elements_count_on_domain: stats.elements_count_on_domain,
            element_count_on_all_requests: stats.element_count_on_all_requests,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct StatsResponse {
    #[schema(example = "success")]
    pub status: &'static str,
    pub data: StatsData,
}

impl StatsResponse {
    pub fn new(data: StatsData) -> Self {
        Self {
            status: STATUS_SUCCESS,
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Per-field messages; only failing fields are present.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ValidationErrorResponse {
    #[schema(example = "validation-error")]
    pub status: &'static str,
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrorResponse {
    pub fn new(errors: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            status: STATUS_VALIDATION_ERROR,
            errors,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorMessageResponse {
    #[schema(example = "error-message")]
    pub status: &'static str,
    pub message: String,
}

impl ErrorMessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR_MESSAGE,
            message: message.into(),
        }
    }
}
