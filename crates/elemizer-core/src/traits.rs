use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{DimensionRef, FetchResult, NewObservation, Observation, ObservationId};
use crate::stats::ElementCountPolicy;

/// Downloads a page with a single HTTP GET.
pub trait Fetcher: Send + Sync + Clone {
    /// Fetch `url`, failing on non-2xx answers and on redirects the fetcher refuses to follow.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchResult, AppError>> + Send;
}

/// Counts occurrences of an HTML element in markup.
pub trait ElementCounter: Send + Sync + Clone {
    fn count(&self, element: &str, html: &str) -> Result<u64, AppError>;
}

/// Persists observations and their dimension rows.
pub trait ObservationStore: Send + Sync + Clone {
    fn find_or_create_domain(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<DimensionRef, AppError>> + Send;

    fn find_or_create_url(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<DimensionRef, AppError>> + Send;

    fn find_or_create_element(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<DimensionRef, AppError>> + Send;

    /// Save a new observation, creating missing dimension rows in the same transaction.
    fn save(
        &self,
        observation: &NewObservation,
    ) -> impl Future<Output = Result<ObservationId, AppError>> + Send;

    /// Most recent observation for the exact (url, element) pair fetched at or after `since`.
    fn find_recent(
        &self,
        url: &str,
        element: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<Observation>, AppError>> + Send;
}

/// Aggregate queries over stored observations. Each method is one query.
pub trait StatsStore: Send + Sync + Clone {
    /// Number of distinct URLs observed on `domain`.
    fn domain_total_urls(&self, domain: &str)
    -> impl Future<Output = Result<i64, AppError>> + Send;

    /// Mean duration of `domain` observations fetched at or after `since`, `None` if there are none.
    fn domain_avg_response_time(
        &self,
        domain: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<f64>, AppError>> + Send;

    /// Sum of element counts for `element` on `domain`.
    fn elements_count_on_domain(
        &self,
        domain: &str,
        element: &str,
        policy: ElementCountPolicy,
    ) -> impl Future<Output = Result<i64, AppError>> + Send;

    /// Sum of element counts for `element` across every domain.
    fn element_count_on_all_requests(
        &self,
        element: &str,
        policy: ElementCountPolicy,
    ) -> impl Future<Output = Result<i64, AppError>> + Send;
}
