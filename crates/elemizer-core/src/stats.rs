use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CountConfig;
use crate::error::AppError;
use crate::models::Stats;
use crate::traits::StatsStore;

/// Which observations feed the element-count sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementCountPolicy {
    /// Only the newest observation of each (url, element) pair counts, so refetching
    /// a page does not inflate the total.
    #[default]
    LatestPerUrl,
    /// Every stored observation counts.
    AllHistory,
}

impl ElementCountPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementCountPolicy::LatestPerUrl => "latest-per-url",
            ElementCountPolicy::AllHistory => "all-history",
        }
    }
}

impl fmt::Display for ElementCountPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ElementCountPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "latest-per-url" => Ok(ElementCountPolicy::LatestPerUrl),
            "all-history" => Ok(ElementCountPolicy::AllHistory),
            _ => Err(format!("Unknown element count policy: {}", s)),
        }
    }
}

/// Computes the aggregates reported next to every count result.
pub struct StatsEngine<S: StatsStore> {
    store: S,
    avg_window: TimeDelta,
    policy: ElementCountPolicy,
}

impl<S: StatsStore> StatsEngine<S> {
    pub fn new(store: S, config: &CountConfig) -> Self {
        Self {
            store,
            avg_window: config.avg_window,
            policy: config.element_count_policy,
        }
    }

    pub async fn domain_total_urls(&self, domain: &str) -> Result<i64, AppError> {
        self.store.domain_total_urls(domain).await
    }

    /// Average fetch time on `domain` over the window ending at `now`.
    pub async fn domain_avg_response_time(
        &self,
        domain: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<f64>, AppError> {
        let since = now
            .checked_sub_signed(self.avg_window)
            .ok_or_else(|| AppError::ConfigError("Averaging window is out of range".into()))?;
        self.store.domain_avg_response_time(domain, since).await
    }

    pub async fn elements_count_on_domain(
        &self,
        domain: &str,
        element: &str,
    ) -> Result<i64, AppError> {
        self.store
            .elements_count_on_domain(domain, element, self.policy)
            .await
    }

    pub async fn element_count_on_all_requests(&self, element: &str) -> Result<i64, AppError> {
        self.store
            .element_count_on_all_requests(element, self.policy)
            .await
    }

    /// Run all four aggregates for a (domain, element) pair.
    pub async fn compute(
        &self,
        domain: &str,
        element: &str,
        now: DateTime<Utc>,
    ) -> Result<Stats, AppError> {
        let stats = Stats {
            domain_total_urls: self.domain_total_urls(domain).await?,
            domain_avg_response_time: self.domain_avg_response_time(domain, now).await?,
            elements_count_on_domain: self.elements_count_on_domain(domain, element).await?,
            element_count_on_all_requests: self.element_count_on_all_requests(element).await?,
        };
        tracing::debug!(
            domain,
            element,
            policy = %self.policy,
            total_urls = stats.domain_total_urls,
            "Computed stats"
        );
        Ok(stats)
    }
}
