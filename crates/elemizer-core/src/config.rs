use chrono::TimeDelta;

use crate::error::AppError;
use crate::stats::ElementCountPolicy;
use crate::util::env_or;

/// Upper bound for `ELEMIZER_DEDUP_WINDOW_SECS` (30 days).
pub const MAX_DEDUP_WINDOW_SECS: i64 = 30 * 24 * 60 * 60;
/// Upper bound for `ELEMIZER_AVG_WINDOW_HOURS` (10 years).
pub const MAX_AVG_WINDOW_HOURS: i64 = 10 * 365 * 24;

/// Runtime settings of the count pipeline and the statistics it reports.
#[derive(Debug, Clone)]
pub struct CountConfig {
    /// A repeat request for the same (url, element) inside this window is served from storage.
    pub dedup_window: TimeDelta,
    /// Trailing window for the average response time.
    pub avg_window: TimeDelta,
    pub element_count_policy: ElementCountPolicy,
}

impl Default for CountConfig {
    fn default() -> Self {
        Self {
            dedup_window: TimeDelta::minutes(5),
            avg_window: TimeDelta::hours(24),
            element_count_policy: ElementCountPolicy::default(),
        }
    }
}

impl CountConfig {
    /// Read configuration from environment variables.
    ///
    /// - `ELEMIZER_DEDUP_WINDOW_SECS` (optional, defaults to 300; 0 disables de-duplication)
    /// - `ELEMIZER_AVG_WINDOW_HOURS` (optional, defaults to 24)
    /// - `ELEMIZER_ELEMENT_COUNT_POLICY` (optional, `latest-per-url` or `all-history`)
    pub fn from_env() -> Result<Self, AppError> {
        let dedup_secs: i64 = env_or("ELEMIZER_DEDUP_WINDOW_SECS", 300)?;
        let avg_hours: i64 = env_or("ELEMIZER_AVG_WINDOW_HOURS", 24)?;
        let element_count_policy = env_or(
            "ELEMIZER_ELEMENT_COUNT_POLICY",
            ElementCountPolicy::default(),
        )?;

        Self::from_values(dedup_secs, avg_hours, element_count_policy)
    }

    /// Build a config from raw window sizes, rejecting out-of-range values.
    pub fn from_values(
        dedup_secs: i64,
        avg_hours: i64,
        element_count_policy: ElementCountPolicy,
    ) -> Result<Self, AppError> {
        if !(0..=MAX_DEDUP_WINDOW_SECS).contains(&dedup_secs) {
            return Err(AppError::ConfigError(format!(
                "ELEMIZER_DEDUP_WINDOW_SECS must be between 0 and {MAX_DEDUP_WINDOW_SECS}"
            )));
        }
        if !(1..=MAX_AVG_WINDOW_HOURS).contains(&avg_hours) {
            return Err(AppError::ConfigError(format!(
                "ELEMIZER_AVG_WINDOW_HOURS must be between 1 and {MAX_AVG_WINDOW_HOURS}"
            )));
        }

        Ok(Self {
            dedup_window: TimeDelta::seconds(dedup_secs),
            avg_window: TimeDelta::hours(avg_hours),
            element_count_policy,
        })
    }

    pub fn with_dedup_window(mut self, window: TimeDelta) -> Self {
        self.dedup_window = window;
        self
    }

    pub fn with_policy(mut self, policy: ElementCountPolicy) -> Self {
        self.element_count_policy = policy;
        self
    }
}
