use std::time::Duration;

use elemizer_core::AppError;
use elemizer_core::util::{env_flag, env_or};

/// Configuration for outbound page fetches.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Bound on the whole request, body included.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Follow up to [`MAX_REDIRECTS`](crate::fetcher::MAX_REDIRECTS) hops instead of
    /// reporting the redirect as an error.
    pub follow_redirects: bool,
    /// Skip the private/reserved address check.
    pub allow_private_urls: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            follow_redirects: false,
            allow_private_urls: false,
        }
    }
}

impl FetchConfig {
    /// Read configuration from environment variables.
    ///
    /// - `ELEMIZER_FETCH_TIMEOUT_SECS` (optional, defaults to 10)
    /// - `ELEMIZER_FOLLOW_REDIRECTS` (optional, defaults to false)
    /// - `ELEMIZER_ALLOW_PRIVATE_URLS` (optional, defaults to false)
    pub fn from_env() -> Result<Self, AppError> {
        let timeout_secs: u64 = env_or("ELEMIZER_FETCH_TIMEOUT_SECS", 10)?;
        if timeout_secs == 0 {
            return Err(AppError::ConfigError(
                "ELEMIZER_FETCH_TIMEOUT_SECS must be at least 1".into(),
            ));
        }
        let timeout = Duration::from_secs(timeout_secs);

        Ok(Self {
            timeout,
            connect_timeout: timeout.min(Duration::from_secs(5)),
            follow_redirects: env_flag("ELEMIZER_FOLLOW_REDIRECTS", false)?,
            allow_private_urls: env_flag("ELEMIZER_ALLOW_PRIVATE_URLS", false)?,
        })
    }
}
