use elemizer_core::AppError;
use elemizer_core::util::env_or;

/// Configuration for the database connection pool.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Read configuration from environment variables.
    ///
    /// - `DATABASE_URL` (required, e.g. `sqlite://elemizer.db` or `sqlite::memory:`)
    /// - `DATABASE_MAX_CONNECTIONS` (optional, defaults to 5)
    pub fn from_env() -> Result<Self, AppError> {
        let url = std::env::var("DATABASE_URL").map_err(|_| {
            AppError::ConfigError("DATABASE_URL not set. Required for database operations.".into())
        })?;
        Self::from_url(url)
    }

    /// Use an explicit URL; the pool size still comes from `DATABASE_MAX_CONNECTIONS`.
    pub fn from_url(url: impl Into<String>) -> Result<Self, AppError> {
        let url = url.into();
        let max_connections: u32 = env_or("DATABASE_MAX_CONNECTIONS", 5)?;
        if max_connections == 0 {
            return Err(AppError::ConfigError(
                "DATABASE_MAX_CONNECTIONS must be at least 1".into(),
            ));
        }

        Ok(Self {
            url,
            max_connections,
        })
    }

    /// Single-connection in-memory database.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".into(),
            max_connections: 1,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}
