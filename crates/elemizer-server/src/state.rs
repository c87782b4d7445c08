use elemizer_client::{ReqwestFetcher, ScraperCounter};
use elemizer_core::{CountConfig, CountService, StatsEngine};
use elemizer_db::{Database, ObservationRepository};

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub db: Database,
    pub fetcher: ReqwestFetcher,
    pub counter: ScraperCounter,
    pub config: CountConfig,
}

impl AppState {
    pub fn count_service(
        &self,
    ) -> CountService<ReqwestFetcher, ScraperCounter, ObservationRepository> {
        CountService::new(
            self.fetcher.clone(),
            self.counter,
            self.db.observation_repo(),
            self.config.clone(),
        )
    }

    pub fn stats_engine(&self) -> StatsEngine<ObservationRepository> {
        StatsEngine::new(self.db.observation_repo(), &self.config)
    }
}
