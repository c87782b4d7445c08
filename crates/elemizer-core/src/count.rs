use chrono::Utc;

use crate::config::CountConfig;
use crate::error::AppError;
use crate::models::{CountOutcome, NewObservation, Observation};
use crate::stats::StatsEngine;
use crate::traits::{ElementCounter, Fetcher, ObservationStore, StatsStore};
use crate::validate::validate_count_input;

/// Orchestrates one count request: validate → de-dup lookup → fetch → count → save → stats.
///
/// Generic over its collaborators so the pipeline can be exercised without real HTTP
/// or a database.
pub struct CountService<F, C, S>
where
    F: Fetcher,
    C: ElementCounter,
    S: ObservationStore + StatsStore,
{
    fetcher: F,
    counter: C,
    store: S,
    config: CountConfig,
}

impl<F, C, S> CountService<F, C, S>
where
    F: Fetcher,
    C: ElementCounter,
    S: ObservationStore + StatsStore,
{
    pub fn new(fetcher: F, counter: C, store: S, config: CountConfig) -> Self {
        Self {
            fetcher,
            counter,
            store,
            config,
        }
    }

    /// Run the pipeline for raw request fields.
    ///
    /// Validation happens before any I/O. A failed fetch aborts the pipeline with
    /// nothing persisted.
    pub async fn count(
        &self,
        target_url: &str,
        target_element: &str,
    ) -> Result<CountOutcome, AppError> {
        let input = validate_count_input(target_url, target_element).map_err(|errors| {
            tracing::info!(%errors, "Validation failed");
            AppError::Validation(errors)
        })?;

        let recent = if self.config.dedup_window.is_zero() {
            None
        } else {
            let since = Utc::now()
                .checked_sub_signed(self.config.dedup_window)
                .ok_or_else(|| {
                    AppError::ConfigError("De-dup window is out of range".into())
                })?;
            self.store
                .find_recent(&input.url, &input.element, since)
                .await?
        };

        let (observation, cached) = match recent {
            Some(observation) => {
                tracing::info!(
                    url = %input.url,
                    element = %input.element,
                    id = %observation.id,
                    "Serving observation from de-dup window"
                );
                (observation, true)
            }
            None => (self.fetch_and_store(&input.url, &input.element).await?, false),
        };

        let stats = StatsEngine::new(self.store.clone(), &self.config)
            .compute(&observation.domain, &observation.element, Utc::now())
            .await?;

        Ok(CountOutcome {
            observation,
            stats,
            cached,
        })
    }

    async fn fetch_and_store(&self, url: &str, element: &str) -> Result<Observation, AppError> {
        tracing::info!("Fetching {}", url);
        let fetched = self.fetcher.fetch(url).await.map_err(|e| {
            tracing::warn!(%url, error = %e, "Fetch failed");
            e
        })?;
        tracing::info!(
            status = fetched.status_code,
            bytes = fetched.body.len(),
            duration_ms = fetched.total_duration_ms,
            "Fetched {}",
            url
        );

        let element_count = self.counter.count(element, &fetched.body)?;
        tracing::info!(element, element_count, "Counted elements");

        let new_observation = NewObservation {
            domain: fetched.domain_name,
            url: url.to_string(),
            element: element.to_string(),
            element_count,
            duration_ms: fetched.total_duration_ms,
            fetched_at: Utc::now(),
        };
        let id = self.store.save(&new_observation).await?;
        tracing::info!(%id, domain = %new_observation.domain, "Saved observation");

        Ok(Observation {
            id,
            domain: new_observation.domain,
            url: new_observation.url,
            element: new_observation.element,
            element_count: new_observation.element_count,
            duration_ms: new_observation.duration_ms,
            fetched_at: new_observation.fetched_at,
        })
    }
}
