//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{DimensionRef, FetchResult, NewObservation, Observation, ObservationId};
use crate::stats::ElementCountPolicy;
use crate::traits::{ElementCounter, Fetcher, ObservationStore, StatsStore};

pub const MOCK_DURATION_MS: f64 = 42.0;

/// A successful fetch of `body` from example.com.
pub fn fetch_result(body: &str) -> FetchResult {
    FetchResult {
        status_code: 200,
        body: body.to_string(),
        domain_name: "example.com".to_string(),
        total_duration_ms: MOCK_DURATION_MS,
    }
}

/// An observation to preload into a [`MockStore`]; the store assigns the id.
pub fn observation_at(
    domain: &str,
    url: &str,
    element: &str,
    element_count: u64,
    duration_ms: f64,
    fetched_at: DateTime<Utc>,
) -> Observation {
    Observation {
        id: ObservationId(0),
        domain: domain.to_string(),
        url: url.to_string(),
        element: element.to_string(),
        element_count,
        duration_ms,
        fetched_at,
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns queued responses and records requested URLs.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a default page served by the requested host.
    responses: Arc<Mutex<Vec<Result<FetchResult, AppError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::with_responses(vec![Ok(fetch_result(html))])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<FetchResult, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResult, AppError> {
        self.calls.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            let domain_name = url::Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_default();
            Ok(FetchResult {
                domain_name,
                ..fetch_result("<html><body>default</body></html>")
            })
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockCounter
// ---------------------------------------------------------------------------

/// Mock counter that counts literal opening tags.
#[derive(Clone)]
pub struct MockCounter {
    error: Arc<Mutex<Option<AppError>>>,
}

impl MockCounter {
    pub fn new() -> Self {
        Self {
            error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            error: Arc::new(Mutex::new(Some(error))),
        }
    }
}

impl ElementCounter for MockCounter {
    fn count(&self, element: &str, html: &str) -> Result<u64, AppError> {
        let mut err = self.error.lock().unwrap();
        if let Some(e) = err.take() {
            return Err(e);
        }
        let html = html.to_lowercase();
        let count = [">", " ", "/"]
            .iter()
            .map(|end| html.matches(&format!("<{element}{end}")).count())
            .sum::<usize>();
        Ok(count as u64)
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MockStoreState {
    observations: Vec<Observation>,
    dimensions: HashMap<(&'static str, String), i64>,
    next_dimension_id: i64,
    find_recent_calls: usize,
}

impl MockStoreState {
    fn dimension(&mut self, table: &'static str, name: &str) -> DimensionRef {
        let key = (table, name.to_string());
        if let Some(id) = self.dimensions.get(&key) {
            return DimensionRef {
                id: *id,
                name: name.to_string(),
            };
        }
        self.next_dimension_id += 1;
        self.dimensions.insert(key, self.next_dimension_id);
        DimensionRef {
            id: self.next_dimension_id,
            name: name.to_string(),
        }
    }

    fn push(&mut self, mut observation: Observation) -> ObservationId {
        self.dimension("domains", &observation.domain);
        self.dimension("urls", &observation.url);
        self.dimension("elements", &observation.element);
        let id = ObservationId(self.observations.len() as i64 + 1);
        observation.id = id;
        self.observations.push(observation);
        id
    }

    /// Observations of `element` that the policy lets into a sum.
    fn counted<'a>(
        &'a self,
        element: &'a str,
        policy: ElementCountPolicy,
    ) -> impl Iterator<Item = &'a Observation> + 'a {
        self.observations.iter().filter(move |o| {
            o.element == element
                && match policy {
                    ElementCountPolicy::AllHistory => true,
                    ElementCountPolicy::LatestPerUrl => !self.observations.iter().any(|newer| {
                        newer.url == o.url
                            && newer.element == o.element
                            && (newer.fetched_at, newer.id.0) > (o.fetched_at, o.id.0)
                    }),
                }
        })
    }
}

/// In-memory store with the same query semantics as the SQL repository.
#[derive(Clone)]
pub struct MockStore {
    state: Arc<Mutex<MockStoreState>>,
    save_error: Arc<Mutex<Option<AppError>>>,
}

impl MockStore {
    pub fn empty() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockStoreState::default())),
            save_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Store preloaded with observations, ids assigned in order.
    pub fn with_observations(observations: Vec<Observation>) -> Self {
        let store = Self::empty();
        for observation in observations {
            store.push(observation);
        }
        store
    }

    /// Store that returns an error on save.
    pub fn with_save_error(error: AppError) -> Self {
        let store = Self::empty();
        *store.save_error.lock().unwrap() = Some(error);
        store
    }

    pub fn push(&self, observation: Observation) -> ObservationId {
        self.state.lock().unwrap().push(observation)
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().observations.len()
    }

    pub fn find_recent_calls(&self) -> usize {
        self.state.lock().unwrap().find_recent_calls
    }
}

impl ObservationStore for MockStore {
    async fn find_or_create_domain(&self, name: &str) -> Result<DimensionRef, AppError> {
        Ok(self.state.lock().unwrap().dimension("domains", name))
    }

    async fn find_or_create_url(&self, name: &str) -> Result<DimensionRef, AppError> {
        Ok(self.state.lock().unwrap().dimension("urls", name))
    }

    async fn find_or_create_element(&self, name: &str) -> Result<DimensionRef, AppError> {
        Ok(self.state.lock().unwrap().dimension("elements", name))
    }

    async fn save(&self, observation: &NewObservation) -> Result<ObservationId, AppError> {
        let mut err = self.save_error.lock().unwrap();
        if let Some(e) = err.take() {
            return Err(e);
        }
        Ok(self.push(Observation {
            id: ObservationId(0),
            domain: observation.domain.clone(),
            url: observation.url.clone(),
            element: observation.element.clone(),
            element_count: observation.element_count,
            duration_ms: observation.duration_ms,
            fetched_at: observation.fetched_at,
        }))
    }

    async fn find_recent(
        &self,
        url: &str,
        element: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Observation>, AppError> {
        let mut state = self.state.lock().unwrap();
        state.find_recent_calls += 1;
        Ok(state
            .observations
            .iter()
            .filter(|o| o.url == url && o.element == element && o.fetched_at >= since)
            .max_by_key(|o| (o.fetched_at, o.id.0))
            .cloned())
    }
}

impl StatsStore for MockStore {
    async fn domain_total_urls(&self, domain: &str) -> Result<i64, AppError> {
        let state = self.state.lock().unwrap();
        let urls: HashSet<&str> = state
            .observations
            .iter()
            .filter(|o| o.domain == domain)
            .map(|o| o.url.as_str())
            .collect();
        Ok(urls.len() as i64)
    }

    async fn domain_avg_response_time(
        &self,
        domain: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<f64>, AppError> {
        let state = self.state.lock().unwrap();
        let durations: Vec<f64> = state
            .observations
            .iter()
            .filter(|o| o.domain == domain && o.fetched_at >= since)
            .map(|o| o.duration_ms)
            .collect();
        if durations.is_empty() {
            Ok(None)
        } else {
            Ok(Some(durations.iter().sum::<f64>() / durations.len() as f64))
        }
    }

    async fn elements_count_on_domain(
        &self,
        domain: &str,
        element: &str,
        policy: ElementCountPolicy,
    ) -> Result<i64, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .counted(element, policy)
            .filter(|o| o.domain == domain)
            .map(|o| o.element_count as i64)
            .sum())
    }

    async fn element_count_on_all_requests(
        &self,
        element: &str,
        policy: ElementCountPolicy,
    ) -> Result<i64, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .counted(element, policy)
            .map(|o| o.element_count as i64)
            .sum())
    }
}
