pub mod config;
pub mod count;
pub mod element;
pub mod error;
pub mod models;
pub mod stats;
pub mod traits;
pub mod util;
pub mod validate;

#[cfg(test)]
mod testutil;

pub use config::CountConfig;
pub use count::CountService;
pub use element::{HTML_ELEMENT_NAMES, is_valid_element_name};
pub use error::AppError;
pub use models::{
    CountOutcome, DimensionRef, FetchResult, NewObservation, Observation, ObservationId, Stats,
};
pub use stats::{ElementCountPolicy, StatsEngine};
pub use traits::{ElementCounter, Fetcher, ObservationStore, StatsStore};
pub use validate::{CountInput, ValidationErrors, validate_count_input, validate_element};
