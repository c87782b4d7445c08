pub mod config;
pub mod counter;
pub mod fetcher;

pub use config::FetchConfig;
pub use counter::ScraperCounter;
pub use fetcher::ReqwestFetcher;
