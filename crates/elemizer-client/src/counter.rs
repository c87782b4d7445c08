use elemizer_core::error::AppError;
use elemizer_core::traits::ElementCounter;
use scraper::{Html, Selector};

/// Counts elements with a lenient HTML5 parse.
///
/// Malformed markup is repaired by the parser rather than rejected, so a page
/// always yields a count.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScraperCounter;

impl ScraperCounter {
    pub fn new() -> Self {
        Self
    }
}

impl ElementCounter for ScraperCounter {
    fn count(&self, element: &str, html: &str) -> Result<u64, AppError> {
        let selector = Selector::parse(element)
            .map_err(|e| AppError::CounterError(format!("Invalid element '{element}': {e}")))?;
        let document = Html::parse_document(html);
        Ok(document.select(&selector).count() as u64)
    }
}
