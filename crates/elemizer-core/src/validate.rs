use std::collections::BTreeMap;
use std::fmt;

use url::Url;

use crate::element::is_valid_element_name;

pub const FIELD_URL: &str = "targetUrl";
pub const FIELD_ELEMENT: &str = "targetElement";

const INVALID_URL_MESSAGE: &str = "You have entered an invalid URL";
const INVALID_ELEMENT_MESSAGE: &str = "This is not a valid HTML element";

/// Per-field validation messages. Only fields with at least one message are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    pub fn into_fields(self) -> BTreeMap<String, Vec<String>> {
        self.fields
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Input of a count request after validation and normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountInput {
    /// The URL exactly as requested (surrounding whitespace removed).
    pub url: String,
    /// Lower-cased, whitelisted element name.
    pub element: String,
}

/// Validate raw request fields. Both fields are always checked so every error is reported.
pub fn validate_count_input(
    target_url: &str,
    target_element: &str,
) -> Result<CountInput, ValidationErrors> {
    let url = target_url.trim();
    let element = target_element.trim().to_lowercase();
    let mut errors = ValidationErrors::default();

    if !is_fetchable_url(url) {
        errors.add(FIELD_URL, INVALID_URL_MESSAGE);
    }
    if !is_valid_element_name(&element) {
        errors.add(FIELD_ELEMENT, INVALID_ELEMENT_MESSAGE);
    }

    if errors.is_empty() {
        Ok(CountInput {
            url: url.to_string(),
            element,
        })
    } else {
        Err(errors)
    }
}

/// Validate an element name on its own (used by the stats query).
pub fn validate_element(target_element: &str) -> Result<String, ValidationErrors> {
    let element = target_element.trim().to_lowercase();
    if is_valid_element_name(&element) {
        Ok(element)
    } else {
        let mut errors = ValidationErrors::default();
        errors.add(FIELD_ELEMENT, INVALID_ELEMENT_MESSAGE);
        Err(errors)
    }
}

/// Absolute http(s) URL with a host.
fn is_fetchable_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}
