use thiserror::Error;

use crate::validate::ValidationErrors;

/// Message returned to clients when the failure is internal and must not leak details.
pub const DEFAULT_ERROR_MESSAGE: &str = "Something went wrong. Please contact the developer!";

/// Application-wide error types for Elemizer.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request input failed validation (per-field messages).
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The request itself was malformed (e.g. a body that is not a JSON object).
    /// The message is shown to the client as is.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The remote server answered with a non-2xx, non-redirect status.
    #[error("HTTP {status} from {url}")]
    RemoteStatus {
        status: u16,
        url: String,
        domain: String,
    },

    /// The remote server answered with a redirect and following is disabled.
    #[error("Redirected by {domain} to {}", .location.as_deref().unwrap_or("<unknown>"))]
    Redirected {
        domain: String,
        location: Option<String>,
    },

    /// HTTP request could not be built, was refused locally, or the body was unreadable.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Element counting failed.
    #[error("Counter error: {0}")]
    CounterError(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Configuration is missing or malformed.
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Anything unanticipated.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns true if the error came from the outbound fetch.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            AppError::RemoteStatus { .. }
                | AppError::Redirected { .. }
                | AppError::HttpError(_)
                | AppError::NetworkError(_)
                | AppError::Timeout(_)
        )
    }

    /// The message safe to show to an end user.
    ///
    /// Fetch failures get a description of what the remote server did; everything
    /// else collapses to [`DEFAULT_ERROR_MESSAGE`].
    pub fn client_message(&self) -> String {
        match self {
            AppError::Validation(errors) => errors.to_string(),
            AppError::BadRequest(message) => message.clone(),
            AppError::RemoteStatus {
                status,
                url,
                domain,
            } => remote_status_message(*status, url, domain),
            AppError::Redirected { domain, .. } => {
                format!("Redirected: server at {domain} redirected to another location.")
            }
            AppError::Timeout(_) => {
                "Request Timeout: The connection to the external server timed out.".to_string()
            }
            AppError::HttpError(_) | AppError::NetworkError(_) => {
                "Unable to fetch data from the external server.".to_string()
            }
            AppError::CounterError(_)
            | AppError::DatabaseError(_)
            | AppError::ConfigError(_)
            | AppError::Internal(_) => DEFAULT_ERROR_MESSAGE.to_string(),
        }
    }
}

fn remote_status_message(status: u16, url: &str, domain: &str) -> String {
    match status {
        400 => "Bad Request: The external server could not understand the request.".to_string(),
        401 => "Unauthorized: we can only analyse publicly accessible pages.".to_string(),
        403 => format!("Access Denied: The external server at {url} denied access to this page."),
        404 => format!(
            "Page Not Found: The page at {url} was not found. Please make sure you entered the correct URL."
        ),
        405 => "Method Not Allowed: we can only send GET requests to remote servers.".to_string(),
        408 => format!("Request Timeout: The connection to the external server at {domain} timed out."),
        409 => format!(
            "Conflict: There is a conflict with the current state of the external resource at {url}."
        ),
        429 => format!(
            "Too Many Requests: You have exceeded the rate limit for accessing the external resource at {domain}."
        ),
        _ => format!("Unable to fetch data from the external server at {url}."),
    }
}
