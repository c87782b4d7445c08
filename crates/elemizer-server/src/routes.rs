use std::any::Any;
use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use chrono::Utc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;

use elemizer_core::error::{AppError, DEFAULT_ERROR_MESSAGE};
use elemizer_core::validate::validate_element;

use crate::dto::{
    CountElementsData, CountElementsRequest, CountElementsResponse, ErrorMessageResponse,
    HealthResponse, StatsQuery, StatsResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

const INVALID_BODY_MESSAGE: &str =
    "Invalid request body: expected a JSON object with targetUrl and targetElement.";

/// Request bodies are two short strings.
pub const MAX_BODY_BYTES: usize = 16 * 1024;

/// Build the full router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/api/count-elements", post(count_elements))
        .route("/api/stats", get(stats))
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .fallback(not_found)
        .with_state(state);

    with_error_layers(router)
}

/// Body limit, JSON error bodies, and panic recovery.
///
/// Every error that leaves the server is an `error-message` envelope, including
/// the ones produced by layers and by axum itself (413, 404, 405).
pub fn with_error_layers(router: Router) -> Router {
    router
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::map_response(json_error_body))
        .layer(CatchPanicLayer::custom(panic_response))
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        axum::Json(ErrorMessageResponse::new("Not found.")),
    )
        .into_response()
}

async fn json_error_body(response: Response) -> Response {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));
    if is_json {
        return response;
    }

    let message = match status {
        StatusCode::PAYLOAD_TOO_LARGE => "Request body is too large.",
        StatusCode::METHOD_NOT_ALLOWED => "Method not allowed.",
        StatusCode::NOT_FOUND => "Not found.",
        _ if status.is_server_error() => DEFAULT_ERROR_MESSAGE,
        _ => status.canonical_reason().unwrap_or("Bad request."),
    };
    tracing::debug!(%status, "Replacing non-JSON error body");

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.remove(header::CONTENT_TYPE);
    (parts, axum::Json(ErrorMessageResponse::new(message))).into_response()
}

fn panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Request handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(ErrorMessageResponse::new(DEFAULT_ERROR_MESSAGE)),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Count elements
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/count-elements",
    request_body = CountElementsRequest,
    responses(
        (status = 200, description = "Element count and statistics", body = CountElementsResponse),
        (status = 422, description = "Invalid input", body = crate::dto::ValidationErrorResponse),
        (status = 400, description = "Fetch or processing failure", body = crate::dto::ErrorMessageResponse),
    ),
    tag = "count"
)]
pub async fn count_elements(
    State(state): State<Arc<AppState>>,
    body: Result<axum::Json<CountElementsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let axum::Json(body) = body.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        AppError::BadRequest(INVALID_BODY_MESSAGE.to_string())
    })?;

    let target_url = body.target_url.unwrap_or_default();
    let target_element = body.target_element.unwrap_or_default();

    let outcome = state
        .count_service()
        .count(&target_url, &target_element)
        .await?;

    Ok(axum::Json(CountElementsResponse::new(
        CountElementsData::from(outcome),
    )))
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/stats",
    params(StatsQuery),
    responses(
        (status = 200, description = "Aggregates for a domain and element", body = StatsResponse),
        (status = 422, description = "Invalid input", body = crate::dto::ValidationErrorResponse),
        (status = 400, description = "Bad request", body = crate::dto::ErrorMessageResponse),
    ),
    tag = "stats"
)]
pub async fn stats(
    State(state): State<Arc<AppState>>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        AppError::BadRequest(format!("Invalid query: {}", rejection.body_text()))
    })?;

    let domain = query.domain.trim();
    let element = match validate_element(&query.element) {
        Ok(element) if !domain.is_empty() => element,
        result => {
            let mut errors = result.err().unwrap_or_default();
            if domain.is_empty() {
                errors.add("domain", "Domain must not be empty");
            }
            return Err(AppError::Validation(errors).into());
        }
    };

    let stats = state
        .stats_engine()
        .compute(domain, &element, Utc::now())
        .await?;

    Ok(axum::Json(StatsResponse::new(stats.into())))
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db_status = match state.db.observation_repo().health_check().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::error!(error = %e, "Database health check failed");
            "error"
        }
    };

    let status = if db_status == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if db_status == "ok" {
            "healthy"
        } else {
            "unhealthy"
        },
        database: db_status,
    };

    (status, axum::Json(response))
}

async fn openapi_json() -> impl IntoResponse {
    axum::Json(ApiDoc::openapi())
}

