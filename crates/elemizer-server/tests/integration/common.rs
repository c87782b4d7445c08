use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use http_body_util::BodyExt;
use tokio::net::TcpListener;
use tower::ServiceExt;

use elemizer_client::{FetchConfig, ReqwestFetcher, ScraperCounter};
use elemizer_core::CountConfig;
use elemizer_db::{Database, DatabaseConfig};
use elemizer_server::routes;
use elemizer_server::state::AppState;

pub const THREE_DIVS: &str =
    "<html><head><title>t</title></head><body><div>1</div><div>2</div><div>3</div></body></html>";

pub struct TestApp {
    pub router: Router,
    pub db: Database,
    /// Base URL of the local fixture site, e.g. `http://127.0.0.1:41234`.
    pub site: String,
}

/// In-memory database, default count config, and a fetcher allowed to reach the
/// local fixture site.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(CountConfig::default()).await
}

pub async fn setup_test_app_with(config: CountConfig) -> TestApp {
    let db = Database::connect(&DatabaseConfig::in_memory())
        .await
        .expect("Failed to open in-memory database");
    db.migrate().await.expect("Failed to run migrations");

    let fetcher = ReqwestFetcher::with_config(&FetchConfig {
        allow_private_urls: true,
        ..FetchConfig::default()
    })
    .expect("Failed to build fetcher");

    let state = Arc::new(AppState {
        db: db.clone(),
        fetcher,
        counter: ScraperCounter::new(),
        config,
    });

    TestApp {
        router: routes::router(state),
        db,
        site: spawn_fixture_site().await,
    }
}

/// Serve fixture pages on an ephemeral local port.
async fn spawn_fixture_site() -> String {
    let app = Router::new()
        .route("/three-divs", get(|| async { Html(THREE_DIVS) }))
        .route("/other", get(|| async { Html("<div>only one</div>") }))
        .route(
            "/moved",
            get(|| async {
                (
                    StatusCode::FOUND,
                    [(header::LOCATION, "/three-divs")],
                )
                    .into_response()
            }),
        )
        .route(
            "/limited",
            get(|| async { StatusCode::TOO_MANY_REQUESTS.into_response() }),
        );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fixture site");
    let addr = listener.local_addr().expect("Fixture site has no address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Fixture site crashed");
    });
    format!("http://{addr}")
}

/// POST a raw body to the count endpoint and decode the JSON answer.
pub async fn post_count(router: &Router, body: String) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(
            Request::post("/api/count-elements")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

pub async fn count(router: &Router, url: &str, element: &str) -> (StatusCode, serde_json::Value) {
    let body = serde_json::json!({ "targetUrl": url, "targetElement": element });
    post_count(router, body.to_string()).await
}

pub async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

/// Send an arbitrary request and decode the JSON answer.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    read_json(response).await
}

pub async fn read_json(response: axum::response::Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap();
    (status, json)
}

pub async fn observation_count(db: &Database) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM observations")
        .fetch_one(db.pool())
        .await
        .unwrap();
    count
}
