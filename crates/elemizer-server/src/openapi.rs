use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Elemizer API",
        version = "0.1.0",
        description = "Counts HTML elements on web pages and reports per-domain statistics."
    ),
    paths(
        crate::routes::count_elements,
        crate::routes::stats,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::CountElementsRequest,
        crate::dto::CountElementsResponse,
        crate::dto::CountElementsData,
        crate::dto::StatsResponse,
        crate::dto::StatsData,
        crate::dto::HealthResponse,
        crate::dto::ValidationErrorResponse,
        crate::dto::ErrorMessageResponse,
    )),
    tags(
        (name = "count", description = "Element counting"),
        (name = "stats", description = "Aggregate statistics"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
