pub mod handlers;
pub mod referer;

use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    app_state::AppState,
    dispatcher::{ContentKind, SiteInfo},
    extractor::SiteMetadata,
    health::{self, HealthResponse},
};

#[derive(OpenApi)]
#[openapi(
    paths(handlers::site_info, health::health_check),
    components(schemas(SiteInfo, SiteMetadata, ContentKind, referer::AccessNotice, HealthResponse)),
    tags(
        (name = "siteinfo", description = "Link preview metadata"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

pub fn router(state: AppState) -> Router {
    let lookups = Router::new()
        .route("/api/v1", get(handlers::site_info))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            referer::referer_gate,
        ));

    Router::new()
        .merge(lookups)
        .route("/healthz", get(health::health_check))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
