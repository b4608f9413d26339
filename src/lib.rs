pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::storage::UploadStore;
use crate::services::tools::PdfProcessor;
use axum::{
    Router,
    http::{Request, Response},
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Span, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Allowance on top of `max_file_size` for multipart boundaries and headers
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::process::process_file,
        api::handlers::download::download_file,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::process::ProcessResponse,
            api::handlers::process::ProcessForm,
            api::handlers::health::HealthResponse,
            services::tools::ToolStatus,
            models::Operation,
        )
    ),
    tags(
        (name = "pdf", description = "PDF processing endpoints"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<UploadStore>,
    pub processor: Arc<dyn PdfProcessor>,
    pub config: AppConfig,
}

pub fn create_app(state: AppState) -> Router {
    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(api::handlers::pages::index))
        .route("/health", get(api::handlers::health::health_check))
        .route("/process", post(api::handlers::process::process_file))
        .route(
            "/download/:filename",
            get(api::handlers::download::download_file),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_file_size + MULTIPART_OVERHEAD,
        ))
        .with_state(state);

    with_request_tracing(router)
}

/// Wrap a router in the request span and the `x-request-id` layer.
///
/// The request-id layer sits outside the trace layer so every span carries
/// the id, including ones generated for requests that arrived without it.
pub fn with_request_tracing(router: Router) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            let request_id = request
                .headers()
                .get(&api::middleware::request_id::REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &Request<_>, _span: &Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(|response: &Response<_>, latency: Duration, _span: &Span| {
            info!(
                "📤 Finished in {:?} with status {}",
                latency,
                response.status()
            );
        });

    router
        .layer(trace_layer)
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
}
