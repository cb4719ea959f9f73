// src/routes.rs

use axum::{
    Json, Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::{
    error::AppError,
    handlers::{content, favicon},
    models::content::{
        ArticleRenderRequest, PlainTextResponse, RenderedArticle, RichTextRequest,
        SanitizedResponse,
    },
    state::AppState,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        content::sanitize_html,
        content::plain_text,
        content::render_article,
        favicon::get_favicon,
    ),
    components(schemas(
        RichTextRequest,
        SanitizedResponse,
        PlainTextResponse,
        ArticleRenderRequest,
        RenderedArticle,
    )),
    tags((name = "portal", description = "Rich-text rendering and favicon proxy"))
)]
pub struct ApiDoc;

/// Assembles the main application router.
///
/// * Merges the content and favicon sub-routers.
/// * Serves the OpenAPI document.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let content_routes = Router::new()
        .route("/sanitize", post(content::sanitize_html))
        .route("/plain-text", post(content::plain_text))
        .route("/article", post(content::render_article));

    Router::new()
        .nest("/api/content", content_routes)
        .route("/api/favicon", get(favicon::get_favicon))
        .route("/api-docs/openapi.json", get(openapi_json))
        .fallback(not_found)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
