pub mod api;

use axum::{http::HeaderValue, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config, docs::ApiDoc, websocket::websocket_handler, AppState};
pub use api::create_api_routes;

/// Build the full application router: REST API, WebSocket endpoint and Swagger UI
pub fn create_app(app_state: Arc<AppState>) -> Router {
    Router::new()
        // Mount API routes
        .nest("/api", create_api_routes())
        // Real-time session endpoint
        .route("/ws", get(websocket_handler))
        .with_state(app_state)
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer())
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
}

fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = config::get_config()
        .allowed_origins()
        .into_iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}
