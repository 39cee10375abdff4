mod models;
mod handlers;
mod routes;
mod docs;
mod config;
mod websocket;
mod ws;

use config::Config;
use routes::create_app;
use std::panic;
use std::sync::Arc;
use tracing::{info, error, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use ws::{doccache::sample_document, DocumentCache, SessionCoordinator};

/// Shared state handed to every route
pub struct AppState {
    pub coordinator: Arc<SessionCoordinator>,
    pub documents: Arc<DocumentCache>,
}

impl AppState {
    pub fn new(documents: Arc<DocumentCache>) -> Self {
        Self {
            coordinator: Arc::new(SessionCoordinator::new(documents.clone())),
            documents,
        }
    }
}

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Configuration comes first so LOG_LEVEL can shape the tracing filter
    let loaded = Config::load();
    let fallback_filter = loaded
        .as_ref()
        .map(Config::log_filter)
        .unwrap_or_else(|_| Config::default().log_filter());

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback_filter.into()))
        .init();

    info!("Starting server...");

    let config = config::init_config(match loaded {
        Ok(config) => {
            info!("✅ Configuration loaded successfully");
            config
        }
        Err(e) => {
            error!("❌ Failed to load configuration: {}", e);
            warn!("Using default configuration");
            Config::default()
        }
    });

    info!("Environment: {} (log level {})", config.environment, config.log_level);
    if config.is_development() && config.allowed_origins().is_empty() {
        warn!("CORS_ORIGINS not set - accepting requests from any origin");
    }

    // In-memory document cache, seeded with the welcome document
    let documents = Arc::new(DocumentCache::new(config.document_capacity));
    if config.seed_sample_document {
        documents.insert(sample_document());
    } else {
        warn!("Sample document seeding disabled - the document cache starts empty");
    }

    let app_state = Arc::new(AppState::new(documents));
    let app_routes = create_app(app_state);

    // Start the HTTP/WebSocket server
    let listener = match tokio::net::TcpListener::bind(config.server_address()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", config.server_address(), e);
            return;
        }
    };

    info!("🚀 Server running on http://{}", config.server_address());
    info!("📡 WebSocket available at ws://{}/ws", config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", config.server_address());

    if let Err(e) = axum::serve(listener, app_routes).await {
        error!("Server error: {}", e);
    }
}
