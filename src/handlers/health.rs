use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::debug;

use crate::config;
use crate::models::{HealthResponse, ReadyResponse};
use crate::AppState;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        service: config::get_config().service_name.clone(),
        message: "Server is running".to_string(),
    })
}

/// Readiness check endpoint
pub async fn ready_check(State(app_state): State<Arc<AppState>>) -> Json<ReadyResponse> {
    debug!("Readiness check requested");
    // Everything is in memory, so being able to answer means being ready
    Json(ReadyResponse {
        status: "ok".to_string(),
        message: "Service is ready".to_string(),
        documents_loaded: app_state.documents.len() as u32,
    })
}
