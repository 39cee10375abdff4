use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Liveness probe payload
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub message: String,
}
