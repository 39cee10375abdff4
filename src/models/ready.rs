use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Readiness probe payload
#[derive(Serialize, Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub status: String,
    pub message: String,
    pub documents_loaded: u32,
}
