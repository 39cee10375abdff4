use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Identity of a live WebSocket connection
pub type ConnectionId = String;

/// Presence record for one connection inside one document room
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub connection_id: String,
    pub name: String,
    pub color: String,
    /// Last cursor payload, stored verbatim
    #[schema(value_type = Option<Object>)]
    pub cursor: Option<Value>,
    pub joined_at: DateTime<Utc>,
}

/// Optional display details a client sends along with a join
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplayHint {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}
