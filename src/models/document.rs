use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Participant;

/// A collaboratively edited document as held by the document cache
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    pub last_edited: DateTime<Utc>,
    /// Denormalized copy of the room's presence, refreshed on every join and leave
    pub participants: Vec<Participant>,
}

impl Document {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            last_edited: Utc::now(),
            participants: Vec::new(),
        }
    }
}

/// Document listing entry, without the content body
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub last_edited: DateTime<Utc>,
    pub participants: Vec<Participant>,
}

impl From<Document> for DocumentSummary {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            title: doc.title,
            last_edited: doc.last_edited,
            participants: doc.participants,
        }
    }
}
