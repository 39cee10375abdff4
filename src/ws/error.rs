use crate::models::ConnectionId;

/// Reasons an inbound event is dropped. Never surfaced to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The document id is unknown to the document cache
    DocumentNotFound(String),
    /// The connection holds no presence in the document's room
    NotAParticipant {
        connection_id: ConnectionId,
        document_id: String,
    },
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::DocumentNotFound(id) => write!(f, "Document '{}' not found", id),
            SessionError::NotAParticipant { connection_id, document_id } => write!(
                f,
                "Connection '{}' is not a participant of document '{}'",
                connection_id, document_id
            ),
        }
    }
}

impl std::error::Error for SessionError {}
