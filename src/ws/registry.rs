use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::ConnectionId;

/// Tracks every live connection and the documents it has joined, so a
/// disconnect can be torn down without scanning all rooms.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, HashSet<String>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new connection with an empty join set.
    pub async fn register(&self, connection_id: &str) {
        let mut connections = self.connections.write().await;
        connections.entry(connection_id.to_string()).or_default();
        debug!("Registered connection {}", connection_id);
    }

    /// Record that the connection joined a document. Idempotent.
    pub async fn join(&self, connection_id: &str, document_id: &str) {
        let mut connections = self.connections.write().await;
        connections
            .entry(connection_id.to_string())
            .or_default()
            .insert(document_id.to_string());
    }

    /// Drop one document from the connection's join set.
    pub async fn leave(&self, connection_id: &str, document_id: &str) -> bool {
        let mut connections = self.connections.write().await;
        connections
            .get_mut(connection_id)
            .map(|joined| joined.remove(document_id))
            .unwrap_or(false)
    }

    /// Remove the connection and hand back every document it had joined.
    pub async fn forget(&self, connection_id: &str) -> HashSet<String> {
        let mut connections = self.connections.write().await;
        connections.remove(connection_id).unwrap_or_default()
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}
