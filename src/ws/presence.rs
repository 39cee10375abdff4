//! Per-document presence bookkeeping.
//!
//! Each document room sits behind its own mutex. The session coordinator holds
//! that mutex for the whole of an event (mutation plus fan-out), which is what
//! gives every room a single serialized event stream.

use chrono::Utc;
use rand::Rng;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::models::{ConnectionId, DisplayHint, Participant};

/// Colors handed out to participants that did not pick one. Collisions are allowed.
pub const COLOR_PALETTE: [&str; 8] = [
    "#ef4444", "#f97316", "#eab308", "#22c55e",
    "#06b6d4", "#3b82f6", "#8b5cf6", "#ec4899",
];

fn fallback_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("User {}", &id[..4])
}

fn random_color() -> String {
    let idx = rand::rng().random_range(0..COLOR_PALETTE.len());
    COLOR_PALETTE[idx].to_string()
}

/// The participants of one document session
#[derive(Debug)]
pub struct Room {
    document_id: String,
    participants: HashMap<ConnectionId, Participant>,
}

impl Room {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            participants: HashMap::new(),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Insert or overwrite the participant for `connection_id`.
    ///
    /// Returns the full participant list (for the joiner) and the new
    /// participant (for everybody else).
    pub fn join(&mut self, connection_id: &str, hint: &DisplayHint) -> (Vec<Participant>, Participant) {
        let participant = Participant {
            connection_id: connection_id.to_string(),
            name: hint.name.clone().unwrap_or_else(fallback_name),
            color: hint.color.clone().unwrap_or_else(random_color),
            cursor: None,
            joined_at: Utc::now(),
        };
        self.participants.insert(connection_id.to_string(), participant.clone());
        (self.snapshot(), participant)
    }

    /// Overwrite the stored cursor. `None` when the connection is not in this room.
    pub fn update_cursor(&mut self, connection_id: &str, cursor: Value) -> Option<Participant> {
        let participant = self.participants.get_mut(connection_id)?;
        participant.cursor = Some(cursor);
        Some(participant.clone())
    }

    /// Remove the participant if present. The flag tells whether anything was removed.
    pub fn leave(&mut self, connection_id: &str) -> (bool, Vec<Participant>) {
        let removed = self.participants.remove(connection_id).is_some();
        (removed, self.snapshot())
    }

    /// Current participants, ordered by join time.
    pub fn snapshot(&self) -> Vec<Participant> {
        let mut participants: Vec<Participant> = self.participants.values().cloned().collect();
        participants.sort_by(|a, b| {
            a.joined_at
                .cmp(&b.joined_at)
                .then_with(|| a.connection_id.cmp(&b.connection_id))
        });
        participants
    }

    /// Connections subscribed to this room's broadcasts
    pub fn members(&self) -> impl Iterator<Item = &ConnectionId> {
        self.participants.keys()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

/// Maps document ids to their rooms. Rooms are created lazily on first join
/// and kept once empty.
#[derive(Debug, Default)]
pub struct PresenceStore {
    rooms: RwLock<HashMap<String, Arc<Mutex<Room>>>>,
}

impl PresenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an existing room without creating one.
    pub async fn room(&self, document_id: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.read().await.get(document_id).cloned()
    }

    /// Get or create the room for a document.
    pub async fn room_or_create(&self, document_id: &str) -> Arc<Mutex<Room>> {
        // Fast path: read lock
        if let Some(room) = self.room(document_id).await {
            return room;
        }

        let mut rooms = self.rooms.write().await;
        rooms
            .entry(document_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Room::new(document_id))))
            .clone()
    }

    pub async fn snapshot(&self, document_id: &str) -> Vec<Participant> {
        match self.room(document_id).await {
            Some(room) => room.lock().await.snapshot(),
            None => Vec::new(),
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn participant_count(&self) -> usize {
        let rooms: Vec<Arc<Mutex<Room>>> = self.rooms.read().await.values().cloned().collect();
        let mut total = 0;
        for room in rooms {
            total += room.lock().await.len();
        }
        total
    }
}
