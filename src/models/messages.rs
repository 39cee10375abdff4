use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{ConnectionId, DisplayHint, Participant};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JoinMessage {
    pub document_id: String,
    #[serde(flatten)]
    pub hint: DisplayHint,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LeaveMessage {
    pub document_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ContentChangeMessage {
    pub document_id: String,
    pub content: String,
    /// Informational tag from the editor, never interpreted
    #[serde(default)]
    pub operation: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TitleChangeMessage {
    pub document_id: String,
    pub title: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CursorUpdateMessage {
    pub document_id: String,
    #[serde(default)]
    pub cursor: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TypingMessage {
    pub document_id: String,
    pub is_typing: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PingMessage {}

/// Frames a client sends over the socket
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "join")]
    Join(JoinMessage),
    #[serde(rename = "leave")]
    Leave(LeaveMessage),
    #[serde(rename = "content-change")]
    ContentChange(ContentChangeMessage),
    #[serde(rename = "title-change")]
    TitleChange(TitleChangeMessage),
    #[serde(rename = "cursor-update")]
    CursorUpdate(CursorUpdateMessage),
    #[serde(rename = "typing")]
    Typing(TypingMessage),
    #[serde(rename = "ping")]
    Ping(PingMessage),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub connection_id: ConnectionId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentParticipantsMessage {
    pub document_id: String,
    pub participants: Vec<Participant>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantJoinedMessage {
    pub document_id: String,
    pub participant: Participant,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentUpdatedMessage {
    pub document_id: String,
    pub content: String,
    pub operation: Value,
    pub sender_id: ConnectionId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitleUpdatedMessage {
    pub document_id: String,
    pub title: String,
    pub sender_id: ConnectionId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CursorUpdatedMessage {
    pub document_id: String,
    pub sender_id: ConnectionId,
    pub cursor: Value,
    pub participant: Participant,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypingUpdateMessage {
    pub document_id: String,
    pub sender_id: ConnectionId,
    pub is_typing: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantLeftMessage {
    pub document_id: String,
    pub connection_id: ConnectionId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PongMessage {
    pub date: String,
}

/// Frames the server pushes to a client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "connected")]
    Connected(ConnectedMessage),
    #[serde(rename = "current-participants")]
    CurrentParticipants(CurrentParticipantsMessage),
    #[serde(rename = "participant-joined")]
    ParticipantJoined(ParticipantJoinedMessage),
    #[serde(rename = "content-updated")]
    ContentUpdated(ContentUpdatedMessage),
    #[serde(rename = "title-updated")]
    TitleUpdated(TitleUpdatedMessage),
    #[serde(rename = "cursor-updated")]
    CursorUpdated(CursorUpdatedMessage),
    #[serde(rename = "typing-update")]
    TypingUpdate(TypingUpdateMessage),
    #[serde(rename = "participant-left")]
    ParticipantLeft(ParticipantLeftMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
}
