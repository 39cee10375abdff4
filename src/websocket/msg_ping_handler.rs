use tracing::debug;
use chrono::Utc;

use crate::models::{PingMessage, PongMessage, SendMessage};
use crate::ws::SessionCoordinator;

/// Handle PingMessage
pub async fn handle_ping_message(_ping_msg: &PingMessage, coordinator: &SessionCoordinator, connection_id: &str) {
    // Reply with pong, to the sender only
    debug!("Ping message received from {}", connection_id);
    let pong = SendMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() });
    coordinator.reply(connection_id, pong).await;
}
