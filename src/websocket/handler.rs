use std::sync::Arc;
use axum::{
    extract::{State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, error, debug};
use futures_util::{SinkExt, Stream, StreamExt};
use uuid::Uuid;

use crate::AppState;
use crate::models::{ReceivedMessage, SendMessage};
use crate::websocket::msg_ping_handler::handle_ping_message;
use crate::ws::SessionCoordinator;

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {

    // Generate unique connection ID to identify this client
    let connection_id = Uuid::new_v4().to_string();
    info!("WebSocket connection established with connection_id: {}", connection_id);

    // Split the socket into sender and receiver
    let (mut sender, mut receiver) = socket.split();

    // Everything addressed to this connection goes through its outbound queue
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<SendMessage>();
    let coordinator = app_state.coordinator.clone();
    coordinator.connect(&connection_id, outbound).await;

    // Drain the outbound queue onto the socket
    let send_id = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize message for {}: {}", send_id, e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Process inbound frames one at a time, in arrival order
    let (stop_reader, stop_rx) = oneshot::channel();
    let recv_id = connection_id.clone();
    let recv_coordinator = coordinator.clone();
    let mut recv_task = tokio::spawn(async move {
        read_frames(receiver, stop_rx, &recv_coordinator, &recv_id).await;
    });

    // Wait for either task to finish. The reader is stopped between frames,
    // never aborted, so the event it is on runs to completion.
    tokio::select! {
        _ = (&mut send_task) => {
            let _ = stop_reader.send(());
            let _ = (&mut recv_task).await;
        }
        _ = (&mut recv_task) => send_task.abort(),
    };

    coordinator.disconnect(&connection_id).await;
    info!("WebSocket connection {} terminated", connection_id);
}

/// Feed inbound frames to the coordinator until the peer goes away or `stop` fires.
async fn read_frames<S, E>(
    mut frames: S,
    mut stop: oneshot::Receiver<()>,
    coordinator: &SessionCoordinator,
    connection_id: &str,
) where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = &mut stop => break,
            frame = frames.next() => frame,
        };
        match frame {
            Some(Ok(Message::Text(text))) => {
                handle_text_frame(coordinator, connection_id, &text).await;
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                debug!("WebSocket error on {}: {}", connection_id, e);
                break;
            }
        }
    }
}

/// Parse one text frame and route it to the coordinator. Malformed frames are skipped.
async fn handle_text_frame(coordinator: &SessionCoordinator, connection_id: &str, text: &str) {
    let msg: ReceivedMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            error!("Failed to parse message from {}: {}", connection_id, e);
            return;
        }
    };
    debug!("Received message from {}: {:?}", connection_id, msg);

    match msg {
        ReceivedMessage::Join(join) => {
            coordinator.join(connection_id, &join.document_id, join.hint).await;
        }
        ReceivedMessage::Leave(leave) => {
            coordinator.leave(connection_id, &leave.document_id).await;
        }
        ReceivedMessage::ContentChange(change) => {
            coordinator
                .content_change(connection_id, &change.document_id, change.content, change.operation)
                .await;
        }
        ReceivedMessage::TitleChange(change) => {
            coordinator.title_change(connection_id, &change.document_id, change.title).await;
        }
        ReceivedMessage::CursorUpdate(update) => {
            coordinator.cursor_update(connection_id, &update.document_id, update.cursor).await;
        }
        ReceivedMessage::Typing(typing) => {
            coordinator.typing(connection_id, &typing.document_id, typing.is_typing).await;
        }
        ReceivedMessage::Ping(ping) => {
            handle_ping_message(&ping, coordinator, connection_id).await;
        }
    }
}
