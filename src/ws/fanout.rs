//! Delivery of server events to connections.
//!
//! Every connection owns an unbounded outbound queue drained by its socket
//! writer task. Room broadcasts are pushed into those queues while the caller
//! holds the room lock, so all members see a room's events in the same order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, RwLock};
use tracing::warn;

use crate::models::{ConnectionId, SendMessage};
use crate::ws::presence::Room;

pub type Outbound = mpsc::UnboundedSender<SendMessage>;

/// Counters for the diagnostics endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutStats {
    pub messages_sent: u64,
    pub messages_dropped: u64,
    pub attached: usize,
}

#[derive(Debug, Default)]
pub struct BroadcastFanout {
    outbound: RwLock<HashMap<ConnectionId, Outbound>>,
    messages_sent: AtomicU64,
    messages_dropped: AtomicU64,
}

impl BroadcastFanout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a connection reachable.
    pub async fn attach(&self, connection_id: &str, outbound: Outbound) {
        self.outbound.write().await.insert(connection_id.to_string(), outbound);
    }

    pub async fn detach(&self, connection_id: &str) -> bool {
        self.outbound.write().await.remove(connection_id).is_some()
    }

    /// Deliver to a single connection.
    pub async fn send_to(&self, connection_id: &str, msg: SendMessage) -> bool {
        let outbound = self.outbound.read().await;
        self.deliver(outbound.get(connection_id), connection_id, msg)
    }

    /// Deliver to every member of `room` except `exclude`.
    ///
    /// Returns the number of connections the event was queued for.
    pub async fn publish(&self, room: &Room, msg: SendMessage, exclude: Option<&str>) -> usize {
        let outbound = self.outbound.read().await;
        let mut delivered = 0;
        for member in room.members() {
            if Some(member.as_str()) == exclude {
                continue;
            }
            if self.deliver(outbound.get(member), member, msg.clone()) {
                delivered += 1;
            }
        }
        delivered
    }

    fn deliver(&self, outbound: Option<&Outbound>, connection_id: &str, msg: SendMessage) -> bool {
        match outbound.map(|tx| tx.send(msg)) {
            Some(Ok(())) => {
                self.messages_sent.fetch_add(1, Ordering::Relaxed);
                true
            }
            Some(Err(_)) => {
                warn!("Outbound queue closed for connection {}", connection_id);
                self.messages_dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            None => {
                warn!("No outbound queue for connection {}", connection_id);
                self.messages_dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub async fn stats(&self) -> FanoutStats {
        FanoutStats {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            attached: self.outbound.read().await.len(),
        }
    }
}
