//! Fan-out delivery.
//!
//! The `FanoutRouter` owns one mpsc sender per live connection and resolves
//! an effect's [`Scope`] to the concrete connection set: a room scope fans
//! out to every connection of every member, a user scope to all of that
//! user's connections, broadcast to everyone. Delivery happens strictly
//! after the engine has committed, so a slow consumer never stalls state
//! mutations — only its own queue.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

use crate::events::{Effect, Scope, ServerEvent};
use crate::state::{ConnectionRegistry, RoomRegistry};

/// Per-connection outbound queue depth.
const OUTBOUND_QUEUE: usize = 64;

pub struct FanoutRouter {
    senders: DashMap<String, mpsc::Sender<Arc<ServerEvent>>>,
    rooms: Arc<RoomRegistry>,
    connections: Arc<ConnectionRegistry>,
}

impl FanoutRouter {
    pub fn new(rooms: Arc<RoomRegistry>, connections: Arc<ConnectionRegistry>) -> Self {
        Self {
            senders: DashMap::new(),
            rooms,
            connections,
        }
    }

    /// Register a connection's outbound queue. Returns the receiving end
    /// the transport drains into the socket.
    pub fn register(&self, connection_id: &str) -> mpsc::Receiver<Arc<ServerEvent>> {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
        self.senders.insert(connection_id.to_string(), tx);
        rx
    }

    /// Drop a connection's queue. Idempotent.
    pub fn unregister(&self, connection_id: &str) {
        self.senders.remove(connection_id);
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    fn send_to(&self, connection_id: &str, event: &Arc<ServerEvent>) {
        if let Some(sender) = self.senders.get(connection_id).map(|e| e.value().clone()) {
            // A full or closed queue drops the event; delivery is best effort
            // and must never wait on a slow consumer.
            if let Err(e) = sender.try_send(event.clone()) {
                trace!(connection = %connection_id, error = %e, "event dropped");
            }
        }
    }

    /// Deliver one effect. `caller` is the connection that issued the
    /// operation, used for caller-scoped effects.
    pub async fn deliver(&self, caller: &str, effect: Effect) {
        let event = Arc::new(effect.event);
        match effect.scope {
            Scope::Caller => self.send_to(caller, &event),
            Scope::User(user_id) => {
                for connection_id in self.connections.connections_of(&user_id) {
                    self.send_to(&connection_id, &event);
                }
            }
            Scope::Room(room_id) => {
                let Some(room) = self.rooms.get(&room_id).await else {
                    return;
                };
                for member in &room.members {
                    for connection_id in self.connections.connections_of(member) {
                        self.send_to(&connection_id, &event);
                    }
                }
            }
            Scope::Broadcast => {
                for entry in self.senders.iter() {
                    if let Err(e) = entry.value().try_send(event.clone()) {
                        trace!(connection = %entry.key(), error = %e, "event dropped");
                    }
                }
            }
        }
        trace!("effect delivered");
    }

    /// Deliver a batch of effects in order.
    pub async fn deliver_all(&self, caller: &str, effects: Vec<Effect>) {
        for effect in effects {
            self.deliver(caller, effect).await;
        }
    }
}
