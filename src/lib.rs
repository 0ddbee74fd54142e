//! chatterd - in-memory real-time chat backend.
//!
//! Rooms, ordered message logs, presence, typing indicators and fan-out to
//! WebSocket connections. All state is process-lifetime, rebuilt from seed
//! data on restart.

pub mod broadcast;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod http;
pub mod network;
pub mod state;

use std::sync::Arc;

use config::Config;
use engine::ChatEngine;
use state::{ConnectionRegistry, IdentityStore, RoomRegistry, User};

/// Build the stores and engine from a configuration, seeding users and the
/// default room.
pub fn build_engine(
    config: &Config,
) -> (
    Arc<ChatEngine>,
    Arc<RoomRegistry>,
    Arc<ConnectionRegistry>,
) {
    let users = Arc::new(IdentityStore::new());
    for seed in &config.seed.users {
        users.insert(User::new(
            seed.id.clone(),
            seed.name.clone(),
            seed.email.clone(),
            seed.avatar.clone(),
        ));
    }

    let rooms = Arc::new(RoomRegistry::new(&config.seed.general_room_name));
    let connections = Arc::new(ConnectionRegistry::new());
    let engine = Arc::new(ChatEngine::new(
        users,
        connections.clone(),
        rooms.clone(),
    ));
    (engine, rooms, connections)
}
