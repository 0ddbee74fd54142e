//! Shared setup for engine integration tests.

use std::sync::Arc;

use chatterd::engine::ChatEngine;
use chatterd::state::{ConnectionRegistry, IdentityStore, RoomRegistry, User};

// Not every test file touches every store handle.
#[allow(dead_code)]
pub struct TestHarness {
    pub users: Arc<IdentityStore>,
    pub connections: Arc<ConnectionRegistry>,
    pub rooms: Arc<RoomRegistry>,
    pub engine: ChatEngine,
}

/// Engine over fresh stores, seeded with users "1" (Alice) and "2" (Bob)
/// and the default "general" room.
pub fn harness() -> TestHarness {
    let users = Arc::new(IdentityStore::new());
    users.insert(User::new(
        "1".to_string(),
        "Alice".to_string(),
        "alice@example.com".to_string(),
        String::new(),
    ));
    users.insert(User::new(
        "2".to_string(),
        "Bob".to_string(),
        "bob@example.com".to_string(),
        String::new(),
    ));

    let connections = Arc::new(ConnectionRegistry::new());
    let rooms = Arc::new(RoomRegistry::new("General"));
    let engine = ChatEngine::new(users.clone(), connections.clone(), rooms.clone());

    TestHarness {
        users,
        connections,
        rooms,
        engine,
    }
}
