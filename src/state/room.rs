//! Room metadata, membership and admin lists.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::message::ChatMessage;
use super::now_millis;

/// Well-known id of the default public room, seeded at startup and never
/// removable.
pub const GENERAL_ROOM_ID: &str = "general";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoomType {
    Public,
    Private,
    Direct,
}

/// A chat room.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    /// Member user ids, in join order.
    pub members: Vec<String>,
    pub admins: Vec<String>,
    pub created_at: i64,
    pub last_activity: i64,
    pub message_count: u64,
    pub last_message_id: Option<String>,
    /// Cached copy of the most recent message, refreshed on every append.
    pub last_message: Option<Box<ChatMessage>>,
}

impl Room {
    pub fn new(id: String, name: String, description: String, room_type: RoomType) -> Self {
        let now = now_millis();
        Self {
            id,
            name,
            description,
            room_type,
            members: Vec::new(),
            admins: Vec::new(),
            created_at: now,
            last_activity: now,
            message_count: 0,
            last_message_id: None,
            last_message: None,
        }
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }
}

/// Owns all rooms, indexed by room id.
pub struct RoomRegistry {
    rooms: DashMap<String, Arc<RwLock<Room>>>,
}

impl RoomRegistry {
    /// Create the registry with the default public room already present.
    pub fn new(general_room_name: &str) -> Self {
        let registry = Self {
            rooms: DashMap::new(),
        };
        registry.insert(Room::new(
            GENERAL_ROOM_ID.to_string(),
            general_room_name.to_string(),
            "Main room for general conversation".to_string(),
            RoomType::Public,
        ));
        registry
    }

    fn insert(&self, room: Room) {
        self.rooms.insert(room.id.clone(), Arc::new(RwLock::new(room)));
    }

    /// Whether a room with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.rooms.contains_key(id)
    }

    /// Snapshot of a room, or None if unknown.
    pub async fn get(&self, id: &str) -> Option<Room> {
        let room = self.rooms.get(id)?.clone();
        let room = room.read().await;
        Some(room.clone())
    }

    /// Snapshots of all rooms. Order is not significant.
    pub async fn list(&self) -> Vec<Room> {
        let handles: Vec<_> = self.rooms.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::with_capacity(handles.len());
        for room in handles {
            out.push(room.read().await.clone());
        }
        out
    }

    /// Create a room with a fresh id. The creator becomes the sole member
    /// and sole admin.
    pub async fn create(
        &self,
        name: &str,
        description: &str,
        room_type: RoomType,
        creator_id: &str,
    ) -> Room {
        let mut room = Room::new(
            uuid::Uuid::new_v4().to_string(),
            name.to_string(),
            description.to_string(),
            room_type,
        );
        room.members.push(creator_id.to_string());
        room.admins.push(creator_id.to_string());
        self.insert(room.clone());
        room
    }

    /// Add a user to a room. Returns true only if the user was newly added;
    /// an existing member or an unknown room is a no-op, not an error.
    pub async fn join(&self, room_id: &str, user_id: &str) -> bool {
        let Some(room) = self.rooms.get(room_id).map(|e| e.value().clone()) else {
            return false;
        };
        let mut room = room.write().await;
        if room.is_member(user_id) {
            return false;
        }
        room.members.push(user_id.to_string());
        true
    }

    /// Remove a user from a room. Symmetric to `join`.
    pub async fn leave(&self, room_id: &str, user_id: &str) -> bool {
        let Some(room) = self.rooms.get(room_id).map(|e| e.value().clone()) else {
            return false;
        };
        let mut room = room.write().await;
        let before = room.members.len();
        room.members.retain(|m| m != user_id);
        room.members.len() != before
    }

    /// Update room stats after a message append: last-activity, message
    /// count, last-message snapshot. Only the message append path calls
    /// this, keeping room stats consistent with the log.
    pub async fn touch_activity(&self, room_id: &str, message: &ChatMessage) {
        let Some(room) = self.rooms.get(room_id).map(|e| e.value().clone()) else {
            return;
        };
        let mut room = room.write().await;
        room.last_activity = now_millis();
        room.message_count += 1;
        room.last_message_id = Some(message.id.clone());
        room.last_message = Some(Box::new(message.clone()));
    }
}
