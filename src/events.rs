//! Wire protocol and fan-out effects.
//!
//! Inbound frames decode to [`ClientCommand`]; the engine answers every
//! operation with a list of [`Effect`]s, each pairing a delivery [`Scope`]
//! with a serializable [`ServerEvent`]. The transport resolves scopes to
//! concrete connections after the state mutation has committed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::state::{now_millis, ChatMessage, Room, RoomType, User, UserStatus};

/// Where an event is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Only the connection that issued the operation.
    Caller,
    /// Every connection of one user.
    User(String),
    /// Every connection of every member of a room.
    Room(String),
    /// Every connection.
    Broadcast,
}

/// One fan-out effect produced by an engine operation.
#[derive(Debug, Clone)]
pub struct Effect {
    pub scope: Scope,
    pub event: ServerEvent,
}

impl Effect {
    pub fn caller(event: ServerEvent) -> Self {
        Self { scope: Scope::Caller, event }
    }

    pub fn user(user_id: impl Into<String>, event: ServerEvent) -> Self {
        Self { scope: Scope::User(user_id.into()), event }
    }

    pub fn room(room_id: impl Into<String>, event: ServerEvent) -> Self {
        Self { scope: Scope::Room(room_id.into()), event }
    }

    pub fn broadcast(event: ServerEvent) -> Self {
        Self { scope: Scope::Broadcast, event }
    }
}

/// A user- or broadcast-targeted notification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub timestamp: i64,
    pub read: bool,
}

impl Notification {
    pub fn new(title: &str, message: &str, kind: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            message: message.to_string(),
            kind: kind.to_string(),
            timestamp: now_millis(),
            read: false,
        }
    }
}

/// Events pushed to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    MessageReceived { message: ChatMessage },
    MessageHistory { room_id: String, messages: Vec<ChatMessage> },
    MessageEdited { message: ChatMessage },
    MessageDeleted { message_id: String },
    MessageRead { message_id: String, user_id: String },
    ReactionAdded { message_id: String, user_id: String, kind: String },
    ReactionRemoved { message_id: String, user_id: String, kind: String },
    UserTyping { room_id: String, user_id: String, user_name: String },
    UserStoppedTyping { room_id: String, user_id: String, user_name: String },
    UserStatusChanged { user_id: String, status: UserStatus, user_name: String },
    UserProfileUpdated { user: User },
    UserCreated { user: User },
    PreferencesUpdated { user_id: String },
    RoomCreated { room: Room },
    RoomsList { rooms: Vec<Room> },
    OnlineUsers { users: Vec<User> },
    TypingUsers { room_id: String, user_ids: Vec<String> },
    NotificationReceived { notification: Notification },
    GlobalNotification { notification: Notification },
    Error { code: String, message: String },
}

fn default_limit() -> usize {
    crate::state::message::DEFAULT_HISTORY_LIMIT
}

fn default_room_type() -> RoomType {
    RoomType::Public
}

fn default_notification_kind() -> String {
    "info".to_string()
}

/// Operations a client can invoke.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    JoinRoom {
        room_id: String,
        user_id: String,
    },
    LeaveRoom {
        room_id: String,
        user_id: String,
    },
    SendMessage {
        room_id: String,
        user_id: String,
        content: String,
        #[serde(default)]
        reply_to_message_id: Option<String>,
    },
    EditMessage {
        message_id: String,
        content: String,
        user_id: String,
    },
    DeleteMessage {
        message_id: String,
        user_id: String,
    },
    AddReaction {
        message_id: String,
        user_id: String,
        kind: String,
    },
    RemoveReaction {
        message_id: String,
        user_id: String,
        kind: String,
    },
    StartTyping {
        room_id: String,
        user_id: String,
    },
    StopTyping {
        room_id: String,
        user_id: String,
    },
    UpdateStatus {
        user_id: String,
        status: UserStatus,
    },
    UpdateProfile {
        user_id: String,
        name: String,
        #[serde(default)]
        avatar: String,
    },
    UpdatePreferences {
        user_id: String,
        preferences: HashMap<String, serde_json::Value>,
    },
    CreateUser {
        name: String,
        #[serde(default)]
        email: String,
        #[serde(default)]
        avatar: String,
    },
    CreateRoom {
        name: String,
        #[serde(default)]
        description: String,
        #[serde(default = "default_room_type")]
        room_type: RoomType,
        creator_id: String,
    },
    GetRooms,
    GetOnlineUsers,
    GetMessageHistory {
        room_id: String,
        #[serde(default = "default_limit")]
        limit: usize,
        #[serde(default)]
        offset: usize,
    },
    GetTypingUsers {
        room_id: String,
    },
    MarkRead {
        message_id: String,
        user_id: String,
    },
    SendNotification {
        user_id: String,
        title: String,
        message: String,
        #[serde(default = "default_notification_kind")]
        kind: String,
    },
    SendGlobalNotification {
        title: String,
        message: String,
        #[serde(default = "default_notification_kind")]
        kind: String,
    },
}
