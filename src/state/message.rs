//! Per-room ordered message logs.
//!
//! Messages are owned by exactly one room's log and never move between
//! rooms. Log order is strictly append order; timestamps are informational
//! and only drive the history windowing in [`MessageStore::list`].

use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::now_millis;
use super::room::RoomRegistry;
use super::user::User;
use crate::error::{ChatError, ChatResult};

/// Default history window size.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    Text,
    Image,
    File,
    Audio,
    Video,
    Location,
    System,
    Typing,
    ReadReceipt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageStatus {
    Sending,
    Sent,
    Delivered,
    Read,
    Failed,
}

/// A (user, kind) reaction token. Uniqueness is per pair: a user may hold
/// several distinct kinds on one message, but never the same kind twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub user_id: String,
    pub kind: String,
}

/// A chat message.
///
/// Sender name/avatar are denormalized at send time so history keeps the
/// identity the sender had when the message was written, even if the
/// profile changes later. The reply snapshot is likewise an immutable copy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_avatar: String,
    pub room_id: String,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub is_edited: bool,
    pub edited_at: Option<i64>,
    pub reactions: Vec<Reaction>,
    pub status: MessageStatus,
    pub reply_to_message_id: Option<String>,
    pub reply_to_message: Option<Box<ChatMessage>>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ChatMessage {
    /// Build a user message with the sender snapshot taken now.
    pub fn from_sender(room_id: &str, sender: &User, content: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.to_string(),
            sender_id: sender.id.clone(),
            sender_name: sender.name.clone(),
            sender_avatar: sender.avatar.clone(),
            room_id: room_id.to_string(),
            timestamp: now_millis(),
            message_type: MessageType::Text,
            is_edited: false,
            edited_at: None,
            reactions: Vec::new(),
            status: MessageStatus::Sent,
            reply_to_message_id: None,
            reply_to_message: None,
            metadata: HashMap::new(),
        }
    }

    /// Build a system message (joins, leaves).
    pub fn system(room_id: &str, content: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.to_string(),
            sender_id: "system".to_string(),
            sender_name: "System".to_string(),
            sender_avatar: String::new(),
            room_id: room_id.to_string(),
            timestamp: now_millis(),
            message_type: MessageType::System,
            is_edited: false,
            edited_at: None,
            reactions: Vec::new(),
            status: MessageStatus::Sent,
            reply_to_message_id: None,
            reply_to_message: None,
            metadata: HashMap::new(),
        }
    }
}

/// Owns the ordered, mutable message log of every room.
pub struct MessageStore {
    logs: DashMap<String, Arc<RwLock<Vec<ChatMessage>>>>,
    rooms: Arc<RoomRegistry>,
}

impl MessageStore {
    pub fn new(rooms: Arc<RoomRegistry>) -> Self {
        Self {
            logs: DashMap::new(),
            rooms,
        }
    }

    fn log_of(&self, room_id: &str) -> Arc<RwLock<Vec<ChatMessage>>> {
        self.logs
            .entry(room_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Append a message to its room's log.
    ///
    /// The room must already exist; logs are never silently created for
    /// unknown rooms. If the message carries a reply-to id, the referenced
    /// message is resolved within the same room and embedded as an
    /// immutable snapshot. Room stats are touched after the append.
    pub async fn append(&self, mut message: ChatMessage) -> ChatResult<ChatMessage> {
        if !self.rooms.contains(&message.room_id) {
            return Err(ChatError::RoomNotFound(message.room_id));
        }

        let log = self.log_of(&message.room_id);
        {
            let mut log = log.write().await;
            if let Some(reply_id) = &message.reply_to_message_id {
                message.reply_to_message = log
                    .iter()
                    .find(|m| &m.id == reply_id)
                    .cloned()
                    .map(Box::new);
            }
            log.push(message.clone());
        }

        self.rooms.touch_activity(&message.room_id, &message).await;
        Ok(message)
    }

    /// History window: skip `offset` messages from the newest end, return up
    /// to `limit` of what precedes, in chronological (oldest-first) order.
    /// An unknown room yields an empty list, not an error.
    pub async fn list(&self, room_id: &str, limit: usize, offset: usize) -> Vec<ChatMessage> {
        let Some(log) = self.logs.get(room_id).map(|e| e.value().clone()) else {
            return Vec::new();
        };
        let log = log.read().await;
        let end = log.len().saturating_sub(offset);
        let start = end.saturating_sub(limit);
        log[start..end].to_vec()
    }

    /// Snapshot of a message by id, searched across all rooms.
    pub async fn find(&self, message_id: &str) -> Option<ChatMessage> {
        let handles: Vec<_> = self.logs.iter().map(|e| e.value().clone()).collect();
        for log in handles {
            let log = log.read().await;
            if let Some(message) = log.iter().find(|m| m.id == message_id) {
                return Some(message.clone());
            }
        }
        None
    }

    /// Replace a message's content if `user_id` is its original sender,
    /// returning the updated snapshot taken under the same write lock.
    ///
    /// Not-found and wrong-owner are indistinguishable to the caller.
    pub async fn edit(
        &self,
        message_id: &str,
        new_content: &str,
        user_id: &str,
    ) -> Option<ChatMessage> {
        let handles: Vec<_> = self.logs.iter().map(|e| e.value().clone()).collect();
        for log in handles {
            let mut log = log.write().await;
            if let Some(message) = log
                .iter_mut()
                .find(|m| m.id == message_id && m.sender_id == user_id)
            {
                message.content = new_content.to_string();
                message.is_edited = true;
                message.edited_at = Some(now_millis());
                return Some(message.clone());
            }
        }
        None
    }

    /// Remove a message if `user_id` is its original sender. Same uniform
    /// failure as `edit`.
    pub async fn delete(&self, message_id: &str, user_id: &str) -> bool {
        let handles: Vec<_> = self.logs.iter().map(|e| e.value().clone()).collect();
        for log in handles {
            let mut log = log.write().await;
            let before = log.len();
            log.retain(|m| !(m.id == message_id && m.sender_id == user_id));
            if log.len() != before {
                return true;
            }
        }
        false
    }

    /// Insert a (user, kind) reaction token if not already present.
    /// Returns false when no message with this id exists.
    pub async fn add_reaction(&self, message_id: &str, user_id: &str, kind: &str) -> bool {
        let handles: Vec<_> = self.logs.iter().map(|e| e.value().clone()).collect();
        for log in handles {
            let mut log = log.write().await;
            if let Some(message) = log.iter_mut().find(|m| m.id == message_id) {
                let token = Reaction {
                    user_id: user_id.to_string(),
                    kind: kind.to_string(),
                };
                if !message.reactions.contains(&token) {
                    message.reactions.push(token);
                }
                return true;
            }
        }
        false
    }

    /// Remove a (user, kind) reaction token. Removing an absent token is a
    /// no-op; returns false only when no message with this id exists.
    pub async fn remove_reaction(&self, message_id: &str, user_id: &str, kind: &str) -> bool {
        let handles: Vec<_> = self.logs.iter().map(|e| e.value().clone()).collect();
        for log in handles {
            let mut log = log.write().await;
            if let Some(message) = log.iter_mut().find(|m| m.id == message_id) {
                message
                    .reactions
                    .retain(|r| !(r.user_id == user_id && r.kind == kind));
                return true;
            }
        }
        false
    }
}
