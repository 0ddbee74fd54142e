//! State management module.
//!
//! Each store owns one domain of mutable shared state and is its own
//! synchronization scope: keyed collections are `DashMap`s and mutable
//! entities live behind `Arc<RwLock<_>>`, so operations on unrelated
//! users/rooms/messages never contend. No store holds a lock across
//! external I/O; fan-out happens after the mutation commits.

pub mod connection;
pub mod message;
pub mod room;
pub mod typing;
pub mod user;

pub use connection::ConnectionRegistry;
pub use message::{ChatMessage, MessageStatus, MessageStore, MessageType, Reaction};
pub use room::{Room, RoomRegistry, RoomType, GENERAL_ROOM_ID};
pub use typing::TypingTracker;
pub use user::{IdentityStore, User, UserStatus};

/// Current UTC time in milliseconds. All store timestamps use this scale.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
