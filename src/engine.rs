//! The chat engine.
//!
//! Every public operation is a transaction over the stores: it validates
//! preconditions, mutates one or more stores, and returns the fan-out
//! effects the transport should deliver. A failed operation returns an
//! error and produces no effects, so invalid input from one caller never
//! leaks partial state to others. The engine itself never performs I/O.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{ChatError, ChatResult};
use crate::events::{ClientCommand, Effect, Notification, ServerEvent};
use crate::state::{
    ChatMessage, ConnectionRegistry, IdentityStore, MessageStore, RoomRegistry, RoomType,
    TypingTracker, User, UserStatus,
};

pub struct ChatEngine {
    users: Arc<IdentityStore>,
    connections: Arc<ConnectionRegistry>,
    rooms: Arc<RoomRegistry>,
    messages: MessageStore,
    typing: TypingTracker,
}

impl ChatEngine {
    pub fn new(
        users: Arc<IdentityStore>,
        connections: Arc<ConnectionRegistry>,
        rooms: Arc<RoomRegistry>,
    ) -> Self {
        Self {
            users,
            connections,
            messages: MessageStore::new(rooms.clone()),
            rooms,
            typing: TypingTracker::new(),
        }
    }

    async fn require_user(&self, user_id: &str) -> ChatResult<User> {
        self.users
            .get(user_id)
            .await
            .ok_or_else(|| ChatError::UserNotFound(user_id.to_string()))
    }

    /// Route a decoded client command to the matching operation.
    pub async fn dispatch(
        &self,
        connection_id: &str,
        command: ClientCommand,
    ) -> ChatResult<Vec<Effect>> {
        match command {
            ClientCommand::JoinRoom { room_id, user_id } => {
                self.join(&room_id, &user_id, connection_id).await
            }
            ClientCommand::LeaveRoom { room_id, user_id } => self.leave(&room_id, &user_id).await,
            ClientCommand::SendMessage {
                room_id,
                user_id,
                content,
                reply_to_message_id,
            } => {
                self.send(&room_id, &user_id, &content, reply_to_message_id)
                    .await
            }
            ClientCommand::EditMessage {
                message_id,
                content,
                user_id,
            } => self.edit(&message_id, &content, &user_id).await,
            ClientCommand::DeleteMessage {
                message_id,
                user_id,
            } => self.delete(&message_id, &user_id).await,
            ClientCommand::AddReaction {
                message_id,
                user_id,
                kind,
            } => self.add_reaction(&message_id, &user_id, &kind).await,
            ClientCommand::RemoveReaction {
                message_id,
                user_id,
                kind,
            } => self.remove_reaction(&message_id, &user_id, &kind).await,
            ClientCommand::StartTyping { room_id, user_id } => {
                self.set_typing(&room_id, &user_id, true).await
            }
            ClientCommand::StopTyping { room_id, user_id } => {
                self.set_typing(&room_id, &user_id, false).await
            }
            ClientCommand::UpdateStatus { user_id, status } => {
                self.update_status(&user_id, status).await
            }
            ClientCommand::UpdateProfile {
                user_id,
                name,
                avatar,
            } => self.update_profile(&user_id, &name, &avatar).await,
            ClientCommand::UpdatePreferences {
                user_id,
                preferences,
            } => self.update_preferences(&user_id, preferences).await,
            ClientCommand::CreateUser {
                name,
                email,
                avatar,
            } => self.create_user(&name, &email, &avatar).await,
            ClientCommand::CreateRoom {
                name,
                description,
                room_type,
                creator_id,
            } => {
                self.create_room(&name, &description, room_type, &creator_id)
                    .await
            }
            ClientCommand::GetRooms => self.get_rooms().await,
            ClientCommand::GetOnlineUsers => self.get_online_users().await,
            ClientCommand::GetMessageHistory {
                room_id,
                limit,
                offset,
            } => self.get_message_history(&room_id, limit, offset).await,
            ClientCommand::GetTypingUsers { room_id } => self.get_typing_users(&room_id).await,
            ClientCommand::MarkRead {
                message_id,
                user_id,
            } => self.mark_read(&message_id, &user_id).await,
            ClientCommand::SendNotification {
                user_id,
                title,
                message,
                kind,
            } => self.send_notification(&user_id, &title, &message, &kind).await,
            ClientCommand::SendGlobalNotification {
                title,
                message,
                kind,
            } => self.send_global_notification(&title, &message, &kind).await,
        }
    }

    /// Join a room: binds the connection to the user, adds membership on
    /// both sides, announces with a System message, replays history to the
    /// caller and broadcasts the Online presence.
    pub async fn join(
        &self,
        room_id: &str,
        user_id: &str,
        connection_id: &str,
    ) -> ChatResult<Vec<Effect>> {
        let user = self.require_user(user_id).await?;
        if !self.rooms.contains(room_id) {
            return Err(ChatError::RoomNotFound(room_id.to_string()));
        }

        self.connections.bind(connection_id, user_id);
        self.users.set_status(user_id, UserStatus::Online).await;
        self.users.add_room(user_id, room_id).await;
        self.rooms.join(room_id, user_id).await;

        let announcement = self
            .messages
            .append(ChatMessage::system(
                room_id,
                &format!("{} joined the room", user.name),
            ))
            .await?;

        // History is replayed after the announcement so the caller sees it too.
        let history = self
            .messages
            .list(room_id, crate::state::message::DEFAULT_HISTORY_LIMIT, 0)
            .await;

        info!(user = %user.name, room = %room_id, connection = %connection_id, "user joined room");

        Ok(vec![
            Effect::room(room_id, ServerEvent::MessageReceived { message: announcement }),
            Effect::caller(ServerEvent::MessageHistory {
                room_id: room_id.to_string(),
                messages: history,
            }),
            Effect::broadcast(ServerEvent::UserStatusChanged {
                user_id: user_id.to_string(),
                status: UserStatus::Online,
                user_name: user.name,
            }),
        ])
    }

    /// Leave a room and announce it with a System message.
    pub async fn leave(&self, room_id: &str, user_id: &str) -> ChatResult<Vec<Effect>> {
        let user = self.require_user(user_id).await?;
        if !self.rooms.contains(room_id) {
            return Err(ChatError::RoomNotFound(room_id.to_string()));
        }

        self.users.remove_room(user_id, room_id).await;
        self.rooms.leave(room_id, user_id).await;

        let announcement = self
            .messages
            .append(ChatMessage::system(
                room_id,
                &format!("{} left the room", user.name),
            ))
            .await?;

        info!(user = %user.name, room = %room_id, "user left room");

        Ok(vec![Effect::room(
            room_id,
            ServerEvent::MessageReceived { message: announcement },
        )])
    }

    /// Send a message, resolving the reply snapshot at send time.
    pub async fn send(
        &self,
        room_id: &str,
        user_id: &str,
        content: &str,
        reply_to_message_id: Option<String>,
    ) -> ChatResult<Vec<Effect>> {
        let user = self.require_user(user_id).await?;

        let mut message = ChatMessage::from_sender(room_id, &user, content);
        message.reply_to_message_id = reply_to_message_id;
        let message = self.messages.append(message).await?;

        debug!(user = %user.name, room = %room_id, message = %message.id, "message sent");

        Ok(vec![Effect::room(
            room_id,
            ServerEvent::MessageReceived { message },
        )])
    }

    /// Edit a message. Only the original sender may edit; a wrong owner and
    /// a missing message fail identically.
    pub async fn edit(
        &self,
        message_id: &str,
        new_content: &str,
        user_id: &str,
    ) -> ChatResult<Vec<Effect>> {
        let message = self
            .messages
            .edit(message_id, new_content, user_id)
            .await
            .ok_or_else(|| ChatError::MessageNotFound(message_id.to_string()))?;

        Ok(vec![Effect::room(
            message.room_id.clone(),
            ServerEvent::MessageEdited { message },
        )])
    }

    /// Delete a message. Same ownership rule as `edit`; the deletion notice
    /// carries only the id.
    pub async fn delete(&self, message_id: &str, user_id: &str) -> ChatResult<Vec<Effect>> {
        if !self.messages.delete(message_id, user_id).await {
            return Err(ChatError::MessageNotFound(message_id.to_string()));
        }
        Ok(vec![Effect::broadcast(ServerEvent::MessageDeleted {
            message_id: message_id.to_string(),
        })])
    }

    pub async fn add_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        kind: &str,
    ) -> ChatResult<Vec<Effect>> {
        if !self.messages.add_reaction(message_id, user_id, kind).await {
            return Err(ChatError::MessageNotFound(message_id.to_string()));
        }
        Ok(vec![Effect::broadcast(ServerEvent::ReactionAdded {
            message_id: message_id.to_string(),
            user_id: user_id.to_string(),
            kind: kind.to_string(),
        })])
    }

    pub async fn remove_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        kind: &str,
    ) -> ChatResult<Vec<Effect>> {
        if !self.messages.remove_reaction(message_id, user_id, kind).await {
            return Err(ChatError::MessageNotFound(message_id.to_string()));
        }
        Ok(vec![Effect::broadcast(ServerEvent::ReactionRemoved {
            message_id: message_id.to_string(),
            user_id: user_id.to_string(),
            kind: kind.to_string(),
        })])
    }

    /// Record or clear a typing entry and notify the room.
    pub async fn set_typing(
        &self,
        room_id: &str,
        user_id: &str,
        is_typing: bool,
    ) -> ChatResult<Vec<Effect>> {
        let user = self.require_user(user_id).await?;
        self.typing.set_typing(room_id, user_id, is_typing);

        let event = if is_typing {
            ServerEvent::UserTyping {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
                user_name: user.name,
            }
        } else {
            ServerEvent::UserStoppedTyping {
                room_id: room_id.to_string(),
                user_id: user_id.to_string(),
                user_name: user.name,
            }
        };
        Ok(vec![Effect::room(room_id, event)])
    }

    pub async fn update_status(
        &self,
        user_id: &str,
        status: UserStatus,
    ) -> ChatResult<Vec<Effect>> {
        if !self.users.set_status(user_id, status).await {
            return Err(ChatError::UserNotFound(user_id.to_string()));
        }
        let user = self.require_user(user_id).await?;
        Ok(vec![Effect::broadcast(ServerEvent::UserStatusChanged {
            user_id: user_id.to_string(),
            status,
            user_name: user.name,
        })])
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        name: &str,
        avatar: &str,
    ) -> ChatResult<Vec<Effect>> {
        if !self.users.update_profile(user_id, name, avatar).await {
            return Err(ChatError::UserNotFound(user_id.to_string()));
        }
        let user = self.require_user(user_id).await?;
        Ok(vec![Effect::broadcast(ServerEvent::UserProfileUpdated {
            user,
        })])
    }

    pub async fn update_preferences(
        &self,
        user_id: &str,
        preferences: HashMap<String, serde_json::Value>,
    ) -> ChatResult<Vec<Effect>> {
        if !self.users.update_preferences(user_id, preferences).await {
            return Err(ChatError::UserNotFound(user_id.to_string()));
        }
        Ok(vec![Effect::caller(ServerEvent::PreferencesUpdated {
            user_id: user_id.to_string(),
        })])
    }

    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        avatar: &str,
    ) -> ChatResult<Vec<Effect>> {
        let user = self.users.create(name, email, avatar);
        info!(user = %user.name, id = %user.id, "user created");
        Ok(vec![Effect::broadcast(ServerEvent::UserCreated { user })])
    }

    pub async fn create_room(
        &self,
        name: &str,
        description: &str,
        room_type: RoomType,
        creator_id: &str,
    ) -> ChatResult<Vec<Effect>> {
        self.require_user(creator_id).await?;
        let room = self.rooms.create(name, description, room_type, creator_id).await;
        self.users.add_room(creator_id, &room.id).await;
        info!(room = %room.name, id = %room.id, creator = %creator_id, "room created");
        Ok(vec![Effect::broadcast(ServerEvent::RoomCreated { room })])
    }

    pub async fn get_rooms(&self) -> ChatResult<Vec<Effect>> {
        Ok(vec![Effect::caller(ServerEvent::RoomsList {
            rooms: self.rooms.list().await,
        })])
    }

    pub async fn get_online_users(&self) -> ChatResult<Vec<Effect>> {
        Ok(vec![Effect::caller(ServerEvent::OnlineUsers {
            users: self.users.list_online().await,
        })])
    }

    /// History window for a room; an unknown room yields an empty list.
    pub async fn get_message_history(
        &self,
        room_id: &str,
        limit: usize,
        offset: usize,
    ) -> ChatResult<Vec<Effect>> {
        Ok(vec![Effect::caller(ServerEvent::MessageHistory {
            room_id: room_id.to_string(),
            messages: self.messages.list(room_id, limit, offset).await,
        })])
    }

    /// Who is typing right now; expired entries are purged during the scan.
    pub async fn get_typing_users(&self, room_id: &str) -> ChatResult<Vec<Effect>> {
        Ok(vec![Effect::caller(ServerEvent::TypingUsers {
            room_id: room_id.to_string(),
            user_ids: self.typing.active_typers(room_id),
        })])
    }

    /// Broadcast a read receipt. The log itself is not mutated.
    pub async fn mark_read(&self, message_id: &str, user_id: &str) -> ChatResult<Vec<Effect>> {
        if self.messages.find(message_id).await.is_none() {
            return Err(ChatError::MessageNotFound(message_id.to_string()));
        }
        Ok(vec![Effect::broadcast(ServerEvent::MessageRead {
            message_id: message_id.to_string(),
            user_id: user_id.to_string(),
        })])
    }

    /// Deliver a notification to every connection of one user.
    pub async fn send_notification(
        &self,
        user_id: &str,
        title: &str,
        message: &str,
        kind: &str,
    ) -> ChatResult<Vec<Effect>> {
        self.require_user(user_id).await?;
        Ok(vec![Effect::user(
            user_id,
            ServerEvent::NotificationReceived {
                notification: Notification::new(title, message, kind),
            },
        )])
    }

    pub async fn send_global_notification(
        &self,
        title: &str,
        message: &str,
        kind: &str,
    ) -> ChatResult<Vec<Effect>> {
        Ok(vec![Effect::broadcast(ServerEvent::GlobalNotification {
            notification: Notification::new(title, message, kind),
        })])
    }

    /// Tear down a closed connection.
    ///
    /// Idempotent: an already-unbound connection is a no-op with no fan-out.
    /// The user only goes Offline when their *last* connection disappears;
    /// with other live connections presence is untouched.
    pub async fn disconnect(&self, connection_id: &str) -> ChatResult<Vec<Effect>> {
        let Some(user_id) = self.connections.unbind(connection_id) else {
            return Ok(Vec::new());
        };

        if !self.connections.connections_of(&user_id).is_empty() {
            debug!(user = %user_id, connection = %connection_id, "disconnect, other connections remain");
            return Ok(Vec::new());
        }

        self.users.set_status(&user_id, UserStatus::Offline).await;
        let Some(user) = self.users.get(&user_id).await else {
            // Connection was bound to a user that no longer resolves; nothing
            // to announce.
            return Ok(Vec::new());
        };

        info!(user = %user.name, connection = %connection_id, "last connection closed, user offline");

        Ok(vec![Effect::broadcast(ServerEvent::UserStatusChanged {
            user_id,
            status: UserStatus::Offline,
            user_name: user.name,
        })])
    }
}
