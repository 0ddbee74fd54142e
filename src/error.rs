//! Unified error handling for chatterd.
//!
//! Every engine operation returns `Result<Vec<Effect>, ChatError>`. A failed
//! operation produces no fan-out: the gateway turns the error into a
//! caller-only `error` event and nothing else observes it.

use thiserror::Error;

/// Errors that can occur while handling a chat operation.
///
/// Ownership failures on edit/delete are deliberately reported as
/// `MessageNotFound` so a caller cannot distinguish "wrong owner" from
/// "no such message".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("no such user: {0}")]
    UserNotFound(String),

    #[error("no such room: {0}")]
    RoomNotFound(String),

    #[error("no such message: {0}")]
    MessageNotFound(String),

    #[error("no such connection: {0}")]
    ConnectionNotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl ChatError {
    /// Static error code, used for structured logging in the gateway.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "user_not_found",
            Self::RoomNotFound(_) => "room_not_found",
            Self::MessageNotFound(_) => "message_not_found",
            Self::ConnectionNotFound(_) => "connection_not_found",
            Self::InvalidState(_) => "invalid_state",
        }
    }
}

/// Result type for engine operations.
pub type ChatResult<T> = Result<T, ChatError>;
