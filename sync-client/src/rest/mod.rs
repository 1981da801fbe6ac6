//! REST abstraction for roomsync.
//!
//! This module defines the room-level calls the engine makes against the
//! server. Request construction, authentication, timeouts and retry policy
//! belong to the implementation, not to the engine.
//!
//! # Design
//!
//! Every call is async and returns `Result<_, ApiError>`. Failures are
//! classified so callers can react to the ones that matter:
//! - `Network` - no response (transport failure)
//! - `Protocol` - the server answered with a structured error code
//! - `Unexpected` - anything else (undecodable body, ...)
//!
//! # Example
//!
//! ```ignore
//! let api = MockRoomsApi::new();
//! api.queue_history(TokensChunk::new(None, Some("t1".into()), events));
//! let page = api.get_earlier_messages(&room_id, None, 20).await?;
//! ```

mod mock;

pub use mock::{ApiCall, MockRoomsApi};

use async_trait::async_trait;
use roomsync_types::{
    Event, EventId, MessageContent, RoomId, RoomResponse, ServerError, TokensChunk,
    TransactionId, UserId,
};
use thiserror::Error;

/// REST errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Transport failure, no response from the server.
    #[error("network error: {0}")]
    Network(String),

    /// The server returned a structured error.
    #[error("server error: {0}")]
    Protocol(#[from] ServerError),

    /// Anything not classifiable as the above.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ApiError {
    /// Whether the server rejected a pagination token as unknown.
    pub fn is_unknown_token(&self) -> bool {
        matches!(self, Self::Protocol(e) if e.is_unknown_token())
    }
}

/// Room-level REST calls.
///
/// Implementations handle the wire protocol (HTTP, mock, etc).
#[async_trait]
pub trait RoomsApi: Send + Sync {
    /// Fetch up to `limit` events older than `from`, most recent first.
    ///
    /// `from = None` means "starting from live".
    async fn get_earlier_messages(
        &self,
        room_id: &RoomId,
        from: Option<&str>,
        limit: usize,
    ) -> Result<TokensChunk, ApiError>;

    /// Send a message. Returns the event echoed by the server.
    async fn send_message(
        &self,
        room_id: &RoomId,
        txn_id: &TransactionId,
        content: &MessageContent,
    ) -> Result<Event, ApiError>;

    /// Join a room.
    async fn join_room(&self, room_id: &RoomId) -> Result<(), ApiError>;

    /// Room-level initial sync: full state plus the latest messages.
    async fn initial_sync(&self, room_id: &RoomId) -> Result<RoomResponse, ApiError>;

    /// Invite a user.
    async fn invite_to_room(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), ApiError>;

    /// Leave a room.
    async fn leave_room(&self, room_id: &RoomId) -> Result<(), ApiError>;

    /// Kick a user (sets their membership to leave).
    async fn kick_from_room(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), ApiError>;

    /// Ban a user.
    async fn ban_from_room(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        reason: Option<&str>,
    ) -> Result<(), ApiError>;

    /// Set the room name.
    async fn update_name(&self, room_id: &RoomId, name: &str) -> Result<(), ApiError>;

    /// Set the room topic.
    async fn update_topic(&self, room_id: &RoomId, topic: &str) -> Result<(), ApiError>;

    /// Redact an event. Returns the redaction event.
    async fn redact(&self, room_id: &RoomId, event_id: &EventId) -> Result<Event, ApiError>;
}
