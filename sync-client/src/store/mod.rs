//! Store abstraction for roomsync.
//!
//! A store caches what the client knows: rooms, users, per-room event logs
//! with their pagination tokens, and per-room summaries. All operations are
//! plain data manipulation; the trait is async so that persistent
//! implementations can do I/O without blocking the caller.
//!
//! # Event log rules
//!
//! - A room's log is created only by [`Store::store_room_events`] in the
//!   forwards direction. Live events for a room without a log are dropped,
//!   because the log would have no pagination token to continue from.
//! - An event already in a log (by identifier) is never stored twice.
//! - [`Store::get_room_events`] only serves the page "from live" (no token);
//!   any token means the caller has to go to the network.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use roomsync_core::{EventDirection, RoomState, RoomSummary};
use roomsync_types::{Event, EventId, RoomId, TokensChunk, User, UserId};

use crate::room::Room;

/// Cache of rooms, users, event logs and summaries.
#[async_trait]
pub trait Store: Send + Sync {
    /// All stored rooms.
    async fn rooms(&self) -> Vec<Room>;

    /// Look up a room.
    async fn get_room(&self, room_id: &RoomId) -> Option<Room>;

    /// Insert or replace a room.
    async fn store_room(&self, room: Room);

    /// Remove a room, returning it if it was stored.
    async fn remove_room(&self, room_id: &RoomId) -> Option<Room>;

    /// All known users.
    async fn users(&self) -> Vec<User>;

    /// Look up a user.
    async fn get_user(&self, user_id: &UserId) -> Option<User>;

    /// Insert or replace a user.
    async fn store_user(&self, user: User);

    /// First event by insertion order in the room's log.
    async fn get_oldest_event(&self, room_id: &RoomId) -> Option<Event>;

    /// Append a live event to its room's log, if that log exists.
    async fn store_live_room_event(&self, event: &Event);

    /// Store a page of events.
    ///
    /// Forwards: create the log (anchored at `chunk.start`) if needed, then
    /// append the events in order. Backwards storage is not supported.
    async fn store_room_events(&self, room_id: &RoomId, chunk: &TokensChunk, direction: EventDirection);

    /// Replace the content of a stored event (redactions, edits).
    async fn update_event_content(
        &self,
        room_id: &RoomId,
        event_id: &EventId,
        content: serde_json::Value,
    );

    /// Recompute and overwrite the room's summary from its live state.
    ///
    /// No-op if the room is not stored.
    async fn store_summary(
        &self,
        room_id: &RoomId,
        latest_event: Option<&Event>,
        latest_state: &RoomState,
        self_user_id: &UserId,
    );

    /// The room's summary.
    async fn get_summary(&self, room_id: &RoomId) -> Option<RoomSummary>;

    /// All summaries.
    async fn get_summaries(&self) -> Vec<RoomSummary>;

    /// Cached events before `token`, most recent first, with the log token
    /// as `end`. `None` when nothing is cached for that position.
    async fn get_room_events(&self, room_id: &RoomId, token: Option<&str>) -> Option<TokensChunk>;
}
