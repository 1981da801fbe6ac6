//! Response shapes returned by the server and by stores.

use serde::{Deserialize, Serialize};

use crate::{Event, Membership, PresenceContent, RoomId, UserId};

/// A page of events bounded by two pagination tokens.
///
/// For backward pagination `chunk` is ordered most-recent-first and `end`
/// is the token to continue further back from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokensChunk {
    /// Token at the start of this page.
    #[serde(default)]
    pub start: Option<String>,
    /// Token at the end of this page.
    #[serde(default)]
    pub end: Option<String>,
    /// The events.
    #[serde(default)]
    pub chunk: Vec<Event>,
}

impl TokensChunk {
    /// Create a page from its tokens and events.
    pub fn new(start: Option<String>, end: Option<String>, chunk: Vec<Event>) -> Self {
        Self { start, end, chunk }
    }

    /// Number of events in the page.
    pub fn len(&self) -> usize {
        self.chunk.len()
    }

    /// Whether the page holds no events.
    pub fn is_empty(&self) -> bool {
        self.chunk.is_empty()
    }
}

/// Result of a room-level initial sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomResponse {
    /// The room.
    pub room_id: RoomId,
    /// The syncing user's membership, if known.
    #[serde(default)]
    pub membership: Option<Membership>,
    /// Full current state of the room.
    #[serde(default)]
    pub state: Vec<Event>,
    /// Most recent messages, oldest first, with pagination tokens.
    #[serde(default)]
    pub messages: Option<TokensChunk>,
    /// Presence of the room's members.
    #[serde(default)]
    pub presence: Vec<Event>,
}

/// A user as known from presence updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The user.
    pub user_id: UserId,
    /// Global display name.
    #[serde(default)]
    pub displayname: Option<String>,
    /// Global avatar.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Presence string (`online`, `offline`, ...).
    #[serde(default)]
    pub presence: Option<String>,
    /// Milliseconds since last activity.
    #[serde(default)]
    pub last_active_ago: Option<u64>,
}

impl User {
    /// A user with nothing but an identifier.
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            displayname: None,
            avatar_url: None,
            presence: None,
            last_active_ago: None,
        }
    }
}

impl From<PresenceContent> for User {
    fn from(p: PresenceContent) -> Self {
        Self {
            user_id: p.user_id,
            displayname: p.displayname,
            avatar_url: p.avatar_url,
            presence: p.presence,
            last_active_ago: p.last_active_ago,
        }
    }
}
