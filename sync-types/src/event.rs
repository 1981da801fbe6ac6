//! The event record carried by the room event stream.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{EventId, ModelError, RoomId, UserId};

/// Type of an event.
///
/// Known types get their own variant; anything else is carried through
/// unchanged as [`EventType::Custom`].
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    /// `m.room.name`
    RoomName,
    /// `m.room.topic`
    RoomTopic,
    /// `m.room.member`
    RoomMember,
    /// `m.room.aliases`
    RoomAliases,
    /// `m.room.canonical_alias`
    CanonicalAlias,
    /// `m.room.join_rules`
    JoinRules,
    /// `m.room.message`
    Message,
    /// `m.room.redaction`
    Redaction,
    /// `m.presence`
    Presence,
    /// Any other type string.
    Custom(String),
}

impl EventType {
    /// The wire name of this type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::RoomName => "m.room.name",
            Self::RoomTopic => "m.room.topic",
            Self::RoomMember => "m.room.member",
            Self::RoomAliases => "m.room.aliases",
            Self::CanonicalAlias => "m.room.canonical_alias",
            Self::JoinRules => "m.room.join_rules",
            Self::Message => "m.room.message",
            Self::Redaction => "m.room.redaction",
            Self::Presence => "m.presence",
            Self::Custom(s) => s,
        }
    }
}

impl From<String> for EventType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "m.room.name" => Self::RoomName,
            "m.room.topic" => Self::RoomTopic,
            "m.room.member" => Self::RoomMember,
            "m.room.aliases" => Self::RoomAliases,
            "m.room.canonical_alias" => Self::CanonicalAlias,
            "m.room.join_rules" => Self::JoinRules,
            "m.room.message" => Self::Message,
            "m.room.redaction" => Self::Redaction,
            "m.presence" => Self::Presence,
            _ => Self::Custom(s),
        }
    }
}

impl From<&str> for EventType {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<EventType> for String {
    fn from(t: EventType) -> Self {
        match t {
            EventType::Custom(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventType({})", self.as_str())
    }
}

/// A single event from a room's event stream.
///
/// Events are immutable once received, except for content replacement
/// when a later redaction arrives (see the store's `update_event_content`).
/// An event without an identifier is never indexed by identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Server-assigned identifier, unique within the room's log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    /// Room this event belongs to.
    pub room_id: RoomId,
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Originating user.
    pub user_id: UserId,
    /// Arrival timestamp in milliseconds since the Unix epoch.
    #[serde(default)]
    pub origin_server_ts: u64,
    /// Free-form payload.
    #[serde(default)]
    pub content: serde_json::Value,
    /// Present only on state events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    /// For redaction events, the event being redacted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redacts: Option<EventId>,
}

impl Event {
    /// Create an event with empty content and no state key.
    pub fn new(
        event_id: impl Into<EventId>,
        room_id: impl Into<RoomId>,
        event_type: impl Into<EventType>,
        user_id: impl Into<UserId>,
    ) -> Self {
        Self {
            event_id: Some(event_id.into()),
            room_id: room_id.into(),
            event_type: event_type.into(),
            user_id: user_id.into(),
            origin_server_ts: 0,
            content: serde_json::Value::Object(serde_json::Map::new()),
            state_key: None,
            redacts: None,
        }
    }

    /// Set the content payload.
    pub fn with_content(mut self, content: serde_json::Value) -> Self {
        self.content = content;
        self
    }

    /// Set the state key, making this a state event.
    pub fn with_state_key(mut self, state_key: impl Into<String>) -> Self {
        self.state_key = Some(state_key.into());
        self
    }

    /// Set the arrival timestamp.
    pub fn with_timestamp(mut self, origin_server_ts: u64) -> Self {
        self.origin_server_ts = origin_server_ts;
        self
    }

    /// Mark this event as redacting another.
    pub fn with_redacts(mut self, redacts: impl Into<EventId>) -> Self {
        self.redacts = Some(redacts.into());
        self
    }

    /// Whether this event carries a state key.
    pub fn is_state(&self) -> bool {
        self.state_key.is_some()
    }

    /// Decode the content into a typed payload.
    pub fn content_as<T: DeserializeOwned>(&self) -> Result<T, ModelError> {
        serde_json::from_value(self.content.clone()).map_err(|source| ModelError::Content {
            event_type: self.event_type.to_string(),
            source,
        })
    }
}
