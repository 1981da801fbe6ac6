//! Typed contents for the event types the engine interprets.
//!
//! All fields are optional on the wire; a missing field decodes as `None`
//! (or empty) so that a partial state event still applies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Membership status of a user in a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Membership {
    /// Joined the room.
    Join,
    /// Invited but not yet joined.
    Invite,
    /// Left, or was kicked.
    Leave,
    /// Banned.
    Ban,
    /// Asked to join.
    Knock,
    /// Any membership value this client does not know.
    #[serde(other)]
    Unknown,
}

impl Membership {
    /// Whether the user currently takes part in the room (joined or invited).
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Join | Self::Invite)
    }
}

impl fmt::Display for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Join => "join",
            Self::Invite => "invite",
            Self::Leave => "leave",
            Self::Ban => "ban",
            Self::Knock => "knock",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Content of `m.room.member`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberContent {
    /// New membership status.
    pub membership: Membership,
    /// Display name in this room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayname: Option<String>,
    /// Avatar reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Content of `m.room.name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomNameContent {
    /// The room name; absent or empty clears it.
    #[serde(default)]
    pub name: Option<String>,
}

/// Content of `m.room.topic`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomTopicContent {
    /// The room topic.
    #[serde(default)]
    pub topic: Option<String>,
}

/// Content of `m.room.aliases`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasesContent {
    /// Published aliases, in server order.
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Content of `m.room.canonical_alias`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalAliasContent {
    /// The alias to show for the room.
    #[serde(default)]
    pub alias: Option<String>,
}

/// Content of `m.room.join_rules`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRulesContent {
    /// `public`, `invite`, ...
    #[serde(default)]
    pub join_rule: Option<String>,
}

/// Content of `m.room.message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    /// Message kind, e.g. `m.text`, `m.emote`, `m.image`.
    pub msgtype: String,
    /// Plain-text body.
    pub body: String,
}

impl MessageContent {
    /// A plain `m.text` message.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            msgtype: "m.text".to_string(),
            body: body.into(),
        }
    }

    /// An `m.emote` message.
    pub fn emote(body: impl Into<String>) -> Self {
        Self {
            msgtype: "m.emote".to_string(),
            body: body.into(),
        }
    }
}

/// Content of `m.presence`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceContent {
    /// Subject of the update.
    pub user_id: crate::UserId,
    /// `online`, `unavailable`, `offline`.
    #[serde(default)]
    pub presence: Option<String>,
    /// Global display name.
    #[serde(default)]
    pub displayname: Option<String>,
    /// Global avatar.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Milliseconds since the user was last active.
    #[serde(default)]
    pub last_active_ago: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn membership_parses_lowercase() {
        let m: Membership = serde_json::from_value(json!("ban")).unwrap();
        assert_eq!(m, Membership::Ban);
        assert_eq!(m.to_string(), "ban");
    }

    #[test]
    fn membership_unknown_value_is_preserved_as_unknown() {
        let m: Membership = serde_json::from_value(json!("something_new")).unwrap();
        assert_eq!(m, Membership::Unknown);
    }

    #[test]
    fn only_join_and_invite_are_active() {
        assert!(Membership::Join.is_active());
        assert!(Membership::Invite.is_active());
        assert!(!Membership::Leave.is_active());
        assert!(!Membership::Ban.is_active());
    }

    #[test]
    fn member_content_optional_fields() {
        let c: MemberContent = serde_json::from_value(json!({ "membership": "join" })).unwrap();
        assert_eq!(c.membership, Membership::Join);
        assert!(c.displayname.is_none());
        assert!(c.avatar_url.is_none());
    }

    #[test]
    fn aliases_default_to_empty() {
        let c: AliasesContent = serde_json::from_value(json!({})).unwrap();
        assert!(c.aliases.is_empty());
    }

    #[test]
    fn text_message_has_m_text_type() {
        let m = MessageContent::text("hello");
        assert_eq!(
            serde_json::to_value(&m).unwrap(),
            json!({ "msgtype": "m.text", "body": "hello" })
        );
    }

    #[test]
    fn emote_has_m_emote_type() {
        let m = MessageContent::emote("waves");
        assert_eq!(
            serde_json::to_value(&m).unwrap(),
            json!({ "msgtype": "m.emote", "body": "waves" })
        );
    }
}
