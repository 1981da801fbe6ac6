//! Room state projection for roomsync.
//!
//! [`RoomState`] is a snapshot of a room's durable properties (name, topic,
//! membership, aliases, visibility). [`apply_state_event`] folds one state
//! event into a snapshot. It has no notion of direction: a room keeps a live
//! snapshot and a historical snapshot and chooses which one to fold into
//! (see [`EventDirection`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use roomsync_types::{
    AliasesContent, CanonicalAliasContent, Event, EventType, JoinRulesContent, MemberContent,
    Membership, RoomId, RoomNameContent, RoomTopicContent, UserId,
};

/// The direction from which an event is considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventDirection {
    /// Events coming down the live event stream.
    Forwards,
    /// Old events requested through pagination.
    Backwards,
}

/// A user's membership entry in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMember {
    /// The member.
    pub user_id: UserId,
    /// Membership status.
    pub membership: Membership,
    /// Room-specific display name.
    pub displayname: Option<String>,
    /// Avatar reference.
    pub avatar_url: Option<String>,
}

impl RoomMember {
    /// Name to show for this member: display name if set, else the user id.
    pub fn name(&self) -> &str {
        self.displayname
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.user_id.as_str())
    }
}

/// Snapshot of a room's state.
///
/// Cloning produces an independent deep copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomState {
    /// The room this snapshot describes.
    pub room_id: RoomId,
    /// Explicit room name.
    pub name: Option<String>,
    /// Room topic.
    pub topic: Option<String>,
    /// Join rule / visibility (`public`, `invite`, ...).
    pub visibility: Option<String>,
    /// Published aliases.
    pub aliases: Vec<String>,
    /// Alias chosen by `m.room.canonical_alias`.
    pub canonical_alias: Option<String>,
    token: Option<String>,
    members: BTreeMap<UserId, RoomMember>,
}

impl RoomState {
    /// An empty snapshot for the given room.
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            name: None,
            topic: None,
            visibility: None,
            aliases: Vec::new(),
            canonical_alias: None,
            token: None,
            members: BTreeMap::new(),
        }
    }

    /// Pagination token this snapshot was last advanced to.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Set the pagination token.
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// All member entries, ordered by user id. Includes left and banned users.
    pub fn members(&self) -> impl Iterator<Item = &RoomMember> {
        self.members.values()
    }

    /// Number of member entries (any membership).
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Look up a member entry.
    pub fn member(&self, user_id: &UserId) -> Option<&RoomMember> {
        self.members.get(user_id)
    }

    /// Insert or replace a member entry.
    pub fn set_member(&mut self, member: RoomMember) {
        self.members.insert(member.user_id.clone(), member);
    }

    /// Alias shown for the room: the canonical alias, else the first alias.
    pub fn display_alias(&self) -> Option<&str> {
        self.canonical_alias
            .as_deref()
            .or_else(|| self.aliases.first().map(String::as_str))
    }

    /// Resolve the name to show for this room from `self_user_id`'s
    /// point of view.
    ///
    /// Order: explicit name, canonical alias, a name derived from the other
    /// joined or invited members, the room id.
    pub fn display_name(&self, self_user_id: &UserId) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        if let Some(alias) = self.display_alias() {
            return alias.to_string();
        }

        let others: Vec<&RoomMember> = self
            .members
            .values()
            .filter(|m| m.membership.is_active() && &m.user_id != self_user_id)
            .collect();

        match others.as_slice() {
            [] => self.room_id.to_string(),
            [one] => one.name().to_string(),
            [a, b] => format!("{} and {}", a.name(), b.name()),
            [first, rest @ ..] => format!("{} and {} others", first.name(), rest.len()),
        }
    }

    /// Fold a state event into this snapshot in place.
    pub fn apply(&mut self, event: &Event) {
        match event.event_type {
            EventType::RoomName => {
                if let Ok(c) = event.content_as::<RoomNameContent>() {
                    self.name = c.name.filter(|n| !n.is_empty());
                }
            }
            EventType::RoomTopic => {
                if let Ok(c) = event.content_as::<RoomTopicContent>() {
                    self.topic = c.topic;
                }
            }
            EventType::RoomMember => {
                let Some(state_key) = event.state_key.as_deref() else {
                    return;
                };
                if let Ok(c) = event.content_as::<MemberContent>() {
                    self.set_member(RoomMember {
                        user_id: UserId::new(state_key),
                        membership: c.membership,
                        displayname: c.displayname,
                        avatar_url: c.avatar_url,
                    });
                }
            }
            EventType::RoomAliases => {
                if let Ok(c) = event.content_as::<AliasesContent>() {
                    self.aliases = c.aliases;
                }
            }
            EventType::CanonicalAlias => {
                if let Ok(c) = event.content_as::<CanonicalAliasContent>() {
                    self.canonical_alias = c.alias.filter(|a| !a.is_empty());
                }
            }
            EventType::JoinRules => {
                if let Ok(c) = event.content_as::<JoinRulesContent>() {
                    self.visibility = c.join_rule;
                }
            }
            _ => {}
        }
    }
}

/// Fold a state event into a snapshot, returning the new snapshot.
///
/// The result depends only on `state` and `event`. Unknown event types and
/// contents that do not decode leave the snapshot unchanged.
pub fn apply_state_event(mut state: RoomState, event: &Event) -> RoomState {
    state.apply(event);
    state
}
