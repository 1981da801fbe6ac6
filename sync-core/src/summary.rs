//! Room summaries for room lists.
//!
//! A summary is rebuilt from scratch every time it is stored; it is never
//! patched field by field.

use serde::{Deserialize, Serialize};

use roomsync_types::{Event, RoomId, UserId};

use crate::{RoomMember, RoomState};

/// Denormalized view of a room: latest event, state and members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    /// The room.
    pub room_id: RoomId,
    /// Most recent event seen for the room.
    pub latest_event: Option<Event>,
    /// State snapshot that accompanied the latest event.
    pub latest_state: RoomState,
    /// Members of the room's live state.
    pub members: Vec<RoomMember>,
    /// Display name from the syncing user's point of view.
    pub name: String,
    /// Topic of the live state.
    pub topic: Option<String>,
}

impl RoomSummary {
    /// Compute a summary.
    ///
    /// `live` supplies members, name and topic; `latest_state` is the
    /// snapshot that was current when `latest_event` arrived.
    pub fn compute(
        latest_event: Option<&Event>,
        latest_state: &RoomState,
        live: &RoomState,
        self_user_id: &UserId,
    ) -> Self {
        Self {
            room_id: live.room_id.clone(),
            latest_event: latest_event.cloned(),
            latest_state: latest_state.clone(),
            members: live.members().cloned().collect(),
            name: live.display_name(self_user_id),
            topic: live.topic.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomsync_types::EventType;
    use serde_json::json;

    #[test]
    fn summary_reflects_live_state() {
        let mut live = RoomState::new(RoomId::new("!r:hs"));
        live.apply(
            &Event::new("$1", "!r:hs", EventType::RoomTopic, "@a:hs")
                .with_state_key("")
                .with_content(json!({ "topic": "news" })),
        );
        live.apply(
            &Event::new("$2", "!r:hs", EventType::RoomMember, "@b:hs")
                .with_state_key("@b:hs")
                .with_content(json!({ "membership": "join", "displayname": "Bee" })),
        );
        let latest = Event::new("$3", "!r:hs", EventType::Message, "@b:hs")
            .with_content(json!({ "msgtype": "m.text", "body": "hey" }));

        let summary = RoomSummary::compute(Some(&latest), &live, &live, &UserId::new("@me:hs"));

        assert_eq!(summary.room_id, RoomId::new("!r:hs"));
        assert_eq!(summary.name, "Bee");
        assert_eq!(summary.topic.as_deref(), Some("news"));
        assert_eq!(summary.members.len(), 1);
        assert_eq!(summary.latest_event, Some(latest));
    }

    #[test]
    fn recompute_replaces_every_field() {
        let mut live = RoomState::new(RoomId::new("!r:hs"));
        let me = UserId::new("@me:hs");
        let first = RoomSummary::compute(None, &live, &live, &me);

        live.apply(
            &Event::new("$1", "!r:hs", EventType::RoomName, "@a:hs")
                .with_state_key("")
                .with_content(json!({ "name": "Renamed" })),
        );
        let second = RoomSummary::compute(None, &live, &live, &me);

        assert_eq!(first.name, "!r:hs");
        assert_eq!(second.name, "Renamed");
        assert_eq!(second.latest_state.name.as_deref(), Some("Renamed"));
    }
}
