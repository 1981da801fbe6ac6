//! SyncEngine - the entry point for a sync session.
//!
//! The engine owns the [`EventBus`] and the shared [`RoomContext`]. It turns
//! what arrives from the server (initial sync responses, live events,
//! presence) into room state, store updates and bus dispatches.
//!
//! ```text
//! server ─→ SyncEngine ─→ Room (live snapshot)
//!               │  ├────→ Store (log, summary)
//!               │  └────→ EventBus ─→ room-scoped adapters ─→ listeners
//! ```
//!
//! # Example
//!
//! ```ignore
//! let config = ClientConfig::from_file(Path::new("client.toml"))?;
//! let engine = SyncEngine::new(&config, Arc::new(api), Arc::new(MemoryStore::new()));
//!
//! let room = engine.join_room(&room_id).await?;
//! room.add_event_listener(listener);
//! room.init_history();
//! room.request_history().await?;
//! ```

use std::sync::Arc;

use roomsync_core::EventDirection;
use roomsync_types::{Event, EventType, RoomId, RoomResponse, UserId};
use tokio::sync::Mutex;

use crate::bus::EventBus;
use crate::config::ClientConfig;
use crate::rest::{ApiError, RoomsApi};
use crate::room::{Room, RoomContext};
use crate::store::Store;

/// Drives rooms from server data.
pub struct SyncEngine {
    ctx: RoomContext,
    // Serializes room creation so a room id never maps to two rooms.
    creating: Mutex<()>,
}

impl SyncEngine {
    /// Create an engine with a fresh event bus.
    pub fn new(config: &ClientConfig, api: Arc<dyn RoomsApi>, store: Arc<dyn Store>) -> Self {
        let ctx = RoomContext::new(
            api,
            store,
            EventBus::new(),
            config.session.user_id.clone(),
            config.history.page_size,
        );
        Self {
            ctx,
            creating: Mutex::new(()),
        }
    }

    /// The engine's event bus.
    pub fn bus(&self) -> &EventBus {
        self.ctx.bus()
    }

    /// The shared store.
    pub fn store(&self) -> &Arc<dyn Store> {
        self.ctx.store()
    }

    /// The syncing user.
    pub fn self_user_id(&self) -> &UserId {
        self.ctx.self_user_id()
    }

    /// The stored room, if any.
    pub async fn get_room(&self, room_id: &RoomId) -> Option<Room> {
        self.ctx.store().get_room(room_id).await
    }

    /// The stored room, or a new unready room which is stored first.
    pub async fn room(&self, room_id: &RoomId) -> Room {
        if let Some(room) = self.ctx.store().get_room(room_id).await {
            return room;
        }

        let _creating = self.creating.lock().await;
        if let Some(room) = self.ctx.store().get_room(room_id).await {
            return room;
        }
        let room = Room::new(room_id.clone(), self.ctx.clone());
        self.ctx.store().store_room(room.clone()).await;
        tracing::debug!(room_id = %room_id, "created room");
        room
    }

    /// Apply a room initial sync response, then its presence events.
    pub async fn handle_initial_room_response(&self, response: &RoomResponse) -> Room {
        let room = self.room(&response.room_id).await;
        room.apply_initial_response(response).await;
        for event in &response.presence {
            self.handle_presence_event(event).await;
        }
        room
    }

    /// Apply a live room event.
    ///
    /// Redactions blank the redacted event's stored content. State events
    /// update the live snapshot. The event is appended to the room's log,
    /// the summary is refreshed, and the event is dispatched with a copy of
    /// the live snapshot.
    pub async fn handle_live_event(&self, event: &Event) {
        let room = self.room(&event.room_id).await;
        let store = self.ctx.store();

        if event.event_type == EventType::Redaction {
            if let Some(target) = &event.redacts {
                store
                    .update_event_content(&event.room_id, target, serde_json::json!({}))
                    .await;
                tracing::debug!(room_id = %event.room_id, redacts = %target, "redacted event");
            }
        }

        if event.is_state() {
            room.process_state_event(event, EventDirection::Forwards);
        }

        store.store_live_room_event(event).await;

        let live = room.live_state();
        store
            .store_summary(&event.room_id, Some(event), &live, self.ctx.self_user_id())
            .await;

        self.ctx.bus().on_live_event(event, &live);
    }

    /// Record a presence update and dispatch it.
    pub async fn handle_presence_event(&self, event: &Event) {
        self.ctx.process_presence(event).await;
    }

    /// Join a room and load its initial state.
    pub async fn join_room(&self, room_id: &RoomId) -> Result<Room, ApiError> {
        let room = self.room(room_id).await;
        room.join().await?;
        Ok(room)
    }

    /// Leave a room and evict it.
    ///
    /// A room the engine does not know is left on the server only.
    pub async fn leave_room(&self, room_id: &RoomId) -> Result<(), ApiError> {
        match self.ctx.store().get_room(room_id).await {
            Some(room) => {
                room.leave().await?;
                self.evict(&room).await;
            }
            None => self.ctx.api().leave_room(room_id).await?,
        }
        Ok(())
    }

    /// Close and evict every room.
    pub async fn shutdown(&self) {
        let rooms = self.ctx.store().rooms().await;
        let count = rooms.len();
        for room in rooms {
            self.evict(&room).await;
        }
        tracing::info!(rooms = count, "sync engine shut down");
    }

    async fn evict(&self, room: &Room) {
        room.close();
        self.ctx.store().remove_room(room.room_id()).await;
        tracing::debug!(room_id = %room.room_id(), "evicted room");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{BusEvent, ChannelListener};
    use crate::rest::{ApiCall, MockRoomsApi};
    use crate::store::MemoryStore;
    use roomsync_types::{EventId, TokensChunk};
    use serde_json::json;

    fn rid() -> RoomId {
        RoomId::new("!r:hs")
    }

    fn setup() -> (SyncEngine, MockRoomsApi, Arc<MemoryStore>) {
        let api = MockRoomsApi::new();
        let store = Arc::new(MemoryStore::new());
        let engine = SyncEngine::new(
            &ClientConfig::new("@me:hs"),
            Arc::new(api.clone()),
            store.clone(),
        );
        (engine, api, store)
    }

    fn msg(id: &str) -> Event {
        Event::new(id, "!r:hs", EventType::Message, "@b:hs")
            .with_content(json!({ "msgtype": "m.text", "body": id }))
    }

    fn member(user: &str, membership: &str) -> Event {
        Event::new(format!("$m-{user}"), "!r:hs", EventType::RoomMember, user)
            .with_state_key(user)
            .with_content(json!({ "membership": membership }))
    }

    fn presence(user: &str) -> Event {
        Event::new(format!("$p-{user}"), "!r:hs", EventType::Presence, user)
            .with_content(json!({ "user_id": user, "presence": "online" }))
    }

    fn initial(state: Vec<Event>, messages: Vec<Event>) -> RoomResponse {
        RoomResponse {
            room_id: rid(),
            membership: None,
            state,
            messages: Some(TokensChunk::new(Some("s0".into()), Some("e0".into()), messages)),
            presence: vec![presence("@b:hs")],
        }
    }

    // ===========================================
    // Room Registry Tests
    // ===========================================

    #[tokio::test]
    async fn room_is_created_once_and_stored() {
        let (engine, _api, store) = setup();
        assert!(engine.get_room(&rid()).await.is_none());

        let first = engine.room(&rid()).await;
        first.process_live_state(&[]);
        let second = engine.room(&rid()).await;

        assert!(second.is_ready());
        assert_eq!(store.rooms().await.len(), 1);
    }

    #[tokio::test]
    async fn initial_response_makes_room_ready() {
        let (engine, _api, store) = setup();
        let room = engine
            .handle_initial_room_response(&initial(vec![member("@b:hs", "join")], vec![msg("$1")]))
            .await;

        assert!(room.is_ready());
        assert_eq!(store.event_count(&rid()), Some(1));
        assert_eq!(store.room_token(&rid()).as_deref(), Some("s0"));
        assert!(store.get_summary(&rid()).await.is_some());
        assert!(store.get_user(&UserId::new("@b:hs")).await.is_some());
    }

    // ===========================================
    // Live Event Tests
    // ===========================================

    #[tokio::test]
    async fn live_event_updates_log_summary_and_bus() {
        let (engine, _api, store) = setup();
        engine
            .handle_initial_room_response(&initial(vec![member("@b:hs", "join")], vec![msg("$1")]))
            .await;
        let (listener, mut rx) = ChannelListener::new();
        engine.bus().subscribe(listener);

        engine.handle_live_event(&msg("$2")).await;

        assert_eq!(store.event_count(&rid()), Some(2));
        let summary = store.get_summary(&rid()).await.unwrap();
        assert_eq!(
            summary.latest_event.and_then(|e| e.event_id),
            Some(EventId::new("$2"))
        );
        assert!(matches!(rx.try_recv(), Ok(BusEvent::Live { .. })));
    }

    #[tokio::test]
    async fn live_state_event_updates_live_snapshot() {
        let (engine, _api, _store) = setup();
        let room = engine.room(&rid()).await;
        let (listener, mut rx) = ChannelListener::new();
        engine.bus().subscribe(listener);

        engine.handle_live_event(&member("@c:hs", "join")).await;

        assert!(room.member(&UserId::new("@c:hs")).is_some());
        match rx.try_recv() {
            Ok(BusEvent::Live { state, .. }) => {
                assert!(state.member(&UserId::new("@c:hs")).is_some());
            }
            other => panic!("expected live event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn live_events_reach_room_listeners_only_when_ready() {
        let (engine, _api, _store) = setup();
        let room = engine.room(&rid()).await;
        let (listener, mut rx) = ChannelListener::new();
        room.add_event_listener(listener);

        engine.handle_live_event(&msg("$1")).await;
        assert!(rx.try_recv().is_err());

        room.process_live_state(&[]);
        engine.handle_live_event(&msg("$2")).await;
        assert!(matches!(rx.try_recv(), Ok(BusEvent::Live { .. })));
    }

    #[tokio::test]
    async fn redaction_blanks_stored_content() {
        let (engine, _api, store) = setup();
        engine
            .handle_initial_room_response(&initial(vec![], vec![msg("$1")]))
            .await;

        let redaction = Event::new("$r", "!r:hs", EventType::Redaction, "@b:hs")
            .with_redacts("$1");
        engine.handle_live_event(&redaction).await;

        let oldest = store.get_oldest_event(&rid()).await.unwrap();
        assert_eq!(oldest.event_id, Some(EventId::new("$1")));
        assert_eq!(oldest.content, json!({}));
    }

    // ===========================================
    // Presence Tests
    // ===========================================

    #[tokio::test]
    async fn presence_is_stored_and_dispatched() {
        let (engine, _api, store) = setup();
        let (listener, mut rx) = ChannelListener::new();
        engine.bus().subscribe(listener);

        engine.handle_presence_event(&presence("@b:hs")).await;

        let user = store.get_user(&UserId::new("@b:hs")).await.unwrap();
        assert_eq!(user.presence.as_deref(), Some("online"));
        match rx.try_recv() {
            Ok(BusEvent::Presence { user, .. }) => {
                assert_eq!(user.user_id, UserId::new("@b:hs"));
            }
            other => panic!("expected presence, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_presence_is_skipped() {
        let (engine, _api, store) = setup();
        let (listener, mut rx) = ChannelListener::new();
        engine.bus().subscribe(listener);

        let bad = Event::new("$p", "!r:hs", EventType::Presence, "@b:hs")
            .with_content(json!({ "presence": 5 }));
        engine.handle_presence_event(&bad).await;

        assert!(store.users().await.is_empty());
        assert!(rx.try_recv().is_err());
    }

    // ===========================================
    // Join / Leave Tests
    // ===========================================

    #[tokio::test]
    async fn join_room_loads_state() {
        let (engine, api, _store) = setup();
        api.queue_initial_sync(initial(vec![member("@b:hs", "join")], vec![]));

        let room = engine.join_room(&rid()).await.unwrap();

        assert!(room.is_ready());
        assert_eq!(room.name(), "@b:hs");
    }

    #[tokio::test]
    async fn leave_room_evicts_and_closes() {
        let (engine, api, store) = setup();
        let room = engine.room(&rid()).await;
        let (listener, _rx) = ChannelListener::new();
        room.add_event_listener(listener);

        engine.leave_room(&rid()).await.unwrap();

        assert_eq!(api.last_call(), Some(ApiCall::Leave(rid())));
        assert!(store.get_room(&rid()).await.is_none());
        assert_eq!(engine.bus().listener_count(), 0);
    }

    #[tokio::test]
    async fn failed_leave_keeps_room() {
        let (engine, api, store) = setup();
        engine.room(&rid()).await;
        api.fail_next(ApiError::Network("down".into()));

        assert!(engine.leave_room(&rid()).await.is_err());
        assert!(store.get_room(&rid()).await.is_some());
    }

    #[tokio::test]
    async fn leave_unknown_room_still_calls_server() {
        let (engine, api, _store) = setup();
        engine.leave_room(&rid()).await.unwrap();
        assert_eq!(api.calls(), vec![ApiCall::Leave(rid())]);
    }

    #[tokio::test]
    async fn shutdown_evicts_all_rooms() {
        let (engine, _api, store) = setup();
        let a = engine.room(&RoomId::new("!a:hs")).await;
        let b = engine.room(&RoomId::new("!b:hs")).await;
        let (la, _rxa) = ChannelListener::new();
        let (lb, _rxb) = ChannelListener::new();
        a.add_event_listener(la);
        b.add_event_listener(lb);

        engine.shutdown().await;

        assert!(store.rooms().await.is_empty());
        assert_eq!(engine.bus().listener_count(), 0);
    }
}
