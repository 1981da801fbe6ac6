//! Room - the per-conversation aggregate.
//!
//! A [`Room`] owns two state snapshots (live and historical), the pagination
//! gate, and the adapters through which room-scoped listeners are attached
//! to the [`EventBus`].
//!
//! ```text
//! live stream ──→ process_state_event(Forwards) ──→ live snapshot
//! request_history ─→ HistoryRetriever ─→ process_state_event(Backwards) ─→ back snapshot
//!                                                         ↓
//!                                                  EventBus::on_back_event
//! ```
//!
//! Snapshot locks are never held across an `.await` or while listeners run.

use std::fmt;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};

use roomsync_core::{EventDirection, HistorySkip, PageOutcome, PaginationGate, RoomMember, RoomState};
use roomsync_types::{
    Event, EventId, MessageContent, PresenceContent, RoomId, RoomResponse, TransactionId, User,
    UserId,
};

use crate::bus::{EventBus, EventListener, SubscriptionId};
use crate::rest::{ApiError, RoomsApi};
use crate::retriever::HistoryRetriever;
use crate::store::Store;

/// Collaborators shared by every room of a session.
#[derive(Clone)]
pub struct RoomContext {
    api: Arc<dyn RoomsApi>,
    store: Arc<dyn Store>,
    bus: EventBus,
    self_user_id: UserId,
    retriever: HistoryRetriever,
}

impl RoomContext {
    /// Bundle the collaborators. `page_size` is the history page size.
    pub fn new(
        api: Arc<dyn RoomsApi>,
        store: Arc<dyn Store>,
        bus: EventBus,
        self_user_id: UserId,
        page_size: usize,
    ) -> Self {
        let retriever = HistoryRetriever::new(Arc::clone(&store), Arc::clone(&api), page_size);
        Self {
            api,
            store,
            bus,
            self_user_id,
            retriever,
        }
    }

    /// REST client.
    pub fn api(&self) -> &Arc<dyn RoomsApi> {
        &self.api
    }

    /// Shared store.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Event bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The syncing user.
    pub fn self_user_id(&self) -> &UserId {
        &self.self_user_id
    }

    /// History retriever over this context's store and client.
    pub fn retriever(&self) -> &HistoryRetriever {
        &self.retriever
    }

    /// Record a presence event and dispatch it.
    ///
    /// Events whose content does not decode to a presence are skipped.
    pub async fn process_presence(&self, event: &Event) {
        let content: PresenceContent = match event.content_as() {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed presence event");
                return;
            }
        };
        let user = User::from(content);
        self.store.store_user(user.clone()).await;
        self.bus.on_presence_update(event, &user);
    }
}

/// Result of [`Room::request_history`] when no error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOutcome {
    /// No request was made.
    Skipped(HistorySkip),
    /// A page was processed; zero means history is now exhausted.
    Retrieved(usize),
}

struct Registration {
    listener: Arc<dyn EventListener>,
    subscription: SubscriptionId,
}

struct RoomInner {
    room_id: RoomId,
    live: RwLock<RoomState>,
    back: RwLock<RoomState>,
    gate: Mutex<PaginationGate>,
    listeners: Mutex<Vec<Registration>>,
    ctx: RoomContext,
}

impl RoomInner {
    fn live(&self) -> RwLockReadGuard<'_, RoomState> {
        self.live.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn gate(&self) -> MutexGuard<'_, PaginationGate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the in-flight flag when a history request ends, including when
/// its future is dropped.
struct InFlight<'a> {
    gate: &'a Mutex<PaginationGate>,
    outcome: PageOutcome,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .finish(self.outcome);
    }
}

/// Forwards bus events concerning one room to a listener.
struct RoomScopedListener {
    room: Weak<RoomInner>,
    target: Arc<dyn EventListener>,
}

impl EventListener for RoomScopedListener {
    fn on_presence_update(&self, event: &Event, user: &User) {
        let Some(room) = self.room.upgrade() else {
            return;
        };
        let is_member = room.live().member(&user.user_id).is_some();
        if is_member {
            self.target.on_presence_update(event, user);
        }
    }

    fn on_live_event(&self, event: &Event, state: &RoomState) {
        let Some(room) = self.room.upgrade() else {
            return;
        };
        if event.room_id == room.room_id && room.gate().is_ready() {
            self.target.on_live_event(event, state);
        }
    }

    fn on_back_event(&self, event: &Event, state: &RoomState) {
        let Some(room) = self.room.upgrade() else {
            return;
        };
        if event.room_id == room.room_id {
            self.target.on_back_event(event, state);
        }
    }
}

fn same_listener(a: &Arc<dyn EventListener>, b: &Arc<dyn EventListener>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// A room. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Room {
    inner: Arc<RoomInner>,
}

impl fmt::Debug for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Room")
            .field("room_id", &self.inner.room_id)
            .field("gate", &*self.inner.gate())
            .finish()
    }
}

impl Room {
    /// A new, unready room with empty snapshots.
    pub fn new(room_id: RoomId, ctx: RoomContext) -> Self {
        let inner = RoomInner {
            live: RwLock::new(RoomState::new(room_id.clone())),
            back: RwLock::new(RoomState::new(room_id.clone())),
            room_id,
            gate: Mutex::new(PaginationGate::new()),
            listeners: Mutex::new(Vec::new()),
            ctx,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    fn back(&self) -> RwLockReadGuard<'_, RoomState> {
        self.inner.back.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot_mut(&self, direction: EventDirection) -> RwLockWriteGuard<'_, RoomState> {
        let lock = match direction {
            EventDirection::Forwards => &self.inner.live,
            EventDirection::Backwards => &self.inner.back,
        };
        lock.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners(&self) -> MutexGuard<'_, Vec<Registration>> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn ctx(&self) -> &RoomContext {
        &self.inner.ctx
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The room's identifier.
    pub fn room_id(&self) -> &RoomId {
        &self.inner.room_id
    }

    /// Copy of the live snapshot.
    pub fn live_state(&self) -> RoomState {
        self.inner.live().clone()
    }

    /// Copy of the historical snapshot.
    pub fn back_state(&self) -> RoomState {
        self.back().clone()
    }

    /// Members of the live snapshot, ordered by user id.
    pub fn members(&self) -> Vec<RoomMember> {
        self.inner.live().members().cloned().collect()
    }

    /// A member of the live snapshot.
    pub fn member(&self, user_id: &UserId) -> Option<RoomMember> {
        self.inner.live().member(user_id).cloned()
    }

    /// Display name as seen by the syncing user.
    pub fn name(&self) -> String {
        self.inner.live().display_name(self.ctx().self_user_id())
    }

    /// Live topic.
    pub fn topic(&self) -> Option<String> {
        self.inner.live().topic.clone()
    }

    /// Live join rule.
    pub fn visibility(&self) -> Option<String> {
        self.inner.live().visibility.clone()
    }

    /// Whether the live state has been fully applied.
    pub fn is_ready(&self) -> bool {
        self.inner.gate().is_ready()
    }

    /// Whether older history may still exist.
    pub fn can_still_paginate(&self) -> bool {
        self.inner.gate().can_paginate()
    }

    /// Whether a history request is running.
    pub fn is_paginating(&self) -> bool {
        self.inner.gate().is_in_flight()
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Restart history from the current live state.
    pub fn init_history(&self) {
        let live = self.live_state();
        *self.snapshot_mut(EventDirection::Backwards) = live;
        self.inner.gate().reset_history();
    }

    /// Fold a state event into the snapshot selected by `direction`.
    pub fn process_state_event(&self, event: &Event, direction: EventDirection) {
        self.snapshot_mut(direction).apply(event);
    }

    /// Apply the room's full live state, then mark the room ready.
    pub fn process_live_state(&self, events: &[Event]) {
        {
            let mut live = self.snapshot_mut(EventDirection::Forwards);
            for event in events {
                live.apply(event);
            }
        }
        self.inner.gate().mark_ready();
    }

    /// Apply an initial sync response: store its messages, apply its state
    /// as live state and refresh the summary.
    ///
    /// Presence events in the response are not handled here.
    pub async fn apply_initial_response(&self, response: &RoomResponse) {
        let ctx = self.ctx();
        let latest = response
            .messages
            .as_ref()
            .and_then(|messages| messages.chunk.last().cloned());

        if let Some(messages) = &response.messages {
            ctx.store()
                .store_room_events(self.room_id(), messages, EventDirection::Forwards)
                .await;
        }
        self.process_live_state(&response.state);

        let live = self.live_state();
        ctx.store()
            .store_summary(self.room_id(), latest.as_ref(), &live, ctx.self_user_id())
            .await;

        tracing::debug!(
            room_id = %self.room_id(),
            state_events = response.state.len(),
            "applied initial sync"
        );
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Fetch the page of history before the historical snapshot's token.
    ///
    /// Skips without fetching while another request runs, once history is
    /// exhausted, or before the room is ready. Each fetched event is applied
    /// to the historical snapshot and dispatched as a back event.
    pub async fn request_history(&self) -> Result<HistoryOutcome, ApiError> {
        let begin = self.inner.gate().try_begin();
        if let Err(reason) = begin {
            tracing::debug!(room_id = %self.room_id(), %reason, "history request skipped");
            return Ok(HistoryOutcome::Skipped(reason));
        }
        let mut in_flight = InFlight {
            gate: &self.inner.gate,
            outcome: PageOutcome::Failed,
        };

        let token = self.back().token().map(str::to_string);
        let result = self
            .ctx()
            .retriever()
            .request_room_history(self.room_id(), token.as_deref())
            .await;

        match result {
            Ok(page) => {
                self.snapshot_mut(EventDirection::Backwards)
                    .set_token(page.end.clone());

                for event in &page.chunk {
                    let state = {
                        let mut back = self.snapshot_mut(EventDirection::Backwards);
                        if event.is_state() {
                            back.apply(event);
                        }
                        back.clone()
                    };
                    self.ctx().bus().on_back_event(event, &state);
                }

                let count = page.len();
                if count == 0 {
                    tracing::info!(room_id = %self.room_id(), "reached start of history");
                }
                in_flight.outcome = PageOutcome::Retrieved(count);
                Ok(HistoryOutcome::Retrieved(count))
            }
            Err(e) => {
                if e.is_unknown_token() {
                    tracing::info!(room_id = %self.room_id(), "history token rejected, no more history");
                    in_flight.outcome = PageOutcome::TokenRejected;
                } else {
                    tracing::warn!(room_id = %self.room_id(), error = %e, "history request failed");
                }
                Err(e)
            }
        }
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Attach a listener to this room's events.
    ///
    /// Presence is forwarded for live members only, live events once the
    /// room is ready, back events for this room.
    pub fn add_event_listener(&self, listener: Arc<dyn EventListener>) -> SubscriptionId {
        let adapter = Arc::new(RoomScopedListener {
            room: Arc::downgrade(&self.inner),
            target: Arc::clone(&listener),
        });
        let subscription = self.ctx().bus().subscribe(adapter);
        self.listeners().push(Registration {
            listener,
            subscription,
        });
        subscription
    }

    /// Detach every adapter registered for `listener`. Returns whether any
    /// was found.
    pub fn remove_event_listener(&self, listener: &Arc<dyn EventListener>) -> bool {
        let removed: Vec<SubscriptionId> = {
            let mut listeners = self.listeners();
            let mut removed = Vec::new();
            listeners.retain(|r| {
                if same_listener(&r.listener, listener) {
                    removed.push(r.subscription);
                    false
                } else {
                    true
                }
            });
            removed
        };
        for subscription in &removed {
            self.ctx().bus().unsubscribe(*subscription);
        }
        !removed.is_empty()
    }

    /// Detach all of this room's listeners from the bus.
    pub fn close(&self) {
        let registrations: Vec<Registration> = self.listeners().drain(..).collect();
        for registration in registrations {
            self.ctx().bus().unsubscribe(registration.subscription);
        }
    }

    // =========================================================================
    // Server Operations
    // =========================================================================

    /// Send a message. Returns the event echoed by the server.
    pub async fn send_message(&self, content: &MessageContent) -> Result<Event, ApiError> {
        let txn_id = TransactionId::new();
        self.ctx()
            .api()
            .send_message(self.room_id(), &txn_id, content)
            .await
    }

    /// Invite a user.
    pub async fn invite(&self, user_id: &UserId) -> Result<(), ApiError> {
        self.ctx().api().invite_to_room(self.room_id(), user_id).await
    }

    /// Join the room, then load its initial state.
    pub async fn join(&self) -> Result<(), ApiError> {
        self.ctx().api().join_room(self.room_id()).await?;
        tracing::info!(room_id = %self.room_id(), "joined room");
        self.initial_sync().await
    }

    /// Load the room's current state, recent messages and member presence.
    pub async fn initial_sync(&self) -> Result<(), ApiError> {
        let response = self.ctx().api().initial_sync(self.room_id()).await?;
        self.apply_initial_response(&response).await;
        for event in &response.presence {
            self.ctx().process_presence(event).await;
        }
        Ok(())
    }

    /// Leave the room.
    pub async fn leave(&self) -> Result<(), ApiError> {
        self.ctx().api().leave_room(self.room_id()).await?;
        tracing::info!(room_id = %self.room_id(), "left room");
        Ok(())
    }

    /// Kick a user.
    pub async fn kick(&self, user_id: &UserId) -> Result<(), ApiError> {
        self.ctx().api().kick_from_room(self.room_id(), user_id).await
    }

    /// Ban a user.
    pub async fn ban(&self, user_id: &UserId, reason: Option<&str>) -> Result<(), ApiError> {
        self.ctx()
            .api()
            .ban_from_room(self.room_id(), user_id, reason)
            .await
    }

    /// Lift a ban.
    ///
    /// Issues the same call as [`Room::kick`]; there is no dedicated unban
    /// request.
    pub async fn unban(&self, user_id: &UserId) -> Result<(), ApiError> {
        self.kick(user_id).await
    }

    /// Set the room name.
    pub async fn update_name(&self, name: &str) -> Result<(), ApiError> {
        self.ctx().api().update_name(self.room_id(), name).await
    }

    /// Set the room topic.
    pub async fn update_topic(&self, topic: &str) -> Result<(), ApiError> {
        self.ctx().api().update_topic(self.room_id(), topic).await
    }

    /// Redact an event. Returns the redaction event echoed by the server.
    pub async fn redact(&self, event_id: &EventId) -> Result<Event, ApiError> {
        self.ctx().api().redact(self.room_id(), event_id).await
    }
}
