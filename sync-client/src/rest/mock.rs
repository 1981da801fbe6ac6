//! Mock REST client for testing.
//!
//! Allows queueing responses, injecting failures, holding history requests
//! open, and capturing every call for verification.

use super::{ApiError, RoomsApi};
use async_trait::async_trait;
use roomsync_types::{
    Event, EventId, EventType, MessageContent, RoomId, RoomResponse, TokensChunk, TransactionId,
    UserId,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// A call made against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    /// `get_earlier_messages`
    GetEarlierMessages {
        /// Room.
        room_id: RoomId,
        /// Token requested from.
        from: Option<String>,
        /// Page size.
        limit: usize,
    },
    /// `send_message`
    SendMessage {
        /// Room.
        room_id: RoomId,
        /// Content sent.
        content: MessageContent,
    },
    /// `join_room`
    Join(RoomId),
    /// `initial_sync`
    InitialSync(RoomId),
    /// `invite_to_room`
    Invite(RoomId, UserId),
    /// `leave_room`
    Leave(RoomId),
    /// `kick_from_room`
    Kick(RoomId, UserId),
    /// `ban_from_room`
    Ban(RoomId, UserId, Option<String>),
    /// `update_name`
    UpdateName(RoomId, String),
    /// `update_topic`
    UpdateTopic(RoomId, String),
    /// `redact`
    Redact(RoomId, EventId),
}

/// Mock REST client for testing.
///
/// Clones share state, so a test can keep one handle while the engine
/// owns another.
#[derive(Debug, Default, Clone)]
pub struct MockRoomsApi {
    inner: Arc<Mutex<MockRoomsApiInner>>,
}

#[derive(Debug, Default)]
struct MockRoomsApiInner {
    calls: Vec<ApiCall>,
    history: VecDeque<Result<TokensChunk, ApiError>>,
    initial_syncs: VecDeque<Result<RoomResponse, ApiError>>,
    fail_next: Option<ApiError>,
    history_hold: Option<Arc<Notify>>,
    echo_counter: u64,
}

impl MockRoomsApi {
    /// Create a new mock.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockRoomsApiInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a page for the next `get_earlier_messages` call.
    pub fn queue_history(&self, page: TokensChunk) {
        self.state().history.push_back(Ok(page));
    }

    /// Queue a failure for the next `get_earlier_messages` call.
    pub fn queue_history_error(&self, error: ApiError) {
        self.state().history.push_back(Err(error));
    }

    /// Queue a response for the next `initial_sync` call.
    pub fn queue_initial_sync(&self, response: RoomResponse) {
        self.state().initial_syncs.push_back(Ok(response));
    }

    /// Cause the next call of any kind to fail with `error`.
    pub fn fail_next(&self, error: ApiError) {
        self.state().fail_next = Some(error);
    }

    /// Make history requests wait until the returned handle is notified.
    ///
    /// The call is recorded before waiting, so tests can observe a request
    /// that is still in flight.
    pub fn hold_history(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.state().history_hold = Some(Arc::clone(&notify));
        notify
    }

    /// Stop holding history requests.
    pub fn release_history(&self) {
        if let Some(hold) = self.state().history_hold.take() {
            hold.notify_waiters();
        }
    }

    /// All calls made so far.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state().calls.clone()
    }

    /// Number of `get_earlier_messages` calls made so far.
    pub fn history_requests(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| matches!(c, ApiCall::GetEarlierMessages { .. }))
            .count()
    }

    /// The last call made.
    pub fn last_call(&self) -> Option<ApiCall> {
        self.state().calls.last().cloned()
    }

    /// Clear all state (calls, queues, failures).
    pub fn reset(&self) {
        *self.state() = MockRoomsApiInner::default();
    }

    /// Record a call and consume a forced failure, if any.
    fn record(&self, call: ApiCall) -> Result<(), ApiError> {
        let mut inner = self.state();
        inner.calls.push(call);
        match inner.fail_next.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn echo(&self, room_id: &RoomId, event_type: EventType, content: serde_json::Value) -> Event {
        let mut inner = self.state();
        inner.echo_counter += 1;
        Event::new(
            format!("$echo{}", inner.echo_counter),
            room_id.clone(),
            event_type,
            "@mock:localhost",
        )
        .with_content(content)
    }
}

#[async_trait]
impl RoomsApi for MockRoomsApi {
    async fn get_earlier_messages(
        &self,
        room_id: &RoomId,
        from: Option<&str>,
        limit: usize,
    ) -> Result<TokensChunk, ApiError> {
        self.record(ApiCall::GetEarlierMessages {
            room_id: room_id.clone(),
            from: from.map(str::to_string),
            limit,
        })?;

        let hold = self.state().history_hold.clone();
        if let Some(hold) = hold {
            // A created `Notified` already sees `notify_waiters`, so a release
            // after the re-check below cannot be missed.
            let notified = hold.notified();
            let still_held = self
                .state()
                .history_hold
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &hold));
            if still_held {
                notified.await;
            }
        }

        self.state()
            .history
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("no queued history".into())))
    }

    async fn send_message(
        &self,
        room_id: &RoomId,
        _txn_id: &TransactionId,
        content: &MessageContent,
    ) -> Result<Event, ApiError> {
        self.record(ApiCall::SendMessage {
            room_id: room_id.clone(),
            content: content.clone(),
        })?;
        let body = serde_json::to_value(content).map_err(|e| ApiError::Unexpected(e.to_string()))?;
        Ok(self.echo(room_id, EventType::Message, body))
    }

    async fn join_room(&self, room_id: &RoomId) -> Result<(), ApiError> {
        self.record(ApiCall::Join(room_id.clone()))
    }

    async fn initial_sync(&self, room_id: &RoomId) -> Result<RoomResponse, ApiError> {
        self.record(ApiCall::InitialSync(room_id.clone()))?;
        self.state()
            .initial_syncs
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network("no queued initial sync".into())))
    }

    async fn invite_to_room(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), ApiError> {
        self.record(ApiCall::Invite(room_id.clone(), user_id.clone()))
    }

    async fn leave_room(&self, room_id: &RoomId) -> Result<(), ApiError> {
        self.record(ApiCall::Leave(room_id.clone()))
    }

    async fn kick_from_room(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), ApiError> {
        self.record(ApiCall::Kick(room_id.clone(), user_id.clone()))
    }

    async fn ban_from_room(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
        reason: Option<&str>,
    ) -> Result<(), ApiError> {
        self.record(ApiCall::Ban(
            room_id.clone(),
            user_id.clone(),
            reason.map(str::to_string),
        ))
    }

    async fn update_name(&self, room_id: &RoomId, name: &str) -> Result<(), ApiError> {
        self.record(ApiCall::UpdateName(room_id.clone(), name.to_string()))
    }

    async fn update_topic(&self, room_id: &RoomId, topic: &str) -> Result<(), ApiError> {
        self.record(ApiCall::UpdateTopic(room_id.clone(), topic.to_string()))
    }

    async fn redact(&self, room_id: &RoomId, event_id: &EventId) -> Result<Event, ApiError> {
        self.record(ApiCall::Redact(room_id.clone(), event_id.clone()))?;
        Ok(self
            .echo(room_id, EventType::Redaction, serde_json::json!({}))
            .with_redacts(event_id.clone()))
    }
}
