//! History retrieval: store first, network second.
//!
//! ```text
//! Room → HistoryRetriever → Store (hit: return cached page)
//!                        ↘ RoomsApi (miss: fetch, trim overlap, store, return)
//! ```
//!
//! The server's pagination boundary is inclusive, so a fetched page can
//! start with the event the store already holds as its oldest. That one
//! event is dropped before the page is stored or returned.

use std::sync::Arc;

use roomsync_core::EventDirection;
use roomsync_types::{RoomId, TokensChunk};

use crate::rest::{ApiError, RoomsApi};
use crate::store::Store;

/// Resolves history requests against the store, then the server.
#[derive(Clone)]
pub struct HistoryRetriever {
    store: Arc<dyn Store>,
    api: Arc<dyn RoomsApi>,
    page_size: usize,
}

impl HistoryRetriever {
    /// Create a retriever fetching `page_size` events per network request.
    pub fn new(store: Arc<dyn Store>, api: Arc<dyn RoomsApi>, page_size: usize) -> Self {
        Self {
            store,
            api,
            page_size,
        }
    }

    /// Events older than `token` (`None`: from live), most recent first.
    ///
    /// Errors from the server are returned unchanged; nothing is retried.
    pub async fn request_room_history(
        &self,
        room_id: &RoomId,
        token: Option<&str>,
    ) -> Result<TokensChunk, ApiError> {
        if let Some(cached) = self.store.get_room_events(room_id, token).await {
            tracing::debug!(
                room_id = %room_id,
                events = cached.len(),
                "history served from store"
            );
            return Ok(cached);
        }

        let mut page = self
            .api
            .get_earlier_messages(room_id, token, self.page_size)
            .await?;

        let oldest = self.store.get_oldest_event(room_id).await;
        let overlaps = match (oldest, page.chunk.first()) {
            (Some(oldest), Some(first)) => {
                oldest.event_id.is_some() && oldest.event_id == first.event_id
            }
            _ => false,
        };
        if overlaps {
            let dropped = page.chunk.remove(0);
            tracing::debug!(
                room_id = %room_id,
                event_id = ?dropped.event_id,
                "dropped overlapping event at pagination boundary"
            );
        }

        // A fetched page runs from newer to older, so its `end` is where
        // older history continues. That token anchors a new log.
        let stored = TokensChunk::new(page.end.clone(), page.start.clone(), page.chunk.clone());
        self.store
            .store_room_events(room_id, &stored, EventDirection::Forwards)
            .await;

        tracing::debug!(
            room_id = %room_id,
            events = page.len(),
            "history fetched from server"
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::{ApiCall, MockRoomsApi};
    use crate::store::MemoryStore;
    use roomsync_types::{Event, EventId, EventType, ServerError};

    fn room_id() -> RoomId {
        RoomId::new("!r:hs")
    }

    fn msg(id: &str) -> Event {
        Event::new(id, "!r:hs", EventType::Message, "@a:hs")
    }

    fn page(start: Option<&str>, end: &str, ids: &[&str]) -> TokensChunk {
        TokensChunk::new(
            start.map(str::to_string),
            Some(end.to_string()),
            ids.iter().map(|id| msg(id)).collect(),
        )
    }

    fn setup() -> (HistoryRetriever, Arc<MemoryStore>, MockRoomsApi) {
        let store = Arc::new(MemoryStore::new());
        let api = MockRoomsApi::new();
        let retriever = HistoryRetriever::new(store.clone(), Arc::new(api.clone()), 20);
        (retriever, store, api)
    }

    fn ids(page: &TokensChunk) -> Vec<EventId> {
        page.chunk.iter().filter_map(|e| e.event_id.clone()).collect()
    }

    #[tokio::test]
    async fn cache_hit_skips_network() {
        let (retriever, store, api) = setup();
        store
            .store_room_events(&room_id(), &page(Some("s0"), "e0", &["$1", "$2"]), EventDirection::Forwards)
            .await;

        let result = retriever.request_room_history(&room_id(), None).await.unwrap();

        assert_eq!(ids(&result), vec![EventId::new("$2"), EventId::new("$1")]);
        assert_eq!(result.end.as_deref(), Some("s0"));
        assert_eq!(api.history_requests(), 0);
    }

    #[tokio::test]
    async fn cache_miss_fetches_and_stores() {
        let (retriever, store, api) = setup();
        api.queue_history(page(Some("s1"), "e1", &["$3", "$2"]));

        let result = retriever.request_room_history(&room_id(), None).await.unwrap();

        assert_eq!(ids(&result), vec![EventId::new("$3"), EventId::new("$2")]);
        assert_eq!(store.event_count(&room_id()), Some(2));
        // The new log continues from the older side of the page
        assert_eq!(store.room_token(&room_id()).as_deref(), Some("e1"));
        assert_eq!(
            api.last_call(),
            Some(ApiCall::GetEarlierMessages {
                room_id: room_id(),
                from: None,
                limit: 20
            })
        );
    }

    #[tokio::test]
    async fn cached_page_after_fetch_points_past_it() {
        let (retriever, _store, api) = setup();
        api.queue_history(page(Some("live"), "t2", &["$2", "$1"]));
        retriever.request_room_history(&room_id(), None).await.unwrap();

        let cached = retriever.request_room_history(&room_id(), None).await.unwrap();

        assert_eq!(cached.end.as_deref(), Some("t2"));
        assert_eq!(api.history_requests(), 1);
    }

    #[tokio::test]
    async fn token_request_goes_to_network() {
        let (retriever, store, api) = setup();
        store
            .store_room_events(&room_id(), &page(Some("s0"), "e0", &["$5"]), EventDirection::Forwards)
            .await;
        api.queue_history(page(None, "e2", &["$4"]));

        retriever
            .request_room_history(&room_id(), Some("s0"))
            .await
            .unwrap();

        assert_eq!(api.history_requests(), 1);
    }

    #[tokio::test]
    async fn overlapping_first_event_is_dropped_once() {
        let (retriever, store, api) = setup();
        store
            .store_room_events(&room_id(), &page(Some("s0"), "e0", &["e1"]), EventDirection::Forwards)
            .await;
        api.queue_history(page(None, "e2", &["e1", "e2", "e3"]));

        let result = retriever
            .request_room_history(&room_id(), Some("s0"))
            .await
            .unwrap();

        assert_eq!(ids(&result), vec![EventId::new("e2"), EventId::new("e3")]);
        assert_eq!(store.event_count(&room_id()), Some(3));
        let cached = store.get_room_events(&room_id(), None).await.unwrap();
        let e1_copies = cached
            .chunk
            .iter()
            .filter(|e| e.event_id == Some(EventId::new("e1")))
            .count();
        assert_eq!(e1_copies, 1);
    }

    #[tokio::test]
    async fn non_matching_first_event_is_kept() {
        let (retriever, store, api) = setup();
        store
            .store_room_events(&room_id(), &page(Some("s0"), "e0", &["$9"]), EventDirection::Forwards)
            .await;
        api.queue_history(page(None, "e2", &["$8", "$7"]));

        let result = retriever
            .request_room_history(&room_id(), Some("s0"))
            .await
            .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn events_without_ids_never_match() {
        let (retriever, store, api) = setup();
        let mut anonymous = msg("$x");
        anonymous.event_id = None;
        store
            .store_room_events(
                &room_id(),
                &TokensChunk::new(Some("s0".into()), None, vec![anonymous.clone()]),
                EventDirection::Forwards,
            )
            .await;
        api.queue_history(TokensChunk::new(None, Some("e".into()), vec![anonymous]));

        let result = retriever
            .request_room_history(&room_id(), Some("s0"))
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn errors_propagate_unchanged() {
        let (retriever, store, api) = setup();
        let err = ApiError::Protocol(ServerError::new(ServerError::UNKNOWN, "bad token"));
        api.queue_history_error(err.clone());

        let result = retriever.request_room_history(&room_id(), Some("t")).await;

        assert_eq!(result, Err(err));
        assert!(store.event_count(&room_id()).is_none());
    }
}
