//! Event bus for roomsync.
//!
//! The bus fans out presence updates, live events and back (pagination)
//! events to every registered [`EventListener`]. It is constructed
//! explicitly and handed to each room, so separate engines (and separate
//! tests) never share listeners.
//!
//! Dispatch works on a snapshot of the registry taken outside the lock, so
//! a listener may subscribe or unsubscribe from inside a callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use roomsync_core::RoomState;
use roomsync_types::{Event, User};
use tokio::sync::mpsc;

/// Receives events from the bus. All methods default to doing nothing.
pub trait EventListener: Send + Sync {
    /// A user's presence changed.
    fn on_presence_update(&self, _event: &Event, _user: &User) {}

    /// A live event arrived; `state` is the room's live state after it.
    fn on_live_event(&self, _event: &Event, _state: &RoomState) {}

    /// A historical event was paginated in; `state` is the room's historical
    /// state as of that event.
    fn on_back_event(&self, _event: &Event, _state: &RoomState) {}
}

/// Handle identifying one registration on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    listener: Arc<dyn EventListener>,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    subscriptions: Mutex<Vec<Subscription>>,
}

/// Process-level event dispatcher, cheap to clone.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    fn subscriptions(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Vec<Arc<dyn EventListener>> {
        self.subscriptions()
            .iter()
            .map(|s| Arc::clone(&s.listener))
            .collect()
    }

    /// Register a listener.
    pub fn subscribe(&self, listener: Arc<dyn EventListener>) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions().push(Subscription { id, listener });
        id
    }

    /// Remove a registration. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.subscriptions().len()
    }

    /// Dispatch a presence update.
    pub fn on_presence_update(&self, event: &Event, user: &User) {
        for listener in self.snapshot() {
            listener.on_presence_update(event, user);
        }
    }

    /// Dispatch a live event.
    pub fn on_live_event(&self, event: &Event, state: &RoomState) {
        for listener in self.snapshot() {
            listener.on_live_event(event, state);
        }
    }

    /// Dispatch a back event.
    pub fn on_back_event(&self, event: &Event, state: &RoomState) {
        for listener in self.snapshot() {
            listener.on_back_event(event, state);
        }
    }
}

/// An event delivered through a [`ChannelListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// See [`EventListener::on_presence_update`].
    Presence {
        /// The presence event.
        event: Event,
        /// The user it describes.
        user: User,
    },
    /// See [`EventListener::on_live_event`].
    Live {
        /// The event.
        event: Event,
        /// Live state after the event.
        state: RoomState,
    },
    /// See [`EventListener::on_back_event`].
    Back {
        /// The event.
        event: Event,
        /// Historical state as of the event.
        state: RoomState,
    },
}

/// Listener that forwards every callback into an unbounded channel.
///
/// Useful for consumers that prefer to await events rather than be called
/// back. Sends to a closed channel are dropped.
#[derive(Debug)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<BusEvent>,
}

impl ChannelListener {
    /// Create a listener and the receiving end of its channel.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<BusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl EventListener for ChannelListener {
    fn on_presence_update(&self, event: &Event, user: &User) {
        let _ = self.tx.send(BusEvent::Presence {
            event: event.clone(),
            user: user.clone(),
        });
    }

    fn on_live_event(&self, event: &Event, state: &RoomState) {
        let _ = self.tx.send(BusEvent::Live {
            event: event.clone(),
            state: state.clone(),
        });
    }

    fn on_back_event(&self, event: &Event, state: &RoomState) {
        let _ = self.tx.send(BusEvent::Back {
            event: event.clone(),
            state: state.clone(),
        });
    }
}
