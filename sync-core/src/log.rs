//! Per-room event log for roomsync stores.
//!
//! The log keeps events in insertion order and deduplicates them by event
//! identifier:
//! - Appending an event whose identifier is already present replaces the
//!   stored copy in place (its position does not change)
//! - Events without an identifier are appended but never indexed
//! - The oldest event is the first one inserted
//!
//! The log also carries the pagination token it was initialized with.

use std::collections::HashMap;

use roomsync_types::{Event, EventId};

/// Insertion-ordered, identifier-deduplicated event sequence.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    token: Option<String>,
    events: Vec<Event>,
    index: HashMap<EventId, usize>,
}

impl EventLog {
    /// Create an empty log anchored at `token`.
    pub fn new(token: Option<String>) -> Self {
        Self {
            token,
            events: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// The token this log was initialized with.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Append an event, replacing any stored event with the same identifier.
    ///
    /// Returns `true` if the event was new.
    pub fn append(&mut self, event: Event) -> bool {
        let Some(id) = event.event_id.clone() else {
            self.events.push(event);
            return true;
        };

        match self.index.get(&id) {
            Some(&pos) => {
                self.events[pos] = event;
                false
            }
            None => {
                self.index.insert(id, self.events.len());
                self.events.push(event);
                true
            }
        }
    }

    /// Append every event of `events` in order.
    pub fn extend<I: IntoIterator<Item = Event>>(&mut self, events: I) {
        for event in events {
            self.append(event);
        }
    }

    /// First event by insertion order.
    pub fn oldest(&self) -> Option<&Event> {
        self.events.first()
    }

    /// Look up an event by identifier.
    pub fn get(&self, event_id: &EventId) -> Option<&Event> {
        self.index.get(event_id).map(|&pos| &self.events[pos])
    }

    /// Mutable lookup by identifier.
    pub fn get_mut(&mut self, event_id: &EventId) -> Option<&mut Event> {
        match self.index.get(event_id) {
            Some(&pos) => self.events.get_mut(pos),
            None => None,
        }
    }

    /// Events in insertion order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Event> {
        self.events.iter()
    }

    /// All events, most recently inserted first.
    pub fn newest_first(&self) -> Vec<Event> {
        self.events.iter().rev().cloned().collect()
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
