//! Pagination gate for roomsync rooms.
//!
//! A room may only request history when all three hold:
//! - the room is ready (its live state has been applied)
//! - no other history request is in flight
//! - history has not been exhausted
//!
//! The gate is pure bookkeeping. The client holds it behind a mutex so the
//! check in [`PaginationGate::try_begin`] and the transition to in-flight
//! happen as one step.

use std::fmt;

/// Why a history request was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySkip {
    /// Another request for the same room is still running.
    InFlight,
    /// The start of the room's history has been reached.
    Exhausted,
    /// The room's live state has not been loaded yet.
    NotReady,
}

impl fmt::Display for HistorySkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InFlight => "pagination already in flight",
            Self::Exhausted => "history exhausted",
            Self::NotReady => "room not ready",
        };
        f.write_str(s)
    }
}

/// How an in-flight history request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The request returned this many events. Zero means history is exhausted.
    Retrieved(usize),
    /// The server rejected the token as unknown; history is exhausted.
    TokenRejected,
    /// Any other failure. Retrying later is valid.
    Failed,
}

/// Readiness and pagination flags of a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationGate {
    ready: bool,
    in_flight: bool,
    can_paginate: bool,
}

impl PaginationGate {
    /// A gate for a freshly created room: not ready, idle, paginable.
    pub fn new() -> Self {
        Self {
            ready: false,
            in_flight: false,
            can_paginate: true,
        }
    }

    /// Mark the room ready. Irreversible.
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    /// Whether the room's live state has been applied.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether a history request is running.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Whether older history may still exist.
    pub fn can_paginate(&self) -> bool {
        self.can_paginate
    }

    /// Start history over from live.
    pub fn reset_history(&mut self) {
        self.can_paginate = true;
    }

    /// Check the guards and, if they pass, enter the in-flight state.
    pub fn try_begin(&mut self) -> Result<(), HistorySkip> {
        if self.in_flight {
            return Err(HistorySkip::InFlight);
        }
        if !self.can_paginate {
            return Err(HistorySkip::Exhausted);
        }
        if !self.ready {
            return Err(HistorySkip::NotReady);
        }
        self.in_flight = true;
        Ok(())
    }

    /// Leave the in-flight state, recording how the request ended.
    pub fn finish(&mut self, outcome: PageOutcome) {
        match outcome {
            PageOutcome::Retrieved(0) | PageOutcome::TokenRejected => {
                self.can_paginate = false;
            }
            PageOutcome::Retrieved(_) | PageOutcome::Failed => {}
        }
        self.in_flight = false;
    }
}

impl Default for PaginationGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready_gate() -> PaginationGate {
        let mut gate = PaginationGate::new();
        gate.mark_ready();
        gate
    }

    #[test]
    fn new_gate_is_not_ready() {
        let mut gate = PaginationGate::new();
        assert!(!gate.is_ready());
        assert!(gate.can_paginate());
        assert_eq!(gate.try_begin(), Err(HistorySkip::NotReady));
        assert!(!gate.is_in_flight());
    }

    #[test]
    fn begin_sets_in_flight_and_blocks_second_request() {
        let mut gate = ready_gate();
        assert_eq!(gate.try_begin(), Ok(()));
        assert!(gate.is_in_flight());
        assert_eq!(gate.try_begin(), Err(HistorySkip::InFlight));
    }

    #[test]
    fn retrieved_events_keep_history_open() {
        let mut gate = ready_gate();
        gate.try_begin().unwrap();
        gate.finish(PageOutcome::Retrieved(20));

        assert!(!gate.is_in_flight());
        assert!(gate.can_paginate());
        assert_eq!(gate.try_begin(), Ok(()));
    }

    #[test]
    fn empty_page_exhausts_history() {
        let mut gate = ready_gate();
        gate.try_begin().unwrap();
        gate.finish(PageOutcome::Retrieved(0));

        assert!(!gate.can_paginate());
        assert_eq!(gate.try_begin(), Err(HistorySkip::Exhausted));
    }

    #[test]
    fn rejected_token_exhausts_history() {
        let mut gate = ready_gate();
        gate.try_begin().unwrap();
        gate.finish(PageOutcome::TokenRejected);

        assert!(!gate.is_in_flight());
        assert_eq!(gate.try_begin(), Err(HistorySkip::Exhausted));
    }

    #[test]
    fn failure_clears_in_flight_only() {
        let mut gate = ready_gate();
        gate.try_begin().unwrap();
        gate.finish(PageOutcome::Failed);

        assert!(!gate.is_in_flight());
        assert!(gate.can_paginate());
    }

    #[test]
    fn reset_reopens_exhausted_history() {
        let mut gate = ready_gate();
        gate.try_begin().unwrap();
        gate.finish(PageOutcome::Retrieved(0));

        gate.reset_history();
        assert_eq!(gate.try_begin(), Ok(()));
    }

    #[test]
    fn in_flight_reported_before_exhaustion() {
        let mut gate = ready_gate();
        gate.try_begin().unwrap();
        gate.reset_history();
        assert_eq!(gate.try_begin(), Err(HistorySkip::InFlight));
    }
}
