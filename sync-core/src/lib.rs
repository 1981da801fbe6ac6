//! # roomsync-core
//!
//! Pure logic for roomsync (no I/O, instant tests).
//!
//! This crate implements the state reducers and bookkeeping for room
//! synchronization without any network or storage I/O.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same events → same snapshot)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (REST calls, stores, listener dispatch) is performed by
//! `roomsync-client`, which drives these types.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod log;
pub mod pagination;
pub mod state;
pub mod summary;

pub use log::EventLog;
pub use pagination::{HistorySkip, PageOutcome, PaginationGate};
pub use state::{apply_state_event, EventDirection, RoomMember, RoomState};
pub use summary::RoomSummary;
