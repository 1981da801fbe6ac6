//! # roomsync-client
//!
//! Room synchronization engine for chat-protocol clients.
//!
//! Keeps a live and a historical view of every room, serves history from
//! the local store before going to the network, and fans events out to
//! listeners once rooms are ready.
//!
//! ## Features
//!
//! - **Two snapshots per room**: live and historical state, folded by the
//!   same reducer from `roomsync-core`
//! - **Store-first history**: cached pages are served locally, network
//!   pages are de-duplicated at the pagination boundary and stored
//! - **Serialized pagination**: one history request per room at a time
//! - **Pluggable collaborators**: `Store` and `RoomsApi` traits with
//!   in-memory and mock implementations
//!
//! ## Example
//!
//! ```ignore
//! use roomsync_client::{ClientConfig, MemoryStore, MockRoomsApi, SyncEngine};
//!
//! let config = ClientConfig::new("@alice:example.org");
//! let engine = SyncEngine::new(&config, Arc::new(MockRoomsApi::new()), Arc::new(MemoryStore::new()));
//!
//! let room = engine.join_room(&room_id).await?;
//! room.init_history();
//! room.request_history().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bus;
pub mod config;
pub mod engine;
pub mod rest;
pub mod retriever;
pub mod room;
pub mod store;

pub use bus::{BusEvent, ChannelListener, EventBus, EventListener, SubscriptionId};
pub use config::{ClientConfig, ConfigError, HistoryConfig, SessionConfig};
pub use engine::SyncEngine;
pub use rest::{ApiCall, ApiError, MockRoomsApi, RoomsApi};
pub use retriever::HistoryRetriever;
pub use room::{HistoryOutcome, Room, RoomContext};
pub use store::{MemoryStore, Store};
