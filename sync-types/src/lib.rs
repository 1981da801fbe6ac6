//! # roomsync-types
//!
//! Data model for the roomsync room synchronization engine.
//!
//! This crate provides the foundational types used across all roomsync crates:
//! - [`RoomId`], [`UserId`], [`EventId`], [`TransactionId`] - Identity types
//! - [`Event`] and [`EventType`] - The unit of the event stream
//! - Typed event contents ([`MemberContent`], [`RoomNameContent`], ...)
//! - [`TokensChunk`], [`RoomResponse`], [`User`] - Server response shapes
//! - [`ServerError`], [`ModelError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod content;
mod error;
mod event;
mod ids;
mod responses;

pub use content::{
    AliasesContent, CanonicalAliasContent, JoinRulesContent, MemberContent, Membership,
    MessageContent, PresenceContent, RoomNameContent, RoomTopicContent,
};
pub use error::{ModelError, ServerError};
pub use event::{Event, EventType};
pub use ids::{EventId, RoomId, TransactionId, UserId};
pub use responses::{RoomResponse, TokensChunk, User};
