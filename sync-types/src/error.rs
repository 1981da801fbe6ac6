//! Error types for roomsync.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error returned by the server.
///
/// Only [`ServerError::UNKNOWN`] is interpreted by the engine (it marks the
/// end of a room's history); every other code is passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{errcode}: {error}")]
pub struct ServerError {
    /// Machine-readable code, e.g. `M_FORBIDDEN`.
    pub errcode: String,
    /// Human-readable description.
    #[serde(default)]
    pub error: String,
}

impl ServerError {
    /// Code returned when a pagination token is unknown or no longer valid.
    pub const UNKNOWN: &'static str = "M_UNKNOWN";
    /// Code returned when the user lacks permission.
    pub const FORBIDDEN: &'static str = "M_FORBIDDEN";

    /// Create a server error.
    pub fn new(errcode: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            errcode: errcode.into(),
            error: error.into(),
        }
    }

    /// Whether this error means the pagination token is unknown/invalid.
    pub fn is_unknown_token(&self) -> bool {
        self.errcode == Self::UNKNOWN
    }
}

/// Errors decoding the data model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Event content did not match the expected shape for its type.
    #[error("invalid {event_type} content: {source}")]
    Content {
        /// Type of the offending event.
        event_type: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}
