//! Error types for the relay core.
//!
//! TCP classification is infallible by construction: malformed input
//! degrades to [`Message::Unrecognized`](crate::Message::Unrecognized).
//! Only the frontend side reports errors, because a frontend must be told
//! its frame was rejected.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The frame is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
