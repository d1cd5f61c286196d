//! Error types for the relay server.
//!
//! Only startup can fail: per-message and per-connection problems are
//! answered or logged inside the connection task and never surface here.

use thiserror::Error;

use crate::bind::BindError;
use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The TCP listener could not bind anywhere. WebSocket and HTTP bind
    /// failures are logged and tolerated instead.
    #[error(transparent)]
    Bind(#[from] BindError),
}
