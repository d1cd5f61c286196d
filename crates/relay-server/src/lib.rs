//! relay-server
//!
//! Message relay hub between three kinds of peers:
//! - frontends over WebSocket,
//! - robot arms over newline-delimited TCP,
//! - chess AI engines over the same TCP listener.
//!
//! Start one with [`server::start`] (tests, embedding) or
//! [`server::run`] (binary, stops on Ctrl-C).

pub mod config;
pub mod error;
pub mod types;
pub mod registry;
pub mod dispatch;
pub mod bind;
pub mod server;
pub mod http;

// listener internals, driven by `server`
mod tcp;
mod ws;

pub use config::Config;
pub use error::RelayError;
pub use server::{start, RelayHandle};
