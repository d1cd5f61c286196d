//! Shared types for the relay server.
//!
//! This module defines:
//! - `ConnId`: a lightweight handle for live connections
//! - `Transport`: which listener accepted a connection
//! - outbound channel aliases between dispatch and per-connection writers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

/// Identifier for a live connection.
///
/// This is intentionally opaque; we just guarantee uniqueness
/// over the lifetime of the process. Never serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u64);

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_conn_id() -> ConnId {
    ConnId(NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed))
}

/// Listener a connection arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    WebSocket,
}

/// One encoded JSON document on its way to a single peer.
///
/// Shared between all recipients of a fan-out; each writer adds its own
/// framing (newline for TCP, text frame for WebSocket).
pub type Frame = Arc<str>;

/// Bounded per-connection outbound queue. Dispatch only ever `try_send`s.
pub type OutboundTx = mpsc::Sender<Frame>;
pub type OutboundRx = mpsc::Receiver<Frame>;
