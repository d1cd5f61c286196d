//! Port / address resolution.
//!
//! Each listener walks an ordered list of `(address, port)` candidates and
//! keeps the first one that binds:
//!
//! ```text
//! primary_addr : port, alt_ports[0], alt_ports[1], ...
//! fallback_addr: port, alt_ports[0], alt_ports[1], ...
//! ```
//!
//! Every attempt is bounded by `attempt_timeout` (slow name resolution
//! counts against it). Candidates are bound for real, not probed and
//! released, so nothing can steal the port between check and use.
//!
//! Whether running out of candidates is fatal is the caller's call: the
//! server aborts for TCP and carries on without WebSocket or HTTP.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Tcp,
    WebSocket,
    Http,
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListenerKind::Tcp => "tcp",
            ListenerKind::WebSocket => "websocket",
            ListenerKind::Http => "http",
        })
    }
}

/// Inputs to the candidate search for one listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindPlan {
    pub kind: ListenerKind,
    pub primary_addr: String,
    pub fallback_addr: String,
    pub port: u16,
    pub alt_ports: Vec<u16>,
    pub attempt_timeout: Duration,
}

impl BindPlan {
    /// Candidates in the order they are tried, duplicates removed.
    pub fn candidates(&self) -> Vec<(String, u16)> {
        let mut addrs = vec![self.primary_addr.clone()];
        if self.fallback_addr != self.primary_addr {
            addrs.push(self.fallback_addr.clone());
        }

        let mut ports = vec![self.port];
        for &p in &self.alt_ports {
            if !ports.contains(&p) {
                ports.push(p);
            }
        }

        addrs
            .iter()
            .flat_map(|a| ports.iter().map(move |&p| (a.clone(), p)))
            .collect()
    }
}

/// A bound `(address, port, kind)`. Fixed for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerEndpoint {
    pub kind: ListenerKind,
    pub addr: SocketAddr,
}

#[derive(Debug)]
pub struct BoundListener {
    pub listener: TcpListener,
    pub endpoint: ListenerEndpoint,
}

/// One failed candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindAttempt {
    pub addr: String,
    pub port: u16,
    pub reason: String,
}

#[derive(Debug, Error)]
#[error("no {kind} endpoint could be bound ({} candidates tried)", .attempts.len())]
pub struct BindError {
    pub kind: ListenerKind,
    pub attempts: Vec<BindAttempt>,
}

/// Bind the first candidate of `plan` that succeeds.
pub async fn bind_with_fallback(plan: &BindPlan) -> Result<BoundListener, BindError> {
    let mut attempts = Vec::new();

    for (addr, port) in plan.candidates() {
        match try_bind(&addr, port, plan.attempt_timeout).await {
            Ok((listener, local)) => {
                let endpoint = ListenerEndpoint {
                    kind: plan.kind,
                    addr: local,
                };
                if attempts.is_empty() {
                    info!(listener = %plan.kind, addr = %endpoint.addr, "listener bound");
                } else {
                    warn!(
                        listener = %plan.kind,
                        addr = %endpoint.addr,
                        failed = attempts.len(),
                        "listener bound on alternate endpoint"
                    );
                }
                return Ok(BoundListener { listener, endpoint });
            }
            Err(reason) => {
                debug!(listener = %plan.kind, %addr, port, %reason, "bind attempt failed");
                attempts.push(BindAttempt { addr, port, reason });
            }
        }
    }

    Err(BindError {
        kind: plan.kind,
        attempts,
    })
}

async fn try_bind(
    addr: &str,
    port: u16,
    limit: Duration,
) -> Result<(TcpListener, SocketAddr), String> {
    let listener = match timeout(limit, TcpListener::bind((addr, port))).await {
        Ok(Ok(listener)) => listener,
        Ok(Err(e)) => return Err(e.to_string()),
        Err(_) => return Err(format!("timed out after {:?}", limit)),
    };
    let local = listener.local_addr().map_err(|e| e.to_string())?;
    Ok((listener, local))
}
