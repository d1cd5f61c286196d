//! Connection registry.
//!
//! One map of live connections keyed by [`ConnId`], each tagged with its
//! [`Role`]. A role partition is simply the set of entries with that tag,
//! so partitions are disjoint by construction and removing a connection
//! removes it from whichever partition held it.
//!
//! Lifecycle:
//! - TCP accept      → `insert` as `Unknown`
//! - WebSocket accept → `insert` as `Frontend`
//! - identity line   → `register` (`Unknown` → `Robot` | `Ai`, once)
//! - close / error / failed write → `unregister`
//!
//! Readers take a [`snapshot`](Registry::snapshot) of a partition and fan
//! out without holding the lock.

use std::collections::HashMap;
use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use relay_core::{PeerRole, Role};
use tokio::sync::RwLock;

use crate::types::{ConnId, OutboundTx, Transport};

/// A live connection as the registry sees it.
#[derive(Debug, Clone)]
pub struct Peer {
    pub id: ConnId,
    pub role: Role,

    /// `robot_id` / `ai_id` supplied at registration.
    pub external_id: Option<String>,

    pub transport: Transport,
    pub addr: SocketAddr,
    pub connected_at: DateTime<Utc>,

    /// Queue drained by this connection's writer task.
    pub outbound: OutboundTx,
}

impl Peer {
    pub fn new(id: ConnId, transport: Transport, addr: SocketAddr, outbound: OutboundTx) -> Self {
        let role = match transport {
            Transport::Tcp => Role::Unknown,
            Transport::WebSocket => Role::Frontend,
        };
        Self {
            id,
            role,
            external_id: None,
            transport,
            addr,
            connected_at: Utc::now(),
            outbound,
        }
    }
}

/// Lightweight view handed to the dispatcher.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    pub id: ConnId,
    pub external_id: Option<String>,
    pub outbound: OutboundTx,
}

/// Outcome of an identity message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// `Unknown` → `role`.
    Registered,

    /// Same role again: only the external id was updated.
    Updated { previous: Option<String> },

    /// The connection already holds a different role; nothing changed.
    Conflict { current: Role },

    /// The connection is not (or no longer) in the registry.
    Missing,
}

/// Number of live connections per role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleCounts {
    pub unknown: usize,
    pub robots: usize,
    pub ais: usize,
    pub frontends: usize,
}

impl RoleCounts {
    pub fn total(&self) -> usize {
        self.unknown + self.robots + self.ais + self.frontends
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    peers: RwLock<HashMap<ConnId, Peer>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a freshly accepted connection.
    pub async fn insert(&self, peer: Peer) {
        let mut guard = self.peers.write().await;
        guard.insert(peer.id, peer);
    }

    /// Apply an identity message from `id`.
    ///
    /// First registration wins: the role moves `Unknown` → `role` once and
    /// never changes afterwards. Repeating the same role only refreshes the
    /// external id.
    pub async fn register(
        &self,
        id: ConnId,
        role: PeerRole,
        external_id: Option<String>,
    ) -> Registration {
        let mut guard = self.peers.write().await;
        let Some(peer) = guard.get_mut(&id) else {
            return Registration::Missing;
        };

        let wanted = Role::from(role);
        match peer.role {
            Role::Unknown => {
                peer.role = wanted;
                peer.external_id = external_id;
                Registration::Registered
            }
            current if current == wanted => {
                let previous = std::mem::replace(&mut peer.external_id, external_id);
                Registration::Updated { previous }
            }
            current => Registration::Conflict { current },
        }
    }

    /// Remove `id` from whichever partition holds it. Idempotent.
    pub async fn unregister(&self, id: ConnId) -> Option<Peer> {
        let mut guard = self.peers.write().await;
        guard.remove(&id)
    }

    /// Current members of one partition.
    pub async fn snapshot(&self, role: Role) -> Vec<PeerHandle> {
        let guard = self.peers.read().await;
        let mut members: Vec<PeerHandle> = guard
            .values()
            .filter(|p| p.role == role)
            .map(|p| PeerHandle {
                id: p.id,
                external_id: p.external_id.clone(),
                outbound: p.outbound.clone(),
            })
            .collect();
        // Stable order: oldest connection first.
        members.sort_by_key(|p| p.id);
        members
    }

    pub async fn get(&self, id: ConnId) -> Option<Peer> {
        let guard = self.peers.read().await;
        guard.get(&id).cloned()
    }

    pub async fn counts(&self) -> RoleCounts {
        let guard = self.peers.read().await;
        guard.values().fold(RoleCounts::default(), |mut acc, p| {
            match p.role {
                Role::Unknown => acc.unknown += 1,
                Role::Robot => acc.robots += 1,
                Role::Ai => acc.ais += 1,
                Role::Frontend => acc.frontends += 1,
            }
            acc
        })
    }
}
