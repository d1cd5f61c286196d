//! Peer roles as tracked by the connection registry.

use serde::{Deserialize, Serialize};

/// Role of a live connection.
///
/// TCP peers start as `Unknown` and move to `Robot` or `Ai` once, on their
/// first identity message. WebSocket peers are `Frontend` from accept
/// onwards and never change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Unknown,
    Robot,
    Ai,
    Frontend,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Unknown => "unknown",
            Role::Robot => "robot",
            Role::Ai => "ai",
            Role::Frontend => "frontend",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The subset of roles a peer may register as over TCP.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PeerRole {
    Robot,
    Ai,
}

impl PeerRole {
    /// Identity message `type` value, e.g. `"robot_identify"`.
    pub fn identify_type(self) -> &'static str {
        match self {
            PeerRole::Robot => "robot_identify",
            PeerRole::Ai => "ai_identify",
        }
    }

    /// JSON key carrying the peer-supplied id, e.g. `"robot_id"`.
    pub fn id_field(self) -> &'static str {
        match self {
            PeerRole::Robot => "robot_id",
            PeerRole::Ai => "ai_id",
        }
    }
}

impl From<PeerRole> for Role {
    fn from(role: PeerRole) -> Self {
        match role {
            PeerRole::Robot => Role::Robot,
            PeerRole::Ai => Role::Ai,
        }
    }
}
