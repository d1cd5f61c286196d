//! Outbound payloads.
//!
//! Everything the hub writes is one of:
//!
//! - [`TcpAck`]: reply to the TCP peer that sent a line, tagged `status`.
//! - [`FrontendEvent`]: event for WebSocket frontends, tagged `type`.
//! - [`PositionBroadcast`]: untagged `{fen_str, timestamp, source}`.
//! - [`RobotCommand`]: command line for robots, synthesized from AI moves.
//! - [`game_event_payload`]: AI game notices relayed to frontends.
//!
//! Timestamps are ISO-8601 UTC with millisecond precision
//! (`2025-01-01T12:00:00.000Z`).

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};
use relay_core::{GameEvent, PeerRole};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::wire_types::{
    Source, AI_GOAL_PREFIX, MSG_AI_COMMAND_PROCESSED, MSG_AI_REGISTERED, MSG_AI_REQUEST_SENT,
    MSG_COMMAND_SENT, MSG_FEN_BROADCAST, MSG_ROBOT_REGISTERED,
};

/// UTC instant serialized as ISO-8601.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Timestamp(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Serialize any payload to a compact JSON document.
pub fn encode<T: Serialize + ?Sized>(payload: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(payload)
}

// -----------------------------------------------------------------------------
// TCP acknowledgments
// -----------------------------------------------------------------------------

/// Reply written to the originating TCP peer only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TcpAck {
    RobotRegistered {
        message: String,
        robot_id: Option<String>,
        timestamp: Timestamp,
    },
    AiRegistered {
        message: String,
        ai_id: Option<String>,
        timestamp: Timestamp,
    },
    Success {
        message: String,
        timestamp: Timestamp,
    },
    AiCommandProcessed {
        goal_id: String,
        message: String,
        timestamp: Timestamp,
    },
    Error {
        message: String,
        timestamp: Timestamp,
    },
}

impl TcpAck {
    pub fn registered(role: PeerRole, external_id: Option<String>) -> Self {
        let timestamp = Timestamp::now();
        match role {
            PeerRole::Robot => TcpAck::RobotRegistered {
                message: MSG_ROBOT_REGISTERED.to_string(),
                robot_id: external_id,
                timestamp,
            },
            PeerRole::Ai => TcpAck::AiRegistered {
                message: MSG_AI_REGISTERED.to_string(),
                ai_id: external_id,
                timestamp,
            },
        }
    }

    pub fn fen_broadcast() -> Self {
        TcpAck::Success {
            message: MSG_FEN_BROADCAST.to_string(),
            timestamp: Timestamp::now(),
        }
    }

    pub fn ai_command_processed(goal_id: impl Into<String>) -> Self {
        TcpAck::AiCommandProcessed {
            goal_id: goal_id.into(),
            message: MSG_AI_COMMAND_PROCESSED.to_string(),
            timestamp: Timestamp::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        TcpAck::Error {
            message: message.into(),
            timestamp: Timestamp::now(),
        }
    }
}

// -----------------------------------------------------------------------------
// Frontend events
// -----------------------------------------------------------------------------

/// Typed event pushed to WebSocket frontends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrontendEvent {
    /// A robot reported the outcome of a goal.
    RobotResponse {
        success: Value,
        goal_id: Value,
        /// The robot's original line.
        response: String,
        timestamp: Timestamp,
    },

    /// An AI move was turned into a robot command.
    AiMoveExecuted {
        goal_id: String,
        #[serde(rename = "move")]
        mv: Value,
        ai_id: String,
        timestamp: Timestamp,
    },

    /// Older `best_move` / `evaluation` answer from an AI.
    AiResponse {
        best_move: Value,
        evaluation: Value,
        timestamp: Timestamp,
    },

    /// Acks a frontend's robot command.
    CommandSent {
        goal_id: Value,
        message: String,
        timestamp: Timestamp,
    },

    /// Acks a frontend's analysis request.
    AiRequestSent {
        request_id: Value,
        message: String,
        timestamp: Timestamp,
    },

    /// The frontend's own frame was rejected.
    Error {
        message: String,
        error: String,
        timestamp: Timestamp,
    },
}

impl FrontendEvent {
    pub fn command_sent(goal_id: Value) -> Self {
        FrontendEvent::CommandSent {
            goal_id,
            message: MSG_COMMAND_SENT.to_string(),
            timestamp: Timestamp::now(),
        }
    }

    pub fn ai_request_sent(request_id: Value) -> Self {
        FrontendEvent::AiRequestSent {
            request_id,
            message: MSG_AI_REQUEST_SENT.to_string(),
            timestamp: Timestamp::now(),
        }
    }

    pub fn error(message: impl Into<String>, error: impl Into<String>) -> Self {
        FrontendEvent::Error {
            message: message.into(),
            error: error.into(),
            timestamp: Timestamp::now(),
        }
    }
}

/// Position update for frontends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionBroadcast {
    pub fen_str: String,
    pub timestamp: Timestamp,
    pub source: Source,
}

impl PositionBroadcast {
    pub fn new(fen_str: impl Into<String>, source: Source) -> Self {
        Self {
            fen_str: fen_str.into(),
            timestamp: Timestamp::now(),
            source,
        }
    }
}

/// Build the frontend event for an AI game notice.
///
/// Only the kind's relayed fields are copied; missing ones are `null`,
/// except the kind's defaulted field which becomes `"unknown"`.
pub fn game_event_payload(event: &GameEvent, timestamp: Timestamp) -> Value {
    let mut out = Map::new();
    out.insert("type".into(), Value::from(event.kind.as_str()));

    for &field in event.kind.relayed_fields() {
        let value = match event.fields.get(field) {
            Some(v) if !v.is_null() => v.clone(),
            _ if event.kind.defaulted_field() == Some(field) => Value::from("unknown"),
            _ => Value::Null,
        };
        out.insert(field.to_string(), value);
    }

    out.insert("timestamp".into(), Value::from(timestamp.to_string()));
    Value::Object(out)
}

// -----------------------------------------------------------------------------
// Robot commands
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandHeader {
    pub timestamp: Timestamp,
    pub source: Source,
    pub ai_id: String,
}

/// Command line sent to every registered robot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobotCommand {
    pub goal_id: String,
    pub header: CommandHeader,
    #[serde(rename = "move")]
    pub mv: Value,
}

static GOAL_SEQ: AtomicU32 = AtomicU32::new(0);

impl RobotCommand {
    /// Wrap an AI move into a robot command with a fresh `ai_cmd_` goal id.
    pub fn from_ai_move(mv: Value, ai_id: impl Into<String>) -> Self {
        let timestamp = Timestamp::now();
        Self {
            goal_id: next_ai_goal_id(timestamp),
            header: CommandHeader {
                timestamp,
                source: Source::Ai,
                ai_id: ai_id.into(),
            },
            mv,
        }
    }
}

/// `ai_cmd_<micros % 1e6, 6 digits><sequence % 1000, 3 digits>`.
///
/// The time part keeps ids readable in logs; the sequence keeps two
/// commands issued within the same microsecond apart.
fn next_ai_goal_id(timestamp: Timestamp) -> String {
    let micros = timestamp.0.timestamp_subsec_micros();
    let seq = GOAL_SEQ.fetch_add(1, Ordering::Relaxed) % 1000;
    format!("{}{:06}{:03}", AI_GOAL_PREFIX, micros, seq)
}
