//! Shared wire constants.
//!
//! Human-readable `message` strings sent alongside each status / event,
//! and the `source` tag on position broadcasts.

use serde::Serialize;

/// Where a broadcast position came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// AI engine move command.
    Ai,

    /// Any other TCP peer (robot vision, tooling, netcat).
    Tcp,
}

pub const MSG_ROBOT_REGISTERED: &str = "Robot registered successfully";
pub const MSG_AI_REGISTERED: &str = "AI registered successfully";
pub const MSG_FEN_BROADCAST: &str = "FEN received and broadcasted";
pub const MSG_AI_COMMAND_PROCESSED: &str = "FEN broadcasted and robot command sent";
pub const MSG_INVALID_FORMAT: &str = "Invalid message format";
pub const MSG_PROCESSING_ERROR: &str = "Server processing error";
pub const MSG_LINE_TOO_LONG: &str = "Line exceeds maximum length";
pub const MSG_COMMAND_SENT: &str = "Command sent to robot";
pub const MSG_AI_REQUEST_SENT: &str = "Request sent to AI";
pub const MSG_AI_COMMAND_SENT: &str = "Command sent to AI";

/// Prefix of goal ids the hub synthesizes for AI-originated robot commands.
pub const AI_GOAL_PREFIX: &str = "ai_cmd_";

/// Fallback `ai_id` when an AI peer sent a move without identifying first.
pub const UNKNOWN_AI_ID: &str = "unknown";
