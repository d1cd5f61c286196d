//! Message variants produced by the classifier.
//!
//! These are **transport-agnostic** logical messages:
//! - [`Message`]: what a TCP peer (robot / AI engine / tooling) sent.
//! - [`FrontendMessage`]: what a frontend sent over the WebSocket.
//!
//! Outbound payloads and their JSON shape live in the `relay-protocol`
//! crate; this module is purely logical.

use serde_json::{Map, Value};

use crate::role::PeerRole;

/// Classified intent of one inbound TCP line.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// `robot_identify` / `ai_identify`.
    Identify(Identify),

    /// Board / check / game-over / illegal-move notice from the AI engine.
    AiGameEvent(GameEvent),

    /// Result of a robot goal: `goal_id` + `success`.
    RobotResult(RobotResult),

    /// New position plus a robot-actionable move from the AI engine.
    AiMoveCommand(AiMoveCommand),

    /// Older `best_move` / `evaluation` AI answer.
    AiLegacyEvaluation(AiLegacyEvaluation),

    /// Plain position update, JSON (`fen_str` / `fen`) or bare FEN text.
    PositionUpdate { fen_str: String },

    /// Anything else. Carries the raw text for logging.
    Unrecognized { raw: String },
}

/// Identity registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identify {
    pub role: PeerRole,

    /// `robot_id` / `ai_id`. `None` when the peer omitted it.
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RobotResult {
    /// Goal identifier, usually a string but kept as sent.
    pub goal_id: Value,

    /// Outcome as sent by the robot (normally a bool).
    pub success: Value,

    /// Original line, forwarded to frontends untouched.
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiMoveCommand {
    pub fen_str: String,

    /// Move description (`type`, `from`, `to`, `from_piece`, ...), forwarded
    /// verbatim to robots.
    pub mv: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiLegacyEvaluation {
    pub best_move: Value,
    pub evaluation: Value,
}

/// Kinds of AI game notices relayed to frontends.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GameEventKind {
    BoardStatus,
    CheckDetected,
    GameOver,
    IllegalMove,
}

impl GameEventKind {
    pub fn from_type(ty: &str) -> Option<Self> {
        match ty {
            "board_status" => Some(GameEventKind::BoardStatus),
            "check_detected" => Some(GameEventKind::CheckDetected),
            "game_over" => Some(GameEventKind::GameOver),
            "illegal_move" => Some(GameEventKind::IllegalMove),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameEventKind::BoardStatus => "board_status",
            GameEventKind::CheckDetected => "check_detected",
            GameEventKind::GameOver => "game_over",
            GameEventKind::IllegalMove => "illegal_move",
        }
    }

    /// Fields copied from the AI notice into the frontend event.
    pub fn relayed_fields(self) -> &'static [&'static str] {
        match self {
            GameEventKind::BoardStatus => {
                &["status", "game_id", "fen", "expected", "detected", "message"]
            }
            GameEventKind::CheckDetected => &["game_id", "player_in_check", "fen_str", "message"],
            GameEventKind::GameOver => &["game_id", "reason", "winner", "fen_str", "message"],
            GameEventKind::IllegalMove => {
                &["game_id", "player", "move", "current_fen", "message"]
            }
        }
    }

    /// Relayed field that falls back to `"unknown"` when missing.
    pub fn defaulted_field(self) -> Option<&'static str> {
        match self {
            GameEventKind::BoardStatus => None,
            GameEventKind::CheckDetected => Some("player_in_check"),
            GameEventKind::GameOver => Some("reason"),
            GameEventKind::IllegalMove => Some("player"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameEvent {
    pub kind: GameEventKind,

    /// The full JSON object as sent by the AI.
    pub fields: Map<String, Value>,
}

/// Classified intent of one inbound WebSocket frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrontendMessage {
    /// `goal_id` + `move`: forward to every robot.
    RobotCommandRequest { goal_id: Value, payload: Value },

    /// `type == "ai_request"` + `fen_position`: forward to every AI engine.
    AiAnalysisRequest {
        request_id: Value,
        fen_position: Value,
        payload: Value,
    },

    /// Anything else: relayed to the other frontends.
    PassThrough(Value),
}
