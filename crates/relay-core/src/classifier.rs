//! Message classifier.
//!
//! Turns one inbound payload into a [`Message`] (TCP side) or a
//! [`FrontendMessage`] (WebSocket side). Both functions are pure: no I/O,
//! no logging, no shared state.
//!
//! TCP precedence, first match wins:
//!
//! 1. `type == "robot_identify"`                → `Identify { role: Robot }`
//! 2. `type == "ai_identify"`                   → `Identify { role: Ai }`
//! 3. `type` is an AI game notice               → `AiGameEvent`
//! 4. `goal_id` and `success`                   → `RobotResult`
//! 5. `fen_str` and `move`                      → `AiMoveCommand`
//! 6. `best_move` and `evaluation`              → `AiLegacyEvaluation`
//! 7. `fen_str` or `fen`                        → `PositionUpdate`
//! 8. anything else                             → `Unrecognized`
//!
//! Lines that are not JSON objects go through the bare-FEN heuristic
//! ([`crate::fen::looks_like_fen`]).

use serde_json::{Map, Value};

use crate::error::ClassifyError;
use crate::fen::looks_like_fen;
use crate::message::{
    AiLegacyEvaluation, AiMoveCommand, FrontendMessage, GameEvent, GameEventKind, Identify,
    Message, RobotResult,
};
use crate::role::PeerRole;

/// Classify one complete inbound TCP line.
pub fn classify(raw: &[u8]) -> Message {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim();

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(obj)) => classify_object(obj, trimmed),
        Ok(Value::String(inner)) => classify_bare(inner.trim()),
        // Numbers and friends: a lone rank like `8` is valid JSON too.
        Ok(_) | Err(_) => classify_bare(trimmed),
    }
}

fn classify_bare(text: &str) -> Message {
    if looks_like_fen(text) {
        Message::PositionUpdate {
            fen_str: text.to_string(),
        }
    } else {
        Message::Unrecognized {
            raw: text.to_string(),
        }
    }
}

fn classify_object(obj: Map<String, Value>, raw: &str) -> Message {
    let ty = obj.get("type").and_then(Value::as_str);

    for role in [PeerRole::Robot, PeerRole::Ai] {
        if ty == Some(role.identify_type()) {
            return Message::Identify(Identify {
                role,
                external_id: obj.get(role.id_field()).and_then(id_string),
            });
        }
    }

    if let Some(kind) = ty.and_then(GameEventKind::from_type) {
        return Message::AiGameEvent(GameEvent { kind, fields: obj });
    }

    if let (Some(goal_id), Some(success)) = (has_value(&obj, "goal_id"), obj.get("success")) {
        return Message::RobotResult(RobotResult {
            goal_id: goal_id.clone(),
            success: success.clone(),
            raw: raw.to_string(),
        });
    }

    if let (Some(fen), Some(mv)) = (has_value(&obj, "fen_str"), has_value(&obj, "move")) {
        return Message::AiMoveCommand(AiMoveCommand {
            fen_str: text_of(fen),
            mv: mv.clone(),
        });
    }

    if let (Some(best_move), Some(evaluation)) = (present(&obj, "best_move"), obj.get("evaluation"))
    {
        return Message::AiLegacyEvaluation(AiLegacyEvaluation {
            best_move: best_move.clone(),
            evaluation: evaluation.clone(),
        });
    }

    if let Some(fen) = present(&obj, "fen_str").or_else(|| present(&obj, "fen")) {
        return Message::PositionUpdate {
            fen_str: text_of(fen),
        };
    }

    Message::Unrecognized {
        raw: raw.to_string(),
    }
}

/// Classify one WebSocket text frame from a frontend.
///
/// Malformed JSON is an error so the listener can tell the sender; any
/// valid JSON is accepted (unmatched shapes are passed through).
pub fn classify_frontend(text: &str) -> Result<FrontendMessage, ClassifyError> {
    let value: Value = serde_json::from_str(text.trim())?;

    let Value::Object(obj) = &value else {
        return Ok(FrontendMessage::PassThrough(value));
    };

    if let (Some(goal_id), Some(_)) = (present(obj, "goal_id"), present(obj, "move")) {
        let goal_id = goal_id.clone();
        return Ok(FrontendMessage::RobotCommandRequest {
            goal_id,
            payload: value,
        });
    }

    let is_ai_request = obj.get("type").and_then(Value::as_str) == Some("ai_request");
    if let (true, Some(fen_position)) = (is_ai_request, present(obj, "fen_position")) {
        let fen_position = fen_position.clone();
        let request_id = obj.get("request_id").cloned().unwrap_or(Value::Null);
        return Ok(FrontendMessage::AiAnalysisRequest {
            request_id,
            fen_position,
            payload: value,
        });
    }

    Ok(FrontendMessage::PassThrough(value))
}

/// The key exists and is not `null`; an empty string still counts.
fn has_value<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

/// A field counts as present when it exists, is not `null` and is not an
/// empty string.
fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    })
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
