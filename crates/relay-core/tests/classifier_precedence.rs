// crates/relay-core/tests/classifier_precedence.rs
use relay_core::{classify, classify_frontend, FrontendMessage, GameEventKind, Message, PeerRole};
use serde_json::json;

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

fn classify_json(value: serde_json::Value) -> Message {
    classify(value.to_string().as_bytes())
}

#[test]
fn robot_identify_yields_robot_identity() {
    let msg = classify(br#"{"type":"robot_identify","robot_id":"R1"}"#);
    match msg {
        Message::Identify(id) => {
            assert_eq!(id.role, PeerRole::Robot);
            assert_eq!(id.external_id.as_deref(), Some("R1"));
        }
        other => panic!("expected Identify, got {:?}", other),
    }
}

#[test]
fn ai_identify_without_id_still_identifies() {
    match classify(br#"{"type":"ai_identify"}"#) {
        Message::Identify(id) => {
            assert_eq!(id.role, PeerRole::Ai);
            assert_eq!(id.external_id, None);
        }
        other => panic!("expected Identify, got {:?}", other),
    }
}

#[test]
fn identify_wins_over_every_other_field() {
    let msg = classify_json(json!({
        "type": "ai_identify",
        "ai_id": "ai1",
        "goal_id": "g1",
        "success": true,
        "fen_str": START_FEN,
        "move": {"from": "e2", "to": "e4"},
    }));
    assert!(matches!(msg, Message::Identify(_)), "got {:?}", msg);
}

#[test]
fn ai_move_command_never_falls_through() {
    let shapes = [
        json!({"fen_str": START_FEN, "move": {"type": "move", "from": "e2", "to": "e4",
            "from_piece": "white_pawn", "notation": "e4", "results_in_check": false}}),
        json!({"fen_str": START_FEN, "move": {"type": "attack", "from": "d1", "to": "f7",
            "from_piece": "white_queen", "to_piece": "black_pawn", "notation": "Qd1xf7+",
            "results_in_check": true}}),
        // A `fen` alias alongside must not turn it into a plain position update.
        json!({"fen_str": START_FEN, "fen": START_FEN, "move": {"from": "a2", "to": "a3"}}),
        // Neither does a legacy evaluation riding along.
        json!({"fen_str": START_FEN, "move": "e2e4", "best_move": "e2e4", "evaluation": 0.3}),
    ];

    for shape in shapes {
        match classify_json(shape.clone()) {
            Message::AiMoveCommand(cmd) => {
                assert_eq!(cmd.fen_str, START_FEN);
                assert_eq!(cmd.mv, shape["move"]);
            }
            other => panic!("{} classified as {:?}", shape, other),
        }
    }
}

#[test]
fn robot_result_beats_ai_move_command() {
    let msg = classify_json(json!({
        "goal_id": "g7",
        "success": false,
        "fen_str": START_FEN,
        "move": {"from": "e2", "to": "e4"},
    }));
    match msg {
        Message::RobotResult(res) => {
            assert_eq!(res.goal_id, json!("g7"));
            assert_eq!(res.success, json!(false));
            assert!(res.raw.contains("\"goal_id\""));
        }
        other => panic!("expected RobotResult, got {:?}", other),
    }
}

#[test]
fn robot_result_accepts_null_success() {
    let msg = classify(br#"{"goal_id":"g1","success":null}"#);
    assert!(matches!(msg, Message::RobotResult(_)), "got {:?}", msg);
}

#[test]
fn empty_goal_id_is_still_a_robot_result() {
    match classify(br#"{"goal_id":"","success":true}"#) {
        Message::RobotResult(res) => {
            assert_eq!(res.goal_id, json!(""));
            assert_eq!(res.success, json!(true));
        }
        other => panic!("expected RobotResult, got {:?}", other),
    }
}

#[test]
fn empty_fen_str_with_move_is_still_an_ai_move() {
    let msg = classify_json(json!({"fen_str": "", "move": {"from": "e2", "to": "e4"}}));
    match msg {
        Message::AiMoveCommand(cmd) => {
            assert_eq!(cmd.fen_str, "");
            assert_eq!(cmd.mv, json!({"from": "e2", "to": "e4"}));
        }
        other => panic!("expected AiMoveCommand, got {:?}", other),
    }
}

#[test]
fn null_move_is_not_an_ai_move() {
    let msg = classify_json(json!({"fen_str": START_FEN, "move": null}));
    assert_eq!(
        msg,
        Message::PositionUpdate {
            fen_str: START_FEN.to_string()
        }
    );
}

#[test]
fn goal_id_without_success_is_not_a_result() {
    let msg = classify(br#"{"goal_id":"g1"}"#);
    assert!(matches!(msg, Message::Unrecognized { .. }), "got {:?}", msg);
}

#[test]
fn legacy_evaluation_is_recognized() {
    match classify(br#"{"best_move":"e2e4","evaluation":0.35}"#) {
        Message::AiLegacyEvaluation(ev) => {
            assert_eq!(ev.best_move, json!("e2e4"));
            assert_eq!(ev.evaluation, json!(0.35));
        }
        other => panic!("expected AiLegacyEvaluation, got {:?}", other),
    }
}

#[test]
fn fen_str_or_fen_alone_is_position_update() {
    for key in ["fen_str", "fen"] {
        let msg = classify_json(json!({ key: START_FEN }));
        assert_eq!(
            msg,
            Message::PositionUpdate {
                fen_str: START_FEN.to_string()
            }
        );
    }
}

#[test]
fn empty_fen_str_falls_back_to_fen() {
    let msg = classify_json(json!({"fen_str": "", "fen": "8/8/8/8/8/8/8/8"}));
    assert_eq!(
        msg,
        Message::PositionUpdate {
            fen_str: "8/8/8/8/8/8/8/8".to_string()
        }
    );
}

#[test]
fn ai_game_events_are_recognized_after_identity() {
    let cases = [
        ("board_status", GameEventKind::BoardStatus),
        ("check_detected", GameEventKind::CheckDetected),
        ("game_over", GameEventKind::GameOver),
        ("illegal_move", GameEventKind::IllegalMove),
    ];
    for (ty, kind) in cases {
        match classify_json(json!({"type": ty, "game_id": "g", "fen_str": START_FEN})) {
            Message::AiGameEvent(ev) => {
                assert_eq!(ev.kind, kind);
                assert_eq!(ev.fields["game_id"], json!("g"));
            }
            other => panic!("{} classified as {:?}", ty, other),
        }
    }
}

#[test]
fn unknown_object_is_unrecognized() {
    let msg = classify(br#"{"hello":"world"}"#);
    assert!(matches!(msg, Message::Unrecognized { .. }));
}

#[test]
fn bare_start_position_is_position_update() {
    let line = format!("  {}\r\n", START_FEN);
    assert_eq!(
        classify(line.as_bytes()),
        Message::PositionUpdate {
            fen_str: START_FEN.to_string()
        }
    );
}

#[test]
fn garbage_is_unrecognized() {
    match classify(b"not valid json {{{") {
        Message::Unrecognized { raw } => assert_eq!(raw, "not valid json {{{"),
        other => panic!("expected Unrecognized, got {:?}", other),
    }
}

#[test]
fn json_string_holding_fen_is_position_update() {
    let msg = classify(br#""8/8/8/4k3/8/8/8/4K3""#);
    assert_eq!(
        msg,
        Message::PositionUpdate {
            fen_str: "8/8/8/4k3/8/8/8/4K3".to_string()
        }
    );
}

#[test]
fn frontend_robot_command_request() {
    let frame = r#"{"goal_id":"g1","move":{"from":"e2","to":"e4"}}"#;
    match classify_frontend(frame).unwrap() {
        FrontendMessage::RobotCommandRequest { goal_id, payload } => {
            assert_eq!(goal_id, json!("g1"));
            assert_eq!(payload["move"]["to"], json!("e4"));
        }
        other => panic!("expected RobotCommandRequest, got {:?}", other),
    }
}

#[test]
fn frontend_ai_request() {
    let frame = json!({"type": "ai_request", "request_id": "r9", "fen_position": START_FEN});
    match classify_frontend(&frame.to_string()).unwrap() {
        FrontendMessage::AiAnalysisRequest {
            request_id,
            fen_position,
            payload,
        } => {
            assert_eq!(request_id, json!("r9"));
            assert_eq!(fen_position, json!(START_FEN));
            assert_eq!(payload, frame);
        }
        other => panic!("expected AiAnalysisRequest, got {:?}", other),
    }
}

#[test]
fn frontend_ai_request_without_position_passes_through() {
    let frame = json!({"type": "ai_request", "request_id": "r9"});
    assert_eq!(
        classify_frontend(&frame.to_string()).unwrap(),
        FrontendMessage::PassThrough(frame)
    );
}

#[test]
fn frontend_malformed_json_is_an_error() {
    assert!(classify_frontend("{oops").is_err());
}
