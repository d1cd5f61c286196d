//! relay-protocol
//!
//! Wire-level framing and payloads for the relay hub.
//!
//! This crate turns classified messages (`relay_core::Message`) into the
//! JSON the hub writes back out, and recovers discrete lines from a TCP
//! byte stream.
//!
//! - [`line_codec`] : newline-delimited framing for TCP peers
//! - [`outbound`]   : acknowledgments, frontend events, robot commands
//! - [`wire_types`] : shared wire constants

pub mod wire_types;
pub mod line_codec;
pub mod outbound;

pub use line_codec::{LineBuffer, LineError};
pub use outbound::{
    encode,
    game_event_payload,
    CommandHeader,
    FrontendEvent,
    PositionBroadcast,
    RobotCommand,
    TcpAck,
    Timestamp,
};
pub use wire_types::Source;
