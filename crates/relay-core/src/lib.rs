//! relay-core
//!
//! Pure relay hub logic:
//! - peer roles (robot, AI engine, frontend)
//! - classified message variants
//! - bare-FEN heuristic
//! - the message classifier

pub mod role;
pub mod message;
pub mod fen;
pub mod classifier;
pub mod error;

pub use role::{PeerRole, Role};

pub use message::{
    AiLegacyEvaluation,
    AiMoveCommand,
    FrontendMessage,
    GameEvent,
    GameEventKind,
    Identify,
    Message,
    RobotResult,
};

pub use classifier::{classify, classify_frontend};
pub use error::ClassifyError;
