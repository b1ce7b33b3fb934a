//! Multi-turn trip dialogue.
//!
//! Accumulates a [`wayfarer_core::TravelRequest`] across chat turns, decides
//! when to ask, search or send, and keeps per-session state in memory.

pub mod error;
pub mod orchestrator;
pub mod response;
pub mod session;

pub use error::ChatError;
pub use orchestrator::TripOrchestrator;
pub use response::{ChatReply, ReplyKind};
pub use session::{
    validate_transition, ChatMessage, ChatRole, Session, SessionPhase, SessionSnapshot,
    SessionStore,
};
