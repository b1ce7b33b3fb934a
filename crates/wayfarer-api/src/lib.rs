//! Wayfarer API crate - axum HTTP surface over the trip dialogue.
//!
//! Exposes the chat endpoint, session inspection and deletion, health and
//! configuration status.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
