//! External collaborators of the dialogue: language-model extraction,
//! flight and accommodation search, and confirmation email delivery.
//!
//! Each concern is an async trait with a live implementation and an offline
//! one, so the orchestrator can run with any subset of credentials.

pub mod error;
pub mod extraction;
pub mod notify;
pub mod search;

pub use error::{DeliveryError, ExtractionError, SearchError};
pub use extraction::{Extraction, OpenAiExtractor, PatternExtractor, TripExtractor};
pub use notify::{DisabledMailer, GmailMailer, Mailer};
pub use search::{AmadeusSearch, MockSearch, TripSearch};
