//! Error types for the trip dialogue.

use wayfarer_providers::{ExtractionError, SearchError};

use crate::session::SessionPhase;

/// Errors from the dialogue engine.
///
/// Only the validation and internal variants ever leave
/// [`TripOrchestrator::handle_message`](crate::TripOrchestrator::handle_message);
/// provider failures are turned into replies.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("invalid session transition: {0} -> {1}")]
    InvalidTransition(SessionPhase, SessionPhase),
    #[error("extraction failed: {0}")]
    ExtractionFailure(#[from] ExtractionError),
    #[error("no viable package: {0}")]
    NoViablePackage(String),
    #[error("search failed: {0}")]
    SearchFailure(#[from] SearchError),
    #[error("storage error: {0}")]
    StorageError(String),
}

impl ChatError {
    /// Whether the error is the caller's fault rather than the service's.
    pub fn is_validation(&self) -> bool {
        matches!(self, ChatError::EmptyMessage | ChatError::MessageTooLong(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(2000).to_string(),
            "message exceeds maximum length of 2000 characters"
        );
        assert_eq!(
            ChatError::SessionNotFound("abc".into()).to_string(),
            "session not found: abc"
        );
        assert_eq!(
            ChatError::InvalidTransition(SessionPhase::Booked, SessionPhase::Ready).to_string(),
            "invalid session transition: booked -> ready"
        );
        assert_eq!(
            ChatError::NoViablePackage("over budget".into()).to_string(),
            "no viable package: over budget"
        );
    }

    #[test]
    fn test_provider_error_conversion() {
        let err: ChatError = ExtractionError::Parse("not json".into()).into();
        assert!(matches!(err, ChatError::ExtractionFailure(_)));
        assert!(err.to_string().contains("not json"));

        let err: ChatError = SearchError::Request("timeout".into()).into();
        assert!(matches!(err, ChatError::SearchFailure(_)));
    }

    #[test]
    fn test_is_validation() {
        assert!(ChatError::EmptyMessage.is_validation());
        assert!(ChatError::MessageTooLong(1).is_validation());
        assert!(!ChatError::StorageError("poisoned".into()).is_validation());
    }
}
