//! Error types for the external providers.

/// Errors from field extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Extraction request failed: {0}")]
    Request(String),
    #[error("Language model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Could not parse language model reply: {0}")]
    Parse(String),
}

/// Errors from flight and accommodation search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search provider authentication failed: {0}")]
    Auth(String),
    #[error("Search request failed: {0}")]
    Request(String),
    #[error("Search provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Could not parse search results: {0}")]
    Parse(String),
    #[error("Request is missing required field: {0}")]
    IncompleteRequest(wayfarer_core::RequiredField),
}

/// Errors from confirmation email delivery.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Email delivery is not configured")]
    NotConfigured,
    #[error("No recipient address on the request")]
    MissingRecipient,
    #[error("Email request failed: {0}")]
    Request(String),
    #[error("Email provider rejected the message with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for ExtractionError {
    fn from(err: reqwest::Error) -> Self {
        ExtractionError::Request(err.to_string())
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Request(err.to_string())
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Request(err.to_string())
    }
}

/// Keep provider error bodies short enough for a log line.
pub(crate) fn truncate_body(body: String) -> String {
    const MAX: usize = 512;
    if body.len() <= MAX {
        return body;
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
