//! Trip field extraction.
//!
//! Defines the `TripExtractor` async trait and its two implementations: a
//! language-model client and an offline regex extractor.

pub mod openai;
pub mod pattern;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wayfarer_core::{RequiredField, TravelRequest, TravelRequestPatch};

use crate::error::ExtractionError;

pub use openai::OpenAiExtractor;
pub use pattern::PatternExtractor;

/// Result of extracting trip fields from one user message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    /// Values found in the message. Fields not mentioned stay `None`.
    pub patch: TravelRequestPatch,
    /// The extractor's view of whether the trip can now be searched.
    pub is_complete: bool,
    pub missing_fields: Vec<RequiredField>,
    pub follow_up_question: Option<String>,
    /// 0.0 to 1.0.
    pub confidence: f32,
}

/// Turns free text into structured trip fields.
#[async_trait]
pub trait TripExtractor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Extract fields from `message`, given what is already known.
    async fn extract(
        &self,
        message: &str,
        known: &TravelRequest,
    ) -> Result<Extraction, ExtractionError>;
}
