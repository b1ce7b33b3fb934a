//! Language-model extraction over an OpenAI-compatible chat completions API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wayfarer_core::config::LanguageModelConfig;
use wayfarer_core::{Money, RequiredField, TravelRequest, TravelRequestPatch};

use super::{Extraction, TripExtractor};
use crate::error::{truncate_body, ExtractionError};

const SYSTEM_PROMPT: &str = r#"You are a travel booking assistant. Extract travel information from the user's message.

Already known about this trip:
{known}

Today's date is {today}.

Reply with JSON only, in this exact shape:
{
  "extracted_info": {
    "origin": "city or null",
    "destination": "city or null",
    "departure_date": "YYYY-MM-DD or null",
    "return_date": "YYYY-MM-DD or null",
    "duration_days": "number of days or null",
    "passengers": "number of travelers or null",
    "budget": "number or null",
    "currency": "ISO currency code or null",
    "traveler_email": "email address or null"
  },
  "is_complete": false,
  "missing_fields": ["list of missing required fields"],
  "follow_up_question": "one short question for the most important missing field, or null",
  "confidence": 0.0
}

Required fields: origin, destination, departure_date, duration_days, traveler_email.
Resolve relative dates ("next weekend", "tomorrow") against today's date.
Only report values the user actually gave; use null for anything else."#;

/// Extractor backed by a chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiExtractor {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    endpoint: String,
    default_currency: String,
}

impl OpenAiExtractor {
    pub fn new(
        api_key: impl Into<String>,
        config: &LanguageModelConfig,
        default_currency: &str,
    ) -> Result<Self, ExtractionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            default_currency: default_currency.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatCompletionMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatCompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionContent,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionContent {
    content: Option<String>,
}

#[async_trait]
impl TripExtractor for OpenAiExtractor {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn extract(
        &self,
        message: &str,
        known: &TravelRequest,
    ) -> Result<Extraction, ExtractionError> {
        let prompt = build_system_prompt(known, Local::now().date_naive());
        let body = ChatCompletionRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![
                ChatCompletionMessage {
                    role: "system",
                    content: &prompt,
                },
                ChatCompletionMessage {
                    role: "user",
                    content: message,
                },
            ],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Parse(format!("completion envelope: {}", e)))?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ExtractionError::Parse("empty completion".to_string()))?;

        let extraction = parse_model_reply(&content, &self.default_currency)?;
        tracing::debug!(
            model = %self.model,
            fields_found = !extraction.patch.is_empty(),
            is_complete = extraction.is_complete,
            "Language model extraction finished"
        );
        Ok(extraction)
    }
}

/// Fill the system prompt with the known fields and today's date.
pub fn build_system_prompt(known: &TravelRequest, today: NaiveDate) -> String {
    let known_json = serde_json::to_string_pretty(known).unwrap_or_else(|_| "{}".to_string());
    SYSTEM_PROMPT
        .replace("{known}", &known_json)
        .replace("{today}", &today.format("%Y-%m-%d").to_string())
}

/// Parse the model's JSON reply, tolerating a Markdown code fence around it.
///
/// Individual values that cannot be interpreted (a malformed date, a
/// non-numeric duration) are dropped rather than failing the whole reply.
pub fn parse_model_reply(
    content: &str,
    default_currency: &str,
) -> Result<Extraction, ExtractionError> {
    let json = strip_code_fence(content);
    let root: Value =
        serde_json::from_str(json).map_err(|e| ExtractionError::Parse(e.to_string()))?;
    let root = root
        .as_object()
        .ok_or_else(|| ExtractionError::Parse("reply is not a JSON object".to_string()))?;

    let info = root.get("extracted_info").and_then(Value::as_object);
    let field = |name: &str| info.and_then(|m| m.get(name)).filter(|v| !v.is_null());

    let currency = field("currency")
        .and_then(as_text)
        .filter(|c| c.len() == 3)
        .unwrap_or_else(|| default_currency.to_string());

    let patch = TravelRequestPatch {
        origin: field("origin").and_then(as_text),
        destination: field("destination").and_then(as_text),
        departure_date: field("departure_date").and_then(as_date),
        return_date: field("return_date").and_then(as_date),
        duration_days: field("duration_days").and_then(as_count),
        passengers: field("passengers").and_then(as_count),
        budget: field("budget")
            .and_then(as_number)
            .map(|amount| Money::from_major(amount, &currency)),
        traveler_email: field("traveler_email").and_then(as_text),
    };

    let missing_fields = root
        .get("missing_fields")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .filter_map(RequiredField::parse)
                .collect()
        })
        .unwrap_or_default();

    Ok(Extraction {
        patch,
        is_complete: root
            .get("is_complete")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        missing_fields,
        follow_up_question: root.get("follow_up_question").and_then(as_text),
        confidence: root
            .get("confidence")
            .and_then(Value::as_f64)
            .map(|c| c.clamp(0.0, 1.0) as f32)
            .unwrap_or(0.0),
    })
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

fn as_text(value: &Value) -> Option<String> {
    let text = value.as_str()?.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("null") {
        return None;
    }
    Some(text.to_string())
}

fn as_date(value: &Value) -> Option<NaiveDate> {
    let text = as_text(value)?;
    NaiveDate::parse_from_str(&text, "%Y-%m-%d").ok()
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite() && *n > 0.0)
}

fn as_count(value: &Value) -> Option<u32> {
    let n = as_number(value)?;
    if n.fract() != 0.0 || n > f64::from(u32::MAX) {
        return None;
    }
    Some(n as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_reply() {
        let reply = r#"{
            "extracted_info": {
                "origin": "Porto",
                "destination": "London",
                "departure_date": "2026-10-24",
                "return_date": null,
                "duration_days": 3,
                "passengers": null,
                "budget": 500,
                "currency": "EUR",
                "traveler_email": null
            },
            "is_complete": false,
            "missing_fields": ["traveler_email"],
            "follow_up_question": "What email should I send the trip to?",
            "confidence": 0.9
        }"#;
        let extraction = parse_model_reply(reply, "EUR").unwrap();
        assert_eq!(extraction.patch.origin.as_deref(), Some("Porto"));
        assert_eq!(extraction.patch.destination.as_deref(), Some("London"));
        assert_eq!(
            extraction.patch.departure_date,
            NaiveDate::from_ymd_opt(2026, 10, 24)
        );
        assert_eq!(extraction.patch.duration_days, Some(3));
        assert_eq!(extraction.patch.budget, Some(Money::new(50000, "EUR")));
        assert!(extraction.patch.traveler_email.is_none());
        assert!(!extraction.is_complete);
        assert_eq!(extraction.missing_fields, vec![RequiredField::TravelerEmail]);
        assert_eq!(
            extraction.follow_up_question.as_deref(),
            Some("What email should I send the trip to?")
        );
        assert!((extraction.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "```json\n{\"extracted_info\": {\"destination\": \"Paris\"}, \"is_complete\": false}\n```";
        let extraction = parse_model_reply(reply, "EUR").unwrap();
        assert_eq!(extraction.patch.destination.as_deref(), Some("Paris"));
    }

    #[test]
    fn test_parse_bare_fence_without_language() {
        let reply = "```\n{\"is_complete\": true}\n```";
        let extraction = parse_model_reply(reply, "EUR").unwrap();
        assert!(extraction.is_complete);
        assert!(extraction.patch.is_empty());
    }

    #[test]
    fn test_parse_drops_bad_values() {
        let reply = r#"{
            "extracted_info": {
                "departure_date": "next friday",
                "duration_days": "three",
                "budget": "1,200",
                "origin": "null",
                "passengers": 2.5
            }
        }"#;
        let extraction = parse_model_reply(reply, "GBP").unwrap();
        assert!(extraction.patch.departure_date.is_none());
        assert!(extraction.patch.duration_days.is_none());
        assert!(extraction.patch.origin.is_none());
        assert!(extraction.patch.passengers.is_none());
        assert_eq!(extraction.patch.budget, Some(Money::new(120000, "GBP")));
    }

    #[test]
    fn test_parse_numeric_strings() {
        let reply = r#"{"extracted_info": {"duration_days": "4", "passengers": "2"}}"#;
        let extraction = parse_model_reply(reply, "EUR").unwrap();
        assert_eq!(extraction.patch.duration_days, Some(4));
        assert_eq!(extraction.patch.passengers, Some(2));
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = parse_model_reply("Sure! Where would you like to go?", "EUR");
        assert!(matches!(result, Err(ExtractionError::Parse(_))));
    }

    #[test]
    fn test_parse_non_object() {
        let result = parse_model_reply("[1, 2]", "EUR");
        assert!(matches!(result, Err(ExtractionError::Parse(_))));
    }

    #[test]
    fn test_system_prompt_includes_known_fields_and_date() {
        let known = TravelRequest {
            origin: Some("Porto".into()),
            ..Default::default()
        };
        let prompt = build_system_prompt(&known, NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
        assert!(prompt.contains("\"origin\": \"Porto\""));
        assert!(prompt.contains("Today's date is 2026-10-17."));
        assert!(!prompt.contains("{known}"));
    }

    #[test]
    fn test_new_builds_endpoint() {
        let config = LanguageModelConfig {
            base_url: "http://localhost:11434/v1/".into(),
            ..Default::default()
        };
        let extractor = OpenAiExtractor::new("key", &config, "EUR").unwrap();
        assert_eq!(extractor.endpoint, "http://localhost:11434/v1/chat/completions");
        assert_eq!(extractor.name(), "openai");
    }
}
