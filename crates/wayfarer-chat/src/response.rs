//! Reply types and the wording of every message the assistant sends.

use serde::{Deserialize, Serialize};
use wayfarer_core::{RequiredField, TravelPackage, TravelRequest};
use wayfarer_providers::notify::render;

/// What kind of turn the reply ends with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    /// More information is needed from the traveler.
    Question,
    /// A package was found.
    Complete,
    /// A provider failed; the traveler may try again.
    Error,
}

/// The assistant's answer to one chat message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(rename = "type")]
    pub kind: ReplyKind,
    pub message: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<TravelPackage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_sent: Option<bool>,
}

impl ChatReply {
    pub fn question(session_id: &str, message: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Question,
            message: message.into(),
            session_id: session_id.to_string(),
            package: None,
            email_sent: None,
        }
    }

    pub fn error(session_id: &str, message: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Error,
            message: message.into(),
            session_id: session_id.to_string(),
            package: None,
            email_sent: None,
        }
    }

    pub fn complete(
        session_id: &str,
        request: &TravelRequest,
        package: TravelPackage,
        email_sent: bool,
    ) -> Self {
        Self {
            kind: ReplyKind::Complete,
            message: complete_message(request, &package, email_sent),
            session_id: session_id.to_string(),
            package: Some(package),
            email_sent: Some(email_sent),
        }
    }
}

pub const EXTRACTION_FAILED: &str = "I'm sorry, I didn't understand that. Could you please tell me where you'd like to travel from and to?";

pub const SEARCH_FAILED: &str =
    "I couldn't reach the travel search service just now. Please try again in a moment.";

/// Question for the most important missing field.
pub fn follow_up_question(request: &TravelRequest) -> String {
    match request.missing_fields().first() {
        Some(field) => question_for(*field).to_string(),
        None => "Is there anything else you'd like to change before I search?".to_string(),
    }
}

pub fn question_for(field: RequiredField) -> &'static str {
    match field {
        RequiredField::Origin => "Where would you like to travel from?",
        RequiredField::Destination => "Where would you like to go?",
        RequiredField::DepartureDate => "When would you like to depart?",
        RequiredField::DurationDays => {
            "How long would you like to stay? (e.g., '3 days' or 'returning 2026-11-09')"
        }
        RequiredField::TravelerEmail => {
            "What's your email address so I can send you the booking details?"
        }
    }
}

fn route(request: &TravelRequest) -> String {
    format!(
        "{} to {}",
        request.origin.as_deref().unwrap_or("your origin"),
        request.destination.as_deref().unwrap_or("your destination")
    )
}

/// Asks the traveler to relax their constraints.
pub fn no_viable_package(request: &TravelRequest) -> String {
    let date = request
        .departure_date
        .map(|d| format!(" on {}", d.format("%B %d, %Y")))
        .unwrap_or_default();
    match &request.budget {
        Some(budget) => format!(
            "I couldn't find a package from {}{} within your budget of {}. Could you raise the budget or try different dates?",
            route(request),
            date,
            budget
        ),
        None => format!(
            "I couldn't find a package from {}{}. Could you try different dates?",
            route(request),
            date
        ),
    }
}

/// Asks for the budget again in the currency prices are quoted in.
pub fn budget_currency_mismatch(request: &TravelRequest, currency: &str) -> String {
    match &request.budget {
        Some(budget) => format!(
            "I can only price trips in {currency}, but your budget is {budget}. What is your budget in {currency}?"
        ),
        None => format!("What is your budget in {currency}?"),
    }
}

/// Reply to a booked session when the message changed nothing.
pub fn already_booked(request: &TravelRequest) -> String {
    format!(
        "Your trip from {} is already booked. Tell me what you'd like to change, or clear the session to plan a new trip.",
        route(request)
    )
}

fn complete_message(request: &TravelRequest, package: &TravelPackage, email_sent: bool) -> String {
    let email = request.traveler_email.as_deref().unwrap_or("you");
    let delivery = if email_sent {
        format!("I've sent the complete details with booking links to {}.", email)
    } else {
        format!("I couldn't email the details to {}, so keep this summary handy.", email)
    };
    format!(
        "Perfect! I found a great travel package for you:\n\n{}\n\n{}\n\nWant to change anything? Just tell me.",
        render::text_body(request, package),
        delivery
    )
}
