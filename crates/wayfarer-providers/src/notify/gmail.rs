//! Gmail REST delivery.
//!
//! Obtaining the OAuth access token is outside this crate; the mailer takes a
//! ready token and posts one base64url-encoded RFC 2822 message per send.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use reqwest::Client;
use serde::Serialize;
use wayfarer_core::config::EmailConfig;
use wayfarer_core::{TravelPackage, TravelRequest};

use super::{render, Mailer};
use crate::error::{truncate_body, DeliveryError};

const BOUNDARY: &str = "wayfarer-alternative-boundary";

pub struct GmailMailer {
    client: Client,
    endpoint: String,
    access_token: String,
    sender: String,
}

#[derive(Serialize)]
struct SendRequest {
    raw: String,
}

impl GmailMailer {
    pub fn new(
        access_token: impl Into<String>,
        sender: impl Into<String>,
        config: &EmailConfig,
    ) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/users/me/messages/send",
                config.api_base_url.trim_end_matches('/')
            ),
            access_token: access_token.into(),
            sender: sender.into(),
        })
    }
}

#[async_trait]
impl Mailer for GmailMailer {
    fn name(&self) -> &'static str {
        "gmail"
    }

    async fn send(
        &self,
        request: &TravelRequest,
        package: &TravelPackage,
    ) -> Result<(), DeliveryError> {
        let recipient = request
            .traveler_email
            .as_deref()
            .ok_or(DeliveryError::MissingRecipient)?;

        let message = build_message(&self.sender, recipient, request, package);
        let body = SendRequest {
            raw: URL_SAFE_NO_PAD.encode(message.as_bytes()),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        tracing::info!(to = %recipient, provider = "gmail", "Confirmation email sent");
        Ok(())
    }
}

/// Build a multipart/alternative message with text and HTML parts.
pub fn build_message(
    sender: &str,
    recipient: &str,
    request: &TravelRequest,
    package: &TravelPackage,
) -> String {
    let lines = [
        format!("From: {}", sender),
        format!("To: {}", recipient),
        // RFC 2047 encoded word; base64 keeps the arrow intact.
        format!("Subject: =?UTF-8?B?{}?=", STANDARD.encode(render::subject(request))),
        "MIME-Version: 1.0".to_string(),
        format!(
            "Content-Type: multipart/alternative; boundary=\"{}\"",
            BOUNDARY
        ),
        String::new(),
        format!("--{}", BOUNDARY),
        "Content-Type: text/plain; charset=\"UTF-8\"".to_string(),
        "Content-Transfer-Encoding: 8bit".to_string(),
        String::new(),
        render::text_body(request, package),
        format!("--{}", BOUNDARY),
        "Content-Type: text/html; charset=\"UTF-8\"".to_string(),
        "Content-Transfer-Encoding: 8bit".to_string(),
        String::new(),
        render::html_body(request, package),
        format!("--{}--", BOUNDARY),
    ];
    lines.join("\r\n")
}
