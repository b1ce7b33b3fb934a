//! Amadeus self-service flight search.
//!
//! Only flights come from Amadeus; the hotel is taken from the mock catalogue.
//! When the token exchange fails the whole package falls back to mock data.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use wayfarer_core::config::SearchConfig;
use wayfarer_core::{FlightOption, Money, TravelPackage, TravelRequest};

use super::{budget_too_low, city_to_iata, ensure_searchable, MockSearch, TripSearch};
use crate::error::{truncate_body, SearchError};

/// Tokens are refreshed this long before Amadeus says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

pub struct AmadeusSearch {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    currency: String,
    token: Mutex<Option<CachedToken>>,
    fallback: MockSearch,
}

impl AmadeusSearch {
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        config: &SearchConfig,
    ) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            currency: config.currency.to_uppercase(),
            token: Mutex::new(None),
            fallback: MockSearch::new(&config.currency),
        })
    }

    fn cached_token(&self) -> Option<String> {
        let guard = self.token.lock().ok()?;
        guard
            .as_ref()
            .filter(|t| t.expires_at > Instant::now())
            .map(|t| t.value.clone())
    }

    async fn access_token(&self) -> Result<String, SearchError> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let response = self
            .client
            .post(format!("{}/v1/security/oauth2/token", self.base_url))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.api_key.as_str()),
                ("client_secret", self.api_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Auth(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Auth(format!("HTTP {}", status.as_u16())));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Auth(format!("token response: {}", e)))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        if let Ok(mut guard) = self.token.lock() {
            *guard = Some(CachedToken {
                value: token.access_token.clone(),
                expires_at: Instant::now() + lifetime,
            });
        }
        Ok(token.access_token)
    }

    async fn search_flight(
        &self,
        token: &str,
        request: &TravelRequest,
    ) -> Result<Option<FlightOption>, SearchError> {
        let mut params: Vec<(&str, String)> = vec![
            (
                "originLocationCode",
                city_to_iata(request.origin.as_deref().unwrap_or_default()),
            ),
            (
                "destinationLocationCode",
                city_to_iata(request.destination.as_deref().unwrap_or_default()),
            ),
            ("adults", request.passengers.to_string()),
            ("currencyCode", self.currency.clone()),
            ("max", "1".to_string()),
        ];
        if let Some(date) = request.departure_date {
            params.push(("departureDate", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(date) = request.return_date {
            params.push(("returnDate", date.format("%Y-%m-%d").to_string()));
        }

        let response = self
            .client
            .get(format!("{}/v2/shopping/flight-offers", self.base_url))
            .bearer_auth(token)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body: truncate_body(body),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))?;
        parse_first_offer(&body)
    }
}

#[async_trait]
impl TripSearch for AmadeusSearch {
    fn name(&self) -> &'static str {
        "amadeus"
    }

    async fn search(&self, request: &TravelRequest) -> Result<Option<TravelPackage>, SearchError> {
        ensure_searchable(request)?;
        if budget_too_low(request) {
            return Ok(None);
        }

        let token = match self.access_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Amadeus authentication failed, using mock results");
                return self.fallback.search(request).await;
            }
        };

        let Some(flight) = self.search_flight(&token, request).await? else {
            tracing::info!(provider = "amadeus", "No flight offers found");
            return Ok(None);
        };

        let accommodation = self.fallback.accommodation(request);
        let package = TravelPackage::new(flight, accommodation)
            .ok_or_else(|| SearchError::Parse("flight priced in another currency".to_string()))?;

        if !package.within_budget(request.budget.as_ref()) {
            tracing::info!(
                provider = "amadeus",
                total = %package.total_price(),
                "Package exceeds budget"
            );
            return Ok(None);
        }
        Ok(Some(package))
    }
}

/// Parse the first offer of a flight-offers response.
///
/// `Ok(None)` when the response holds no offers.
pub fn parse_first_offer(body: &Value) -> Result<Option<FlightOption>, SearchError> {
    let Some(offer) = body
        .get("data")
        .and_then(Value::as_array)
        .and_then(|offers| offers.first())
    else {
        return Ok(None);
    };

    let itinerary = offer
        .pointer("/itineraries/0")
        .ok_or_else(|| SearchError::Parse("offer has no itineraries".to_string()))?;
    let segments = itinerary
        .get("segments")
        .and_then(Value::as_array)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SearchError::Parse("itinerary has no segments".to_string()))?;
    let (first, last) = match (segments.first(), segments.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(SearchError::Parse("itinerary has no segments".to_string())),
    };

    let carrier = first
        .get("carrierCode")
        .and_then(Value::as_str)
        .unwrap_or("XX");
    let number = first.get("number").and_then(Value::as_str).unwrap_or("0000");
    let airline = body
        .pointer(&format!("/dictionaries/carriers/{}", carrier))
        .and_then(Value::as_str)
        .unwrap_or(carrier);

    let price = offer
        .get("price")
        .ok_or_else(|| SearchError::Parse("offer has no price".to_string()))?;
    let amount = price
        .get("grandTotal")
        .or_else(|| price.get("total"))
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| SearchError::Parse("offer price is not a number".to_string()))?;
    let currency = price.get("currency").and_then(Value::as_str).unwrap_or("EUR");

    let offer_id = offer.get("id").and_then(Value::as_str).unwrap_or_default();

    Ok(Some(FlightOption {
        airline: airline.to_string(),
        flight_number: format!("{}{}", carrier, number),
        departure_time: clock_time(first.pointer("/departure/at")),
        arrival_time: clock_time(last.pointer("/arrival/at")),
        duration: itinerary
            .get("duration")
            .and_then(Value::as_str)
            .map(format_iso_duration)
            .unwrap_or_default(),
        price: Money::from_major(amount, currency),
        stops: u32::try_from(segments.len() - 1).unwrap_or(u32::MAX),
        booking_url: Some(format!("https://www.amadeus.com/flights?offer={}", offer_id)),
    }))
}

/// `2026-10-24T08:30:00` -> `08:30`.
fn clock_time(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .and_then(|at| at.split('T').nth(1))
        .map(|time| time.chars().take(5).collect())
        .unwrap_or_default()
}

/// `PT3H15M` -> `3h 15m`.
pub fn format_iso_duration(iso: &str) -> String {
    let body = iso.trim_start_matches("PT");
    let mut parts = Vec::new();
    let mut number = String::new();
    for c in body.chars() {
        if c.is_ascii_digit() {
            number.push(c);
        } else if !number.is_empty() {
            parts.push(format!("{}{}", number, c.to_ascii_lowercase()));
            number.clear();
        }
    }
    parts.join(" ")
}
