//! Deterministic search results for running without provider credentials.

use async_trait::async_trait;
use wayfarer_core::{AccommodationOption, FlightOption, Money, TravelPackage, TravelRequest};

use super::{budget_too_low, city_to_iata, ensure_searchable, TripSearch};
use crate::error::SearchError;

/// Per-traveler fare of the mock flight, in minor units.
pub const MOCK_FLIGHT_FARE: i64 = 8999;
/// Nightly rate of the mock hotel, in minor units.
pub const MOCK_NIGHTLY_RATE: i64 = 6500;

/// Always offers the same flight and hotel, priced in one currency.
#[derive(Debug, Clone)]
pub struct MockSearch {
    currency: String,
}

impl MockSearch {
    pub fn new(currency: &str) -> Self {
        Self {
            currency: currency.to_uppercase(),
        }
    }

    pub fn flight(&self, request: &TravelRequest) -> FlightOption {
        let origin = request.origin.as_deref().unwrap_or_default();
        let destination = request.destination.as_deref().unwrap_or_default();
        let mut booking_url = format!(
            "https://www.kiwi.com/en/search/results/{}/{}",
            city_to_iata(origin),
            city_to_iata(destination)
        );
        if let Some(date) = request.departure_date {
            booking_url.push_str(&format!("/{}", date.format("%Y-%m-%d")));
        }
        FlightOption {
            airline: "TAP Air Portugal".to_string(),
            flight_number: "TP1234".to_string(),
            departure_time: "08:30".to_string(),
            arrival_time: "11:45".to_string(),
            duration: "3h 15m".to_string(),
            price: Money::new(MOCK_FLIGHT_FARE, &self.currency).times(request.passengers),
            stops: 0,
            booking_url: Some(booking_url),
        }
    }

    /// The hotel offered for any destination. Also used by live flight
    /// search, which has no hotel source of its own.
    pub fn accommodation(&self, request: &TravelRequest) -> AccommodationOption {
        let destination = request.destination.as_deref().unwrap_or("City");
        let nightly = Money::new(MOCK_NIGHTLY_RATE, &self.currency);
        AccommodationOption {
            name: format!("Hotel Central {}", destination),
            kind: "hotel".to_string(),
            rating: Some(4.2),
            total_price: nightly.times(request.nights()),
            price_per_night: nightly,
            amenities: vec![
                "WiFi".to_string(),
                "Breakfast".to_string(),
                "City Center".to_string(),
            ],
            booking_url: Some(format!(
                "https://www.booking.com/searchresults.html?ss={}",
                destination.replace(' ', "+")
            )),
        }
    }
}

#[async_trait]
impl TripSearch for MockSearch {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn search(&self, request: &TravelRequest) -> Result<Option<TravelPackage>, SearchError> {
        ensure_searchable(request)?;
        if budget_too_low(request) {
            tracing::info!(provider = "mock", "Budget below minimum viable package");
            return Ok(None);
        }

        let package = TravelPackage::new(self.flight(request), self.accommodation(request))
            .ok_or_else(|| SearchError::Parse("mixed currencies in package".to_string()))?;

        if !package.within_budget(request.budget.as_ref()) {
            tracing::info!(
                provider = "mock",
                total = %package.total_price(),
                "Package exceeds budget"
            );
            return Ok(None);
        }
        Ok(Some(package))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn porto_london() -> TravelRequest {
        TravelRequest {
            origin: Some("Porto".into()),
            destination: Some("London".into()),
            departure_date: NaiveDate::from_ymd_opt(2026, 10, 24),
            return_date: NaiveDate::from_ymd_opt(2026, 10, 27),
            duration_days: Some(3),
            passengers: 1,
            budget: Some(Money::new(50000, "EUR")),
            traveler_email: Some("jane@example.com".into()),
        }
    }

    #[tokio::test]
    async fn test_mock_package_for_porto_london() {
        let search = MockSearch::new("EUR");
        let package = search.search(&porto_london()).await.unwrap().unwrap();

        assert_eq!(package.flight().flight_number, "TP1234");
        assert_eq!(package.flight().price, Money::new(8999, "EUR"));
        assert_eq!(package.accommodation().name, "Hotel Central London");
        assert_eq!(package.accommodation().total_price, Money::new(19500, "EUR"));
        assert_eq!(package.total_price(), &Money::new(28499, "EUR"));
        assert_eq!(
            package.flight().booking_url.as_deref(),
            Some("https://www.kiwi.com/en/search/results/OPO/LON/2026-10-24")
        );
    }

    #[tokio::test]
    async fn test_mock_scales_with_passengers_and_nights() {
        let mut request = porto_london();
        request.passengers = 2;
        request.duration_days = Some(5);
        request.budget = None;
        let package = MockSearch::new("EUR").search(&request).await.unwrap().unwrap();
        assert_eq!(package.flight().price, Money::new(17998, "EUR"));
        assert_eq!(package.accommodation().total_price, Money::new(32500, "EUR"));
    }

    #[tokio::test]
    async fn test_mock_over_budget_returns_none() {
        let mut request = porto_london();
        request.budget = Some(Money::new(20000, "EUR"));
        let result = MockSearch::new("EUR").search(&request).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_mock_budget_below_minimum_returns_none() {
        let mut request = porto_london();
        request.budget = Some(Money::new(5000, "EUR"));
        let result = MockSearch::new("EUR").search(&request).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_mock_budget_in_other_currency_returns_none() {
        let mut request = porto_london();
        request.budget = Some(Money::new(100000, "USD"));
        let result = MockSearch::new("EUR").search(&request).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_mock_rejects_incomplete_request() {
        let mut request = porto_london();
        request.traveler_email = None;
        let result = MockSearch::new("EUR").search(&request).await;
        assert!(matches!(result, Err(SearchError::IncompleteRequest(_))));
    }
}
