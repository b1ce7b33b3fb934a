//! Flight and accommodation search.
//!
//! Defines the `TripSearch` async trait, the deterministic mock catalogue and
//! the Amadeus client.

pub mod amadeus;
pub mod mock;

use async_trait::async_trait;
use wayfarer_core::{TravelPackage, TravelRequest};

use crate::error::SearchError;

pub use amadeus::AmadeusSearch;
pub use mock::MockSearch;

/// Budgets below this many major units cannot buy any package.
pub const MIN_VIABLE_BUDGET: i64 = 100;

/// Finds the single best package for a complete request.
#[async_trait]
pub trait TripSearch: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// `Ok(None)` when nothing matches, including nothing within budget.
    async fn search(&self, request: &TravelRequest) -> Result<Option<TravelPackage>, SearchError>;
}

/// Reject requests that are not ready to search.
pub(crate) fn ensure_searchable(request: &TravelRequest) -> Result<(), SearchError> {
    match request.missing_fields().first() {
        Some(field) => Err(SearchError::IncompleteRequest(*field)),
        None => Ok(()),
    }
}

/// Whether the request's budget is too small for any package.
pub(crate) fn budget_too_low(request: &TravelRequest) -> bool {
    request
        .budget
        .as_ref()
        .is_some_and(|b| b.minor_units() < MIN_VIABLE_BUDGET * 100)
}

/// Map a city name to the IATA code the flight search expects.
///
/// Unknown cities fall back to their first three letters, uppercased.
pub fn city_to_iata(city: &str) -> String {
    let code = match city.trim().to_lowercase().as_str() {
        "porto" | "oporto" => "OPO",
        "london" => "LON",
        "paris" => "PAR",
        "madrid" => "MAD",
        "barcelona" => "BCN",
        "rome" => "ROM",
        "amsterdam" => "AMS",
        "berlin" => "BER",
        "new york" | "nyc" => "NYC",
        "los angeles" => "LAX",
        "lisbon" | "lisboa" => "LIS",
        "frankfurt" => "FRA",
        "munich" => "MUC",
        "milan" => "MIL",
        "zurich" => "ZRH",
        "vienna" => "VIE",
        "prague" => "PRG",
        "budapest" => "BUD",
        "dublin" => "DUB",
        other => {
            return other
                .chars()
                .filter(|c| c.is_alphabetic())
                .take(3)
                .collect::<String>()
                .to_uppercase();
        }
    };
    code.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_core::{Money, RequiredField};

    #[test]
    fn test_city_to_iata_known() {
        assert_eq!(city_to_iata("Porto"), "OPO");
        assert_eq!(city_to_iata(" London "), "LON");
        assert_eq!(city_to_iata("New York"), "NYC");
    }

    #[test]
    fn test_city_to_iata_fallback() {
        assert_eq!(city_to_iata("Seville"), "SEV");
        assert_eq!(city_to_iata("St. Ives"), "STI");
    }

    #[test]
    fn test_ensure_searchable() {
        let request = TravelRequest {
            origin: Some("Porto".into()),
            ..Default::default()
        };
        assert!(matches!(
            ensure_searchable(&request),
            Err(SearchError::IncompleteRequest(RequiredField::Destination))
        ));
    }

    #[test]
    fn test_budget_too_low() {
        let mut request = TravelRequest::default();
        assert!(!budget_too_low(&request));
        request.budget = Some(Money::new(9999, "EUR"));
        assert!(budget_too_low(&request));
        request.budget = Some(Money::new(10000, "EUR"));
        assert!(!budget_too_low(&request));
    }
}
