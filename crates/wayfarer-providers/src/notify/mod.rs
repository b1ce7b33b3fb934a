//! Confirmation email delivery.
//!
//! Defines the `Mailer` async trait, the Gmail REST mailer and a disabled
//! mailer for deployments without email credentials.

pub mod gmail;
pub mod render;

use async_trait::async_trait;
use wayfarer_core::{TravelPackage, TravelRequest};

use crate::error::DeliveryError;

pub use gmail::GmailMailer;

/// Sends the chosen package to the traveler. One attempt, no retry.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn send(&self, request: &TravelRequest, package: &TravelPackage)
        -> Result<(), DeliveryError>;
}

/// Mailer used when no email credentials are configured.
///
/// Logs what would have been sent and reports `NotConfigured`.
#[derive(Debug, Clone, Default)]
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn send(
        &self,
        request: &TravelRequest,
        package: &TravelPackage,
    ) -> Result<(), DeliveryError> {
        tracing::info!(
            to = request.traveler_email.as_deref().unwrap_or("<none>"),
            subject = %render::subject(request),
            total = %package.total_price(),
            "Email not configured, confirmation not sent"
        );
        tracing::debug!(body = %render::text_body(request, package), "Unsent confirmation");
        Err(DeliveryError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_core::{AccommodationOption, FlightOption, Money};

    #[tokio::test]
    async fn test_disabled_mailer_reports_not_configured() {
        let package = TravelPackage::new(
            FlightOption {
                airline: "TAP Air Portugal".into(),
                flight_number: "TP1234".into(),
                departure_time: "08:30".into(),
                arrival_time: "11:45".into(),
                duration: "3h 15m".into(),
                price: Money::new(8999, "EUR"),
                stops: 0,
                booking_url: None,
            },
            AccommodationOption {
                name: "Hotel Central London".into(),
                kind: "hotel".into(),
                rating: None,
                price_per_night: Money::new(6500, "EUR"),
                total_price: Money::new(19500, "EUR"),
                amenities: vec![],
                booking_url: None,
            },
        )
        .unwrap();
        let result = DisabledMailer
            .send(&TravelRequest::default(), &package)
            .await;
        assert!(matches!(result, Err(DeliveryError::NotConfigured)));
        assert_eq!(DisabledMailer.name(), "disabled");
    }
}
