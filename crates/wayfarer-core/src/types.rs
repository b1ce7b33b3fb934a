use std::fmt;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Nights assumed for accommodation pricing when no duration is known.
pub const DEFAULT_NIGHTS: u32 = 3;

// =============================================================================
// Enums
// =============================================================================

/// A field that must be known before a trip can be searched.
///
/// Variants are declared in the order follow-up questions ask for them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredField {
    Origin,
    Destination,
    DepartureDate,
    DurationDays,
    TravelerEmail,
}

impl RequiredField {
    pub const ALL: [RequiredField; 5] = [
        RequiredField::Origin,
        RequiredField::Destination,
        RequiredField::DepartureDate,
        RequiredField::DurationDays,
        RequiredField::TravelerEmail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequiredField::Origin => "origin",
            RequiredField::Destination => "destination",
            RequiredField::DepartureDate => "departure_date",
            RequiredField::DurationDays => "duration_days",
            RequiredField::TravelerEmail => "traveler_email",
        }
    }

    /// Parse a field name as produced by a language model.
    ///
    /// Accepts a few common aliases (`email`, `duration`, `date`).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "origin" | "from" => Some(RequiredField::Origin),
            "destination" | "to" => Some(RequiredField::Destination),
            "departure_date" | "date" | "dates" => Some(RequiredField::DepartureDate),
            "duration_days" | "duration" => Some(RequiredField::DurationDays),
            "traveler_email" | "email" | "user_email" => Some(RequiredField::TravelerEmail),
            _ => None,
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Money
// =============================================================================

/// An amount of money in integer minor units (cents) plus an ISO currency code.
///
/// Serialized as `{"amount": 284.99, "currency": "EUR"}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "MoneyRepr", into = "MoneyRepr")]
pub struct Money {
    minor: i64,
    currency: String,
}

#[derive(Serialize, Deserialize)]
struct MoneyRepr {
    amount: f64,
    currency: String,
}

impl From<MoneyRepr> for Money {
    fn from(repr: MoneyRepr) -> Self {
        Money::from_major(repr.amount, &repr.currency)
    }
}

impl From<Money> for MoneyRepr {
    fn from(money: Money) -> Self {
        MoneyRepr {
            amount: money.amount(),
            currency: money.currency,
        }
    }
}

impl Money {
    pub fn new(minor: i64, currency: &str) -> Self {
        Self {
            minor,
            currency: currency.trim().to_uppercase(),
        }
    }

    /// Build from a decimal amount, rounding to the nearest cent.
    pub fn from_major(amount: f64, currency: &str) -> Self {
        Self::new((amount * 100.0).round() as i64, currency)
    }

    pub fn minor_units(&self) -> i64 {
        self.minor
    }

    pub fn amount(&self) -> f64 {
        self.minor as f64 / 100.0
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Sum of two amounts, or `None` when the currencies differ.
    pub fn checked_add(&self, other: &Money) -> Option<Money> {
        if self.currency != other.currency {
            return None;
        }
        Some(Money {
            minor: self.minor.checked_add(other.minor)?,
            currency: self.currency.clone(),
        })
    }

    pub fn times(&self, factor: u32) -> Money {
        Money {
            minor: self.minor.saturating_mul(i64::from(factor)),
            currency: self.currency.clone(),
        }
    }

    /// Whether this amount is at most `limit`. `None` when the currencies differ.
    pub fn fits_within(&self, limit: &Money) -> Option<bool> {
        if self.currency != limit.currency {
            return None;
        }
        Some(self.minor <= limit.minor)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minor < 0 { "-" } else { "" };
        let abs = self.minor.unsigned_abs();
        write!(f, "{}{}.{:02} {}", sign, abs / 100, abs % 100, self.currency)
    }
}

// =============================================================================
// Travel request
// =============================================================================

/// Trip requirements accumulated across chat turns.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TravelRequest {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub duration_days: Option<u32>,
    pub passengers: u32,
    pub budget: Option<Money>,
    pub traveler_email: Option<String>,
}

impl Default for TravelRequest {
    fn default() -> Self {
        Self {
            origin: None,
            destination: None,
            departure_date: None,
            return_date: None,
            duration_days: None,
            passengers: 1,
            budget: None,
            traveler_email: None,
        }
    }
}

/// Field values extracted from a single message. Absent fields leave the
/// request untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TravelRequestPatch {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub duration_days: Option<u32>,
    pub passengers: Option<u32>,
    pub budget: Option<Money>,
    pub traveler_email: Option<String>,
}

impl TravelRequestPatch {
    pub fn is_empty(&self) -> bool {
        self == &TravelRequestPatch::default()
    }
}

impl TravelRequest {
    /// Merge extracted values into the request.
    ///
    /// A present value replaces the stored one; an absent value never clears
    /// it. Blank strings, zero counts and addresses without an `@` are ignored.
    /// Returns the names of the fields whose value changed.
    pub fn merge(&mut self, patch: TravelRequestPatch) -> Vec<&'static str> {
        let mut changed = Vec::new();

        if let Some(origin) = clean_text(patch.origin) {
            set_if_changed(&mut self.origin, origin, "origin", &mut changed);
        }
        if let Some(destination) = clean_text(patch.destination) {
            set_if_changed(&mut self.destination, destination, "destination", &mut changed);
        }
        if let Some(date) = patch.departure_date {
            set_if_changed(&mut self.departure_date, date, "departure_date", &mut changed);
        }
        let return_given = patch.return_date.is_some();
        if let Some(date) = patch.return_date {
            set_if_changed(&mut self.return_date, date, "return_date", &mut changed);
        }
        let duration_given = matches!(patch.duration_days, Some(d) if d > 0);
        if let Some(days) = patch.duration_days.filter(|d| *d > 0) {
            set_if_changed(&mut self.duration_days, days, "duration_days", &mut changed);
        }
        if let Some(count) = patch.passengers.filter(|c| *c > 0) {
            if self.passengers != count {
                self.passengers = count;
                changed.push("passengers");
            }
        }
        if let Some(budget) = patch.budget.filter(|b| b.minor_units() > 0) {
            set_if_changed(&mut self.budget, budget, "budget", &mut changed);
        }
        if let Some(email) = clean_text(patch.traveler_email).filter(|e| is_plausible_email(e)) {
            set_if_changed(&mut self.traveler_email, email, "traveler_email", &mut changed);
        }

        self.derive_dates(return_given && !duration_given);
        changed
    }

    /// Keep departure, return and duration consistent.
    ///
    /// When only the return date was just supplied it drives the duration;
    /// otherwise the duration drives the return date.
    fn derive_dates(&mut self, return_leads: bool) {
        let Some(departure) = self.departure_date else {
            return;
        };
        if return_leads || self.duration_days.is_none() {
            if let Some(ret) = self.return_date {
                let days = (ret - departure).num_days();
                if days > 0 {
                    self.duration_days = u32::try_from(days).ok();
                }
                return;
            }
        }
        if let Some(days) = self.duration_days {
            self.return_date = departure.checked_add_signed(Duration::days(i64::from(days)));
        }
    }

    /// Required fields still unknown, in the order they should be asked for.
    pub fn missing_fields(&self) -> Vec<RequiredField> {
        RequiredField::ALL
            .into_iter()
            .filter(|field| !self.has(*field))
            .collect()
    }

    pub fn has(&self, field: RequiredField) -> bool {
        match field {
            RequiredField::Origin => self.origin.is_some(),
            RequiredField::Destination => self.destination.is_some(),
            RequiredField::DepartureDate => self.departure_date.is_some(),
            RequiredField::DurationDays => self.duration_days.is_some(),
            RequiredField::TravelerEmail => self.traveler_email.is_some(),
        }
    }

    pub fn is_complete(&self) -> bool {
        RequiredField::ALL.iter().all(|field| self.has(*field))
    }

    /// Nights to price accommodation for.
    pub fn nights(&self) -> u32 {
        self.duration_days.unwrap_or(DEFAULT_NIGHTS)
    }
}

fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn set_if_changed<T: PartialEq>(
    slot: &mut Option<T>,
    value: T,
    name: &'static str,
    changed: &mut Vec<&'static str>,
) {
    if slot.as_ref() != Some(&value) {
        *slot = Some(value);
        changed.push(name);
    }
}

/// Minimal shape check: something before and a dotted domain after one `@`.
pub fn is_plausible_email(value: &str) -> bool {
    let mut parts = value.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !value.contains(char::is_whitespace)
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

// =============================================================================
// Search results
// =============================================================================

/// A single flight offer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlightOption {
    pub airline: String,
    pub flight_number: String,
    pub departure_time: String,
    pub arrival_time: String,
    /// Human-readable duration, e.g. `3h 15m`.
    pub duration: String,
    /// Price for all passengers.
    pub price: Money,
    pub stops: u32,
    pub booking_url: Option<String>,
}

/// A single accommodation offer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccommodationOption {
    pub name: String,
    /// Hotel, apartment, hostel...
    pub kind: String,
    pub rating: Option<f32>,
    pub price_per_night: Money,
    pub total_price: Money,
    pub amenities: Vec<String>,
    pub booking_url: Option<String>,
}

/// One flight plus one accommodation with their combined price.
///
/// Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TravelPackage {
    flight: FlightOption,
    accommodation: AccommodationOption,
    total_price: Money,
}

impl TravelPackage {
    /// Combine a flight and an accommodation. `None` when they are priced in
    /// different currencies.
    pub fn new(flight: FlightOption, accommodation: AccommodationOption) -> Option<Self> {
        let total_price = flight.price.checked_add(&accommodation.total_price)?;
        Some(Self {
            flight,
            accommodation,
            total_price,
        })
    }

    pub fn flight(&self) -> &FlightOption {
        &self.flight
    }

    pub fn accommodation(&self) -> &AccommodationOption {
        &self.accommodation
    }

    pub fn total_price(&self) -> &Money {
        &self.total_price
    }

    /// Whether the package fits the request's budget. No budget always fits;
    /// a budget in another currency never does.
    pub fn within_budget(&self, budget: Option<&Money>) -> bool {
        match budget {
            None => true,
            Some(limit) => self.total_price.fits_within(limit).unwrap_or(false),
        }
    }
}
