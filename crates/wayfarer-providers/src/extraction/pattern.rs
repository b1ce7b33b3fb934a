//! Offline trip extractor.
//!
//! Recognizes routes, dates, durations, party size, budgets and email
//! addresses with regular expressions. Used when no language model is
//! configured; it never produces a follow-up question of its own.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};
use regex::{Captures, Regex};
use wayfarer_core::{Money, TravelRequest, TravelRequestPatch};

use super::{Extraction, TripExtractor};
use crate::error::ExtractionError;

// =============================================================================
// Compiled regex sets (compiled once, reused across calls)
// =============================================================================

struct TripPatterns {
    email: Regex,
    from: Regex,
    to: Regex,
    visit: Regex,
    iso_date: Regex,
    dmy_date: Regex,
    returning: Regex,
    relative_day: Regex,
    weekend: Regex,
    weekday: Regex,
    in_n: Regex,
    duration: Regex,
    duration_compound: Regex,
    passengers: Regex,
    budget: Regex,
}

static PATTERNS: LazyLock<TripPatterns> = LazyLock::new(|| {
    let mk = |p: &str| Regex::new(p).expect("Invalid trip regex");

    TripPatterns {
        email: mk(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}"),
        from: mk(r"(?i)\bfrom\s+"),
        to: mk(r"(?i)\bto\s+"),
        visit: mk(r"(?i)\bvisit(?:ing)?\s+"),
        iso_date: mk(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b"),
        dmy_date: mk(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b"),
        returning: mk(
            r"(?i)\b(?:returning|return|back|until|till)\s+(?:on\s+)?(\d{4}-\d{1,2}-\d{1,2})\b",
        ),
        relative_day: mk(r"(?i)\b(today|tomorrow)\b"),
        weekend: mk(r"(?i)\b(this|next)\s+weekend\b"),
        weekday: mk(
            r"(?i)\b(next|this|on)\s+(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
        ),
        in_n: mk(r"(?i)\bin\s+(\d+|a|an|one|two|three|four|five|six|seven|eight|nine|ten)\s+(days?|weeks?)\b"),
        duration: mk(
            r"(?i)\bfor\s+(\d+|a|an|one|two|three|four|five|six|seven|eight|nine|ten)\s+(days?|nights?|weeks?)\b",
        ),
        duration_compound: mk(
            r"(?i)\b(\d+)[-\s](day|night|week)\s+(?:trip|stay|holiday|vacation|getaway|break)\b",
        ),
        passengers: mk(
            r"(?i)\b(\d+|two|three|four|five|six|seven|eight|nine|ten)\s+(?:people|persons|travell?ers|passengers|adults|guests)\b",
        ),
        budget: mk(
            r"(?i)\b(?:under|below|less\s+than|max(?:imum)?|up\s+to|budget(?:\s+(?:of|is))?(?:\s+(?:around|about))?)\s*(€|\$|£)?\s*(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{1,2}))?\s*(k\b)?\s*(euros?|eur|usd|dollars?|gbp|pounds?|€|\$|£)?",
        ),
    }
});

/// Words that end a place name.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "around", "at", "back", "be", "because", "between", "book",
    "budget", "but", "by", "do", "during", "email", "fly", "flying", "for", "from", "get",
    "go", "have", "i", "in", "is", "it", "know", "leaving", "departing", "less", "make", "max",
    "maximum", "me", "my", "next", "of", "on", "or", "please", "return", "returning", "see",
    "so", "spend", "stay", "the", "then", "this", "till", "to", "today", "tomorrow", "tonight",
    "travel", "traveling", "travelling", "trip", "under", "until", "via", "visit", "we",
    "week", "weekend", "with",
];

/// Words that mark the following "to <place>" as a destination even when the
/// place is written in lower case.
const TRAVEL_CUES: &[&str] = &[
    "go", "going", "fly", "flying", "travel", "traveling", "travelling", "trip", "flight",
    "flights", "head", "heading", "ticket", "tickets", "get", "drive", "vacation", "holiday",
    "journey",
];

/// Regex-based extractor.
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    default_currency: String,
    today: Option<NaiveDate>,
}

impl PatternExtractor {
    pub fn new(default_currency: &str) -> Self {
        Self {
            default_currency: default_currency.to_uppercase(),
            today: None,
        }
    }

    /// Resolve relative dates against a fixed day instead of the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Extract fields from `message`, resolving relative dates against `today`.
    pub fn extract_at(&self, message: &str, known: &TravelRequest, today: NaiveDate) -> Extraction {
        let p = &*PATTERNS;

        let traveler_email = p.email.find(message).map(|m| m.as_str().to_string());
        // Email addresses would otherwise be read as "to <place>".
        let text = p.email.replace_all(message, " ");

        let (origin, origin_start) = find_origin(&text);
        let destination = find_destination(&text, origin_start);
        let (departure_date, return_date) = find_dates(&text, today);

        let patch = TravelRequestPatch {
            origin,
            destination,
            departure_date,
            return_date,
            duration_days: find_duration(&text),
            passengers: p
                .passengers
                .captures(&text)
                .and_then(|c| parse_count(&c[1])),
            budget: find_budget(&text, &self.default_currency),
            traveler_email,
        };

        let mut merged = known.clone();
        merged.merge(patch.clone());
        let confidence = if patch.is_empty() { 0.0 } else { 0.6 };

        Extraction {
            is_complete: merged.is_complete(),
            missing_fields: merged.missing_fields(),
            follow_up_question: None,
            confidence,
            patch,
        }
    }
}

#[async_trait]
impl TripExtractor for PatternExtractor {
    fn name(&self) -> &'static str {
        "pattern"
    }

    async fn extract(
        &self,
        message: &str,
        known: &TravelRequest,
    ) -> Result<Extraction, ExtractionError> {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        Ok(self.extract_at(message, known, today))
    }
}

// =============================================================================
// Places
// =============================================================================

fn find_origin(text: &str) -> (Option<String>, Option<usize>) {
    PATTERNS
        .from
        .find_iter(text)
        .find_map(|m| place_after(text, m.end()).map(|place| (Some(place), Some(m.start()))))
        .unwrap_or((None, None))
}

fn find_destination(text: &str, origin_start: Option<usize>) -> Option<String> {
    for m in PATTERNS.to.find_iter(text) {
        let Some(place) = place_after(text, m.end()) else {
            continue;
        };
        let cue = text[..m.start()]
            .split_whitespace()
            .next_back()
            .is_some_and(|w| TRAVEL_CUES.contains(&w.to_lowercase().as_str()));
        let capitalized = text[m.end()..]
            .chars()
            .next()
            .is_some_and(char::is_uppercase);
        let after_origin = origin_start.is_some_and(|start| m.start() > start);
        if cue || capitalized || after_origin {
            return Some(place);
        }
    }
    PATTERNS
        .visit
        .find_iter(text)
        .find_map(|m| place_after(text, m.end()))
}

/// Read up to three words starting at `start`, stopping at punctuation,
/// digits or a stopword.
fn place_after(text: &str, start: usize) -> Option<String> {
    let mut words: Vec<&str> = Vec::new();
    for raw in text[start..].split_whitespace() {
        let word = raw.trim_end_matches([',', '.', ';', ':', '!', '?', ')']);
        let punctuated = word.len() != raw.len();
        if word.is_empty()
            || !word
                .chars()
                .all(|c| c.is_alphabetic() || c == '\'' || c == '-')
            || STOPWORDS.contains(&word.to_lowercase().as_str())
        {
            break;
        }
        words.push(word);
        if punctuated || words.len() == 3 {
            break;
        }
    }
    if words.is_empty() {
        return None;
    }
    Some(
        words
            .into_iter()
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Dates
// =============================================================================

fn find_dates(text: &str, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let p = &*PATTERNS;

    let returning = p.returning.captures(text);
    let return_span = returning
        .as_ref()
        .and_then(|c| c.get(0))
        .map(|m| m.start()..m.end());
    let explicit_return = returning
        .as_ref()
        .and_then(|c| NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").ok());

    let mut absolute: Vec<(usize, NaiveDate)> = p
        .iso_date
        .captures_iter(text)
        .filter_map(|c| {
            let at = c.get(0)?.start();
            ymd(&c[1], &c[2], &c[3]).map(|d| (at, d))
        })
        .chain(p.dmy_date.captures_iter(text).filter_map(|c| {
            let at = c.get(0)?.start();
            ymd(&c[3], &c[2], &c[1]).map(|d| (at, d))
        }))
        .filter(|(at, _)| !return_span.as_ref().is_some_and(|span| span.contains(at)))
        .collect();
    absolute.sort_by_key(|(at, _)| *at);

    let departure = absolute
        .first()
        .map(|(_, d)| *d)
        .or_else(|| relative_date(text, today));
    let return_date = explicit_return.or_else(|| absolute.get(1).map(|(_, d)| *d));
    (departure, return_date)
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

fn relative_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let p = &*PATTERNS;

    if let Some(c) = p.weekend.captures(text) {
        let this = c[1].eq_ignore_ascii_case("this");
        let on_weekend = matches!(today.weekday(), Weekday::Sat | Weekday::Sun);
        return Some(if this && on_weekend {
            today
        } else {
            next_weekday(today, Weekday::Sat)
        });
    }
    if let Some(c) = p.weekday.captures(text) {
        let target = parse_weekday(&c[2])?;
        let strictly_after = c[1].eq_ignore_ascii_case("next");
        if !strictly_after && today.weekday() == target {
            return Some(today);
        }
        return Some(next_weekday(today, target));
    }
    if let Some(c) = p.in_n.captures(text) {
        let n = i64::from(parse_count(&c[1])?);
        let days = if c[2].to_lowercase().starts_with("week") { n * 7 } else { n };
        return today.checked_add_signed(Duration::days(days));
    }
    if let Some(c) = p.relative_day.captures(text) {
        return if c[1].eq_ignore_ascii_case("today") {
            Some(today)
        } else {
            today.succ_opt()
        };
    }
    None
}

/// The first `target` weekday strictly after `today`.
fn next_weekday(today: NaiveDate, target: Weekday) -> NaiveDate {
    let from = today.weekday().num_days_from_monday();
    let to = target.num_days_from_monday();
    let delta = match (to + 7 - from) % 7 {
        0 => 7,
        d => d,
    };
    today + Duration::days(i64::from(delta))
}

fn parse_weekday(name: &str) -> Option<Weekday> {
    name.to_lowercase().parse().ok()
}

// =============================================================================
// Durations, party size, budget
// =============================================================================

fn find_duration(text: &str) -> Option<u32> {
    let p = &*PATTERNS;
    let to_days = |c: Captures<'_>| -> Option<u32> {
        let n = parse_count(&c[1])?;
        if c[2].to_lowercase().starts_with("week") {
            n.checked_mul(7)
        } else {
            Some(n)
        }
    };
    p.duration
        .captures(text)
        .and_then(to_days)
        .or_else(|| p.duration_compound.captures(text).and_then(to_days))
}

fn parse_count(word: &str) -> Option<u32> {
    let n = match word.to_lowercase().as_str() {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        digits => digits.parse().ok()?,
    };
    (n > 0).then_some(n)
}

fn find_budget(text: &str, default_currency: &str) -> Option<Money> {
    let c = PATTERNS.budget.captures(text)?;
    let whole: i64 = c[2].replace(',', "").parse().ok()?;
    let cents: i64 = match c.get(3) {
        Some(m) if m.as_str().len() == 1 => m.as_str().parse::<i64>().ok()? * 10,
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    let multiplier = if c.get(4).is_some() { 1000 } else { 1 };
    let minor = whole.checked_mul(100)?.checked_add(cents)?.checked_mul(multiplier)?;

    let symbol = c.get(5).or_else(|| c.get(1)).map(|m| m.as_str().to_lowercase());
    let currency = match symbol.as_deref() {
        Some("€") | Some("euro") | Some("euros") | Some("eur") => "EUR",
        Some("$") | Some("usd") | Some("dollar") | Some("dollars") => "USD",
        Some("£") | Some("gbp") | Some("pound") | Some("pounds") => "GBP",
        _ => default_currency,
    };
    (minor > 0).then(|| Money::new(minor, currency))
}
