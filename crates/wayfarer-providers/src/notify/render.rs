//! Confirmation email rendering.

use std::fmt::Write;

use wayfarer_core::{TravelPackage, TravelRequest};

/// Used when neither the flight nor the hotel carries a booking link.
pub const DEFAULT_BOOKING_URL: &str = "https://www.kiwi.com";

pub fn subject(request: &TravelRequest) -> String {
    format!(
        "Your Perfect Trip: {} → {}",
        request.origin.as_deref().unwrap_or("?"),
        request.destination.as_deref().unwrap_or("?")
    )
}

/// The link the "Book now" button points at.
pub fn booking_url(package: &TravelPackage) -> &str {
    package
        .flight()
        .booking_url
        .as_deref()
        .or(package.accommodation().booking_url.as_deref())
        .unwrap_or(DEFAULT_BOOKING_URL)
}

fn long_date(request: &TravelRequest) -> String {
    request
        .departure_date
        .map(|d| d.format("%B %d, %Y").to_string())
        .unwrap_or_else(|| "Not specified".to_string())
}

/// Plain-text rendering, also used as the chat summary of a package.
pub fn text_body(request: &TravelRequest, package: &TravelPackage) -> String {
    let flight = package.flight();
    let hotel = package.accommodation();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Trip: {} → {}",
        request.origin.as_deref().unwrap_or("?"),
        request.destination.as_deref().unwrap_or("?")
    );
    let _ = writeln!(out, "Departure: {}", long_date(request));
    if let Some(ret) = request.return_date {
        let _ = writeln!(out, "Return: {}", ret.format("%B %d, %Y"));
    }
    let _ = writeln!(out, "Travelers: {}", request.passengers);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Flight: {} {}, {} → {} ({}, {})",
        flight.airline,
        flight.flight_number,
        flight.departure_time,
        flight.arrival_time,
        flight.duration,
        stops_label(flight.stops)
    );
    let _ = writeln!(out, "Flight price: {}", flight.price);
    let _ = writeln!(
        out,
        "Stay: {} ({}{}), {} per night, {} total",
        hotel.name,
        hotel.kind,
        hotel
            .rating
            .map(|r| format!(", rated {:.1}/5", r))
            .unwrap_or_default(),
        hotel.price_per_night,
        hotel.total_price
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Total: {}", package.total_price());
    let _ = write!(out, "Book: {}", booking_url(package));
    out
}

fn stops_label(stops: u32) -> String {
    match stops {
        0 => "direct".to_string(),
        1 => "1 stop".to_string(),
        n => format!("{} stops", n),
    }
}

/// HTML rendering sent to the traveler.
pub fn html_body(request: &TravelRequest, package: &TravelPackage) -> String {
    let flight = package.flight();
    let hotel = package.accommodation();
    let origin = escape(request.origin.as_deref().unwrap_or("?"));
    let destination = escape(request.destination.as_deref().unwrap_or("?"));

    let mut rows = String::new();
    let mut row = |label: &str, value: &str| {
        let _ = write!(
            rows,
            "<tr><td style=\"padding: 6px 0; font-weight: bold;\">{}</td><td>{}</td></tr>",
            label, value
        );
    };
    row("Airline:", &escape(&format!("{} {}", flight.airline, flight.flight_number)));
    row("Departure:", &escape(&flight.departure_time));
    row("Arrival:", &escape(&flight.arrival_time));
    row("Duration:", &escape(&flight.duration));
    row("Type:", &stops_label(flight.stops));
    row("Price:", &flight.price.to_string());
    let flight_rows = std::mem::take(&mut rows);

    let mut row = |label: &str, value: &str| {
        let _ = write!(
            rows,
            "<tr><td style=\"padding: 6px 0; font-weight: bold;\">{}</td><td>{}</td></tr>",
            label, value
        );
    };
    row("Hotel:", &escape(&hotel.name));
    row("Type:", &escape(&hotel.kind));
    if let Some(rating) = hotel.rating {
        row("Rating:", &format!("{:.1}/5", rating));
    }
    row("Price per night:", &hotel.price_per_night.to_string());
    row("Total accommodation:", &hotel.total_price.to_string());
    if !hotel.amenities.is_empty() {
        row("Amenities:", &escape(&hotel.amenities.join(", ")));
    }
    let hotel_rows = rows;

    let duration = request
        .duration_days
        .map(|d| format!("{} days", d))
        .unwrap_or_else(|| "Not specified".to_string());
    let budget = request
        .budget
        .as_ref()
        .map(|b| format!("<li><strong>Budget:</strong> {}</li>", b))
        .unwrap_or_default();

    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<h2>Your trip from {origin} to {destination} is ready</h2>
<p>Here is the best package we found for you.</p>
<h3>Your Flight</h3>
<table style="width: 100%; border-collapse: collapse;">{flight_rows}</table>
<h3>Your Accommodation</h3>
<table style="width: 100%; border-collapse: collapse;">{hotel_rows}</table>
<h3>Total: {total}</h3>
<p><a href="{url}" style="background: #3498db; color: #fff; padding: 12px 24px; text-decoration: none; border-radius: 6px;">Book now</a></p>
<h3>Trip details</h3>
<ul>
<li><strong>Route:</strong> {origin} → {destination}</li>
<li><strong>Date:</strong> {date}</li>
<li><strong>Travelers:</strong> {passengers}</li>
<li><strong>Duration:</strong> {duration}</li>
{budget}
</ul>
<p style="color: #7f8c8d; font-size: 12px;">Prices are subject to availability and may change.</p>
</body>
</html>
"#,
        total = package.total_price(),
        url = escape(booking_url(package)),
        date = long_date(request),
        passengers = request.passengers,
    )
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
