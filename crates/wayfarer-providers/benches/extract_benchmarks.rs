//! Benchmarks for offline trip extraction.
//!
//! The pattern extractor runs on every chat turn when no language model is
//! configured, so it should stay well under a millisecond per message.

use std::time::Duration;

use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, Criterion};
use wayfarer_core::TravelRequest;
use wayfarer_providers::PatternExtractor;

const MESSAGES: &[&str] = &[
    "Book a trip from Porto to London next weekend for 3 days under 500 euros",
    "my email is jane.doe@example.com",
    "I want to travel to berlin on friday for a week with a budget of €1,200",
    "flights from new york to san francisco leaving 2026-11-02 returning 2026-11-09 for 2 people",
    "hello, can you help me plan something nice?",
];

fn bench_pattern_extraction(c: &mut Criterion) {
    let extractor = PatternExtractor::new("EUR");
    let today = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap_or_default();
    let known = TravelRequest::default();

    let mut group = c.benchmark_group("pattern_extraction");
    group.sample_size(200);
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("single_message", |b| {
        let mut idx = 0usize;
        b.iter(|| {
            let message = MESSAGES[idx % MESSAGES.len()];
            idx += 1;
            extractor.extract_at(message, &known, today)
        });
    });

    group.bench_function("conversation", |b| {
        b.iter(|| {
            let mut request = TravelRequest::default();
            for message in MESSAGES {
                let extraction = extractor.extract_at(message, &request, today);
                request.merge(extraction.patch);
            }
            request
        });
    });

    group.finish();
}

criterion_group!(benches, bench_pattern_extraction);
criterion_main!(benches);
