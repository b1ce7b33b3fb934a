//! Wayfarer application binary - composition root.
//!
//! 1. Parse CLI flags, load configuration from TOML and validate it
//! 2. Read provider credentials from the environment
//! 3. Pick live or offline providers for extraction, search and email
//! 4. Start the axum REST API server

mod cli;

use std::sync::Arc;

use clap::Parser;
use wayfarer_api::routes;
use wayfarer_api::state::AppState;
use wayfarer_chat::TripOrchestrator;
use wayfarer_core::{ConfigSource, Credentials, WayfarerConfig};
use wayfarer_providers::{
    AmadeusSearch, DisabledMailer, GmailMailer, Mailer, MockSearch, OpenAiExtractor,
    PatternExtractor, TripExtractor, TripSearch,
};

use crate::cli::CliArgs;

fn build_extractor(config: &WayfarerConfig, credentials: &Credentials) -> Arc<dyn TripExtractor> {
    let currency = &config.chat.default_currency;
    match credentials.require_language_model() {
        Ok(key) => match OpenAiExtractor::new(key, &config.language_model, currency) {
            Ok(extractor) => return Arc::new(extractor),
            Err(e) => tracing::warn!(error = %e, "Language model client unavailable"),
        },
        Err(e) => tracing::warn!(error = %e, "Falling back to pattern extraction"),
    }
    Arc::new(PatternExtractor::new(currency))
}

fn build_search(config: &WayfarerConfig, credentials: &Credentials) -> Arc<dyn TripSearch> {
    let mock = || -> Arc<dyn TripSearch> { Arc::new(MockSearch::new(&config.search.currency)) };
    if config.search.use_mock {
        tracing::info!("Search configured to use mock results");
        return mock();
    }
    match (&credentials.amadeus_api_key, &credentials.amadeus_api_secret) {
        (Some(key), Some(secret)) => match AmadeusSearch::new(key, secret, &config.search) {
            Ok(search) => Arc::new(search),
            Err(e) => {
                tracing::warn!(error = %e, "Amadeus client unavailable; using mock search");
                mock()
            }
        },
        _ => mock(),
    }
}

fn build_mailer(config: &WayfarerConfig, credentials: &Credentials) -> Arc<dyn Mailer> {
    let Some(token) = &credentials.gmail_access_token else {
        return Arc::new(DisabledMailer);
    };
    let sender = credentials
        .gmail_sender
        .clone()
        .unwrap_or_else(|| config.email.sender.clone());
    match GmailMailer::new(token, sender, &config.email) {
        Ok(mailer) => Arc::new(mailer),
        Err(e) => {
            tracing::warn!(error = %e, "Gmail client unavailable; emails disabled");
            Arc::new(DisabledMailer)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config. Its outcome is reported once the subscriber is installed.
    let config_file = args.resolve_config_path();
    let (mut config, source) = WayfarerConfig::load_with_source(&config_file);
    if let Some(host) = &args.host {
        config.general.host = host.clone();
    }
    config.general.port = args.resolve_port(config.general.port);
    if let Some(level) = &args.log_level {
        config.general.log_level = level.clone();
    }

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Wayfarer v{}", env!("CARGO_PKG_VERSION"));
    match &source {
        ConfigSource::File => {
            tracing::info!(path = %config_file.display(), "Configuration loaded")
        }
        ConfigSource::Missing => tracing::info!(
            path = %config_file.display(),
            "No configuration file found; using defaults"
        ),
        ConfigSource::Invalid(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Configuration file could not be loaded; using defaults"
        ),
    }
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Refusing to start with inconsistent configuration");
        return Err(e.into());
    }

    // Providers.
    let credentials = Credentials::from_env();
    let capabilities = credentials.capabilities();
    for warning in capabilities.warnings() {
        tracing::warn!("{}", warning);
    }

    let orchestrator = TripOrchestrator::new(
        config.chat.clone(),
        build_extractor(&config, &credentials),
        build_search(&config, &credentials),
        build_mailer(&config, &credentials),
    );

    // API server.
    let state = AppState::new(config.clone(), orchestrator, capabilities);
    routes::start_server(&config, state).await?;

    Ok(())
}
