//! CLI argument definitions for the Wayfarer server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "WAYFARER_CONFIG";
/// Environment variable overriding the listen port.
pub const PORT_ENV: &str = "WAYFARER_PORT";

/// Wayfarer: conversational trip-booking middleware.
#[derive(Parser, Debug, Default)]
#[command(name = "wayfarer", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Address to bind the API server to.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > WAYFARER_CONFIG env var > ./wayfarer.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        self.resolve_config_path_with(|key| std::env::var(key).ok())
    }

    pub fn resolve_config_path_with<F>(&self, env: F) -> PathBuf
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Some(p) = env(CONFIG_ENV).filter(|p| !p.trim().is_empty()) {
            return PathBuf::from(p);
        }
        PathBuf::from("wayfarer.toml")
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > WAYFARER_PORT env var > config file value > 8000.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        self.resolve_port_with(config_port, |key| std::env::var(key).ok())
    }

    pub fn resolve_port_with<F>(&self, config_port: u16, env: F) -> u16
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(p) = self.port {
            return p;
        }
        if let Some(p) = env(PORT_ENV).and_then(|v| v.trim().parse::<u16>().ok()) {
            return p;
        }
        if config_port != 0 {
            return config_port;
        }
        8000
    }
}
