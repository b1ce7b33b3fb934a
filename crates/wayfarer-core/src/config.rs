use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, WayfarerError};

/// Environment variable holding the language-model API key.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variables holding the Amadeus client credentials.
pub const AMADEUS_API_KEY: &str = "AMADEUS_API_KEY";
pub const AMADEUS_API_SECRET: &str = "AMADEUS_API_SECRET";
/// Environment variable holding a Gmail OAuth access token.
pub const GMAIL_ACCESS_TOKEN: &str = "GMAIL_ACCESS_TOKEN";
/// Optional override for the sender address.
pub const GMAIL_SENDER: &str = "GMAIL_SENDER";

/// Top-level configuration for Wayfarer.
///
/// Loaded from a TOML file. Secrets are never read from the file; see
/// [`Credentials`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WayfarerConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub language_model: LanguageModelConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl WayfarerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WayfarerConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        let (config, source) = Self::load_with_source(path);
        if let ConfigSource::Invalid(e) = &source {
            warn!(
                "Failed to load config from {}: {}. Using defaults.",
                path.display(),
                e
            );
        }
        config
    }

    /// Like [`load_or_default`](Self::load_or_default), but also reports where
    /// the configuration came from so the caller can log it once tracing is up.
    pub fn load_with_source(path: &Path) -> (Self, ConfigSource) {
        if !path.exists() {
            return (Self::default(), ConfigSource::Missing);
        }
        match Self::load(path) {
            Ok(config) => (config, ConfigSource::File),
            Err(e) => (Self::default(), ConfigSource::Invalid(e.to_string())),
        }
    }

    /// Check settings that must agree with each other.
    ///
    /// Budgets are compared against quoted prices, so the currency assumed for
    /// budgets must be the one searches quote in.
    pub fn validate(&self) -> Result<()> {
        if !self
            .chat
            .default_currency
            .eq_ignore_ascii_case(&self.search.currency)
        {
            return Err(WayfarerError::Config(format!(
                "chat.default_currency ({}) must match search.currency ({})",
                self.chat.default_currency, self.search.currency
            )));
        }
        Ok(())
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| WayfarerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from the file.
    File,
    /// No file at the path; defaults used.
    Missing,
    /// The file could not be read or parsed; defaults used.
    Invalid(String),
}

/// Server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub host: String,
    pub port: u16,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            log_level: "info".to_string(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}

/// Language-model extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageModelConfig {
    pub model: String,
    pub temperature: f32,
    /// Base URL of an OpenAI-compatible chat completions API.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for LanguageModelConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.1,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Flight and accommodation search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Force deterministic mock results even when credentials exist.
    pub use_mock: bool,
    pub base_url: String,
    /// ISO 4217 currency code prices are quoted in.
    pub currency: String,
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            use_mock: true,
            base_url: "https://test.api.amadeus.com".to_string(),
            currency: "EUR".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Confirmation email settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Sender address used in the `From` header.
    pub sender: String,
    pub api_base_url: String,
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            sender: "trips@wayfarer.local".to_string(),
            api_base_url: "https://gmail.googleapis.com/gmail/v1".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Dialogue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub max_message_length: usize,
    /// Messages kept per session; older ones are dropped first.
    pub max_history: usize,
    /// Currency assumed for budgets stated without one.
    pub default_currency: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_length: 2000,
            max_history: 50,
            default_currency: "EUR".to_string(),
        }
    }
}

/// Secrets supplied through the environment.
///
/// Blank values are treated as absent.
#[derive(Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub amadeus_api_key: Option<String>,
    pub amadeus_api_secret: Option<String>,
    pub gmail_access_token: Option<String>,
    pub gmail_sender: Option<String>,
}

impl Credentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            openai_api_key: get(OPENAI_API_KEY),
            amadeus_api_key: get(AMADEUS_API_KEY),
            amadeus_api_secret: get(AMADEUS_API_SECRET),
            gmail_access_token: get(GMAIL_ACCESS_TOKEN),
            gmail_sender: get(GMAIL_SENDER),
        }
    }

    pub fn capabilities(&self) -> CapabilityFlags {
        CapabilityFlags {
            language_model: self.openai_api_key.is_some(),
            search: self.amadeus_api_key.is_some() && self.amadeus_api_secret.is_some(),
            email: self.gmail_access_token.is_some(),
        }
    }

    /// The language-model key, or `ConfigurationMissing` when it is absent.
    pub fn require_language_model(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| WayfarerError::ConfigurationMissing(OPENAI_API_KEY.to_string()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn mask(v: &Option<String>) -> &'static str {
            if v.is_some() {
                "<set>"
            } else {
                "<unset>"
            }
        }
        f.debug_struct("Credentials")
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("amadeus_api_key", &mask(&self.amadeus_api_key))
            .field("amadeus_api_secret", &mask(&self.amadeus_api_secret))
            .field("gmail_access_token", &mask(&self.gmail_access_token))
            .field("gmail_sender", &self.gmail_sender)
            .finish()
    }
}

/// Which external services have credentials configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityFlags {
    pub language_model: bool,
    pub search: bool,
    pub email: bool,
}

impl CapabilityFlags {
    /// Human-readable warnings for every missing capability.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.language_model {
            warnings.push(format!(
                "{} not set; using offline pattern extraction",
                OPENAI_API_KEY
            ));
        }
        if !self.search {
            warnings.push("Amadeus credentials not set; using mock search results".to_string());
        }
        if !self.email {
            warnings.push(format!(
                "{} not set; confirmation emails are disabled",
                GMAIL_ACCESS_TOKEN
            ));
        }
        warnings
    }
}
