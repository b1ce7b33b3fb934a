use thiserror::Error;

/// Top-level error type for Wayfarer.
///
/// Provider and dialogue crates define their own error enums; this one covers
/// configuration and the shared plumbing every crate touches.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WayfarerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for WayfarerError {
    fn from(err: toml::de::Error) -> Self {
        WayfarerError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for WayfarerError {
    fn from(err: toml::ser::Error) -> Self {
        WayfarerError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for WayfarerError {
    fn from(err: serde_json::Error) -> Self {
        WayfarerError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Wayfarer operations.
pub type Result<T> = std::result::Result<T, WayfarerError>;
