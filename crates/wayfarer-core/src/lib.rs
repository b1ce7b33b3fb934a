pub mod config;
pub mod error;
pub mod types;

pub use config::{CapabilityFlags, ConfigSource, Credentials, WayfarerConfig};
pub use error::{Result, WayfarerError};
pub use types::*;
