//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use wayfarer_chat::TripOrchestrator;
use wayfarer_core::{CapabilityFlags, WayfarerConfig};

/// Shared application state.
///
/// Cloned into every handler; all fields are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Configuration the server was started with.
    pub config: Arc<WayfarerConfig>,
    /// Dialogue engine and session store.
    pub orchestrator: Arc<TripOrchestrator>,
    /// Which external services have credentials.
    pub capabilities: CapabilityFlags,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: WayfarerConfig,
        orchestrator: TripOrchestrator,
        capabilities: CapabilityFlags,
    ) -> Self {
        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            capabilities,
            start_time: Instant::now(),
        }
    }
}
