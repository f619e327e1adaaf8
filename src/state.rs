use std::sync::Arc;

use crate::metrics::WatchdogMetrics;
use crate::services::{AgentClient, ConfigStore, Notifier, StatusReporter};

/// Everything the HTTP handlers need, built once at startup.
pub struct AppContext {
    pub config_store: ConfigStore,
    pub status: StatusReporter,
    pub notifier: Arc<dyn Notifier>,
    pub agent: AgentClient,
    pub metrics: Arc<WatchdogMetrics>,
    /// Host name reported in notification messages
    pub reporter: String,
}

pub type AppState = Arc<AppContext>;
