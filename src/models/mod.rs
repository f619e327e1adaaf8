pub mod agent;
pub mod config;
pub mod status;
pub mod target;

pub use agent::{AgentHealth, ProcessCheckResponse, ProcessListResponse};
pub use config::{AppConfig, HeartbeatConfig, NotificationConfig, TargetConfig};
pub use status::{AgentStatus, ProcessStatus, StatusReport, TargetStatus};
pub use target::{AlertEvent, Locator, Observation, PairKey, ProcessSet, ProcessState, Target, TrackedPair};
