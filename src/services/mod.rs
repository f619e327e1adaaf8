pub mod agent_client;
pub mod config_store;
pub mod cooldown;
pub mod engine;
pub mod heartbeat;
pub mod lister;
pub mod notifier;
pub mod process_checker;
pub mod scheduler;
pub mod status;

pub use agent_client::AgentClient;
pub use config_store::ConfigStore;
pub use engine::StateEngine;
pub use heartbeat::HeartbeatMonitor;
pub use lister::{CompositeLister, TargetLister};
pub use notifier::{DingTalkNotifier, Notifier};
pub use scheduler::PollScheduler;
pub use status::StatusReporter;
