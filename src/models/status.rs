use serde::Serialize;

/// Agent reachability as shown on the status API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Online,
    Offline,
    Disabled,
    Local,
}

/// Per-process row of the status view
#[derive(Debug, Clone, Serialize)]
pub struct ProcessStatus {
    pub name: String,
    /// `null` until the first successful observation
    pub running: Option<bool>,
    /// `YYYY-MM-DD HH:MM:SS` or `never`
    pub last_alert: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetStatus {
    pub name: String,
    pub locator: String,
    pub enabled: bool,
    pub description: String,
    pub agent_status: AgentStatus,
    pub agent_hostname: Option<String>,
    /// Whether the last poll of this target got an answer
    pub reachable: Option<bool>,
    pub last_checked: Option<String>,
    pub processes: Vec<ProcessStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub monitors: Vec<TargetStatus>,
    pub heartbeat_enabled: bool,
    pub check_interval_seconds: u64,
    pub alert_cooldown_seconds: u64,
}
