use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::target::{Locator, Target};

/// Placeholder written back in place of secrets on the read API
pub const REDACTED: &str = "***";

pub const DEFAULT_AGENT_PORT: u16 = 8888;

fn default_check_interval() -> u64 {
    30
}

fn default_alert_cooldown() -> u64 {
    300
}

fn default_web_host() -> String {
    "127.0.0.1".to_string()
}

fn default_web_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

fn default_retries() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    2
}

fn default_heartbeat_interval() -> u64 {
    30
}

/// The persisted watchdog configuration document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Seconds between the end of one poll cycle and the start of the next
    #[serde(default = "default_check_interval", alias = "check_interval")]
    pub check_interval_seconds: u64,
    /// Minimum seconds between two delivered alerts for the same pair
    #[serde(default = "default_alert_cooldown", alias = "alert_cooldown")]
    pub alert_cooldown_seconds: u64,
    #[serde(default = "default_web_host")]
    pub web_host: String,
    #[serde(default = "default_web_port")]
    pub web_port: u16,
    pub notification: NotificationConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    pub monitors: Vec<TargetConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NotificationConfig {
    /// Chat robot webhook endpoint
    #[serde(alias = "dingtalk_webhook")]
    pub webhook_url: String,
    /// Optional signing secret
    #[serde(default, alias = "dingtalk_secret", skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HeartbeatConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_heartbeat_interval", alias = "interval")]
    pub interval_seconds: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            interval_seconds: default_heartbeat_interval(),
        }
    }
}

/// One monitored target as stored in the config file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub name: String,
    /// Watch the local process table instead of a remote agent
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub local: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub processes: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl TargetConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("monitor name must not be empty".into()));
        }
        if self.processes.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "monitor '{}' must watch at least one process",
                self.name
            )));
        }
        if !self.local {
            match self.host.as_deref() {
                Some(h) if !h.trim().is_empty() => {}
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "monitor '{}' is missing required field: host",
                        self.name
                    )))
                }
            }
            match self.port {
                Some(p) if p != 0 => {}
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "monitor '{}' is missing required field: port",
                        self.name
                    )))
                }
            }
        }
        Ok(())
    }

    pub fn locator(&self) -> Locator {
        if self.local {
            return Locator::Local;
        }
        Locator::Remote {
            host: self.host.clone().unwrap_or_default(),
            port: self.port.unwrap_or(DEFAULT_AGENT_PORT),
        }
    }

    pub fn to_target(&self) -> Target {
        let mut seen = HashSet::new();
        let processes = self
            .processes
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty() && seen.insert(p.clone()))
            .collect();

        Target {
            name: self.name.clone(),
            locator: self.locator(),
            enabled: self.enabled,
            processes,
            description: self.description.clone(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "check_interval_seconds must be greater than zero".into(),
            ));
        }
        if self.heartbeat.enabled && self.heartbeat.interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat.interval_seconds must be greater than zero".into(),
            ));
        }
        ensure_unique_names(&self.monitors)?;
        for monitor in &self.monitors {
            monitor.validate()?;
        }
        Ok(())
    }

    pub fn targets(&self) -> Vec<Target> {
        self.monitors.iter().map(TargetConfig::to_target).collect()
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    pub fn alert_cooldown(&self) -> Duration {
        Duration::from_secs(self.alert_cooldown_seconds)
    }

    /// Copy safe to hand out over the read API
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.notification.secret.is_some() {
            copy.notification.secret = Some(REDACTED.to_string());
        }
        copy
    }

    /// Keeps the stored secret when an edited document echoes back the mask
    pub fn restore_secret_from(&mut self, current: &AppConfig) {
        if self.notification.secret.as_deref() == Some(REDACTED) {
            self.notification.secret = current.notification.secret.clone();
        }
    }
}

pub fn ensure_unique_names(monitors: &[TargetConfig]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for m in monitors {
        if !names.insert(m.name.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "monitor name '{}' already exists",
                m.name
            )));
        }
    }
    Ok(())
}
