use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Where a target's process list comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// The machine the watchdog runs on
    Local,
    /// A remote agent reachable over HTTP
    Remote { host: String, port: u16 },
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Local => write!(f, "local"),
            Locator::Remote { host, port } => write!(f, "{}:{}", host, port),
        }
    }
}

/// A monitored endpoint, read-only once the watchdog is running
#[derive(Debug, Clone)]
pub struct Target {
    /// Unique, human-readable identifier
    pub name: String,
    pub locator: Locator,
    pub enabled: bool,
    /// Watched process names in configuration order, without duplicates
    pub processes: Vec<String>,
    pub description: String,
}

/// Last known state of a watched process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    /// Not observed yet
    #[default]
    Unknown,
    Running,
    Stopped,
}

impl ProcessState {
    /// `None` while unknown, for the status view
    pub fn as_running(self) -> Option<bool> {
        match self {
            ProcessState::Unknown => None,
            ProcessState::Running => Some(true),
            ProcessState::Stopped => Some(false),
        }
    }
}

/// Identifies one tracked (target, process) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    pub target: String,
    pub process: String,
}

impl PairKey {
    pub fn new(target: &str, process: &str) -> Self {
        Self {
            target: target.to_string(),
            process: process.to_string(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.target, self.process)
    }
}

/// Per-pair state carried across poll cycles
#[derive(Debug, Clone, Default)]
pub struct TrackedPair {
    pub state: ProcessState,
    /// Start of the current outage, set on the Running -> Stopped edge
    pub down_since: Option<DateTime<Utc>>,
    /// True while an outage that started from Running is in progress.
    /// Armed pairs keep producing alert candidates, gated by the cooldown.
    pub alert_armed: bool,
    /// An alert for the current outage has reached the notifier
    pub alert_delivered: bool,
}

/// A set of running process names together with its matching rule
#[derive(Debug, Clone)]
pub struct ProcessSet {
    names: HashSet<String>,
    case_insensitive: bool,
}

impl ProcessSet {
    /// Exact-string matching, used for names reported by a remote agent
    pub fn exact<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            case_insensitive: false,
        }
    }

    /// Case-insensitive matching, used for the local process table
    pub fn case_insensitive<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.into().to_lowercase())
                .collect(),
            case_insensitive: true,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        if self.case_insensitive {
            self.names.contains(&name.to_lowercase())
        } else {
            self.names.contains(name)
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Result of asking one target for its running processes
#[derive(Debug, Clone)]
pub enum Observation {
    /// The target could not be queried this cycle
    Unavailable { reason: String },
    Processes(ProcessSet),
}

impl Observation {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Observation::Unavailable {
            reason: reason.into(),
        }
    }
}

/// A stop alert that passed the cooldown check and awaits delivery
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub key: PairKey,
    /// Display form of the target's locator
    pub locator: String,
    /// An earlier alert for this outage was already delivered
    pub reminder: bool,
    pub observed_at: DateTime<Utc>,
    pub down_since: Option<DateTime<Utc>>,
}

impl AlertEvent {
    pub fn is_reminder(&self) -> bool {
        self.reminder
    }
}
