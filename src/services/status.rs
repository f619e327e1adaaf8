use futures::future::join_all;
use std::sync::Arc;

use crate::models::{AgentStatus, Locator, StatusReport, Target, TargetStatus};
use crate::services::agent_client::{AgentClient, STATUS_PROBE_TIMEOUT};
use crate::services::engine::StateEngine;

/// Read-only view over the engine for the status API
pub struct StatusReporter {
    engine: Arc<StateEngine>,
    agent: AgentClient,
    targets: Vec<Target>,
    heartbeat_enabled: bool,
    check_interval_seconds: u64,
    alert_cooldown_seconds: u64,
}

impl StatusReporter {
    pub fn new(
        engine: Arc<StateEngine>,
        agent: AgentClient,
        targets: Vec<Target>,
        heartbeat_enabled: bool,
        check_interval_seconds: u64,
        alert_cooldown_seconds: u64,
    ) -> Self {
        Self {
            engine,
            agent,
            targets,
            heartbeat_enabled,
            check_interval_seconds,
            alert_cooldown_seconds,
        }
    }

    /// Engine snapshot plus a live health probe of every enabled remote agent.
    /// Probes run concurrently so one dead agent costs at most the probe timeout.
    pub async fn report(&self) -> StatusReport {
        let snapshot = self.engine.snapshot(&self.targets);

        let monitors = join_all(
            self.targets
                .iter()
                .zip(snapshot)
                .map(|(target, status)| self.with_agent_health(target, status)),
        )
        .await;

        StatusReport {
            monitors,
            heartbeat_enabled: self.heartbeat_enabled,
            check_interval_seconds: self.check_interval_seconds,
            alert_cooldown_seconds: self.alert_cooldown_seconds,
        }
    }

    async fn with_agent_health(&self, target: &Target, mut status: TargetStatus) -> TargetStatus {
        if !target.enabled {
            return status;
        }
        if let Locator::Remote { host, port } = &target.locator {
            match self.agent.check_health(host, *port, STATUS_PROBE_TIMEOUT).await {
                Some(health) => {
                    status.agent_status = AgentStatus::Online;
                    status.agent_hostname = Some(health.hostname);
                }
                None => status.agent_status = AgentStatus::Offline,
            }
        }
        status
    }
}
