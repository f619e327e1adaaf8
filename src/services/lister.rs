use async_trait::async_trait;

use crate::models::{Locator, Observation, ProcessSet, Target};
use crate::services::agent_client::AgentClient;
use crate::services::process_checker::running_process_names;

/// Produces the current process set of a target, or `Unavailable`.
#[async_trait]
pub trait TargetLister: Send + Sync {
    async fn list_running(&self, target: &Target) -> Observation;
}

/// Scans the local process table; names match case-insensitively.
pub struct LocalLister;

#[async_trait]
impl TargetLister for LocalLister {
    async fn list_running(&self, _target: &Target) -> Observation {
        let set = match tokio::task::spawn_blocking(running_process_names).await {
            Ok(names) => ProcessSet::case_insensitive(names),
            Err(e) => return Observation::unavailable(format!("process table scan failed: {}", e)),
        };
        // The watchdog itself is always running, so an empty table is a failed read
        if set.is_empty() {
            return Observation::unavailable("process table scan returned no processes");
        }
        log::debug!("Local process table: {} names", set.len());
        Observation::Processes(set)
    }
}

/// Asks a remote agent; names match exactly as the agent reports them.
pub struct RemoteLister {
    client: AgentClient,
}

impl RemoteLister {
    pub fn new(client: AgentClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TargetLister for RemoteLister {
    async fn list_running(&self, target: &Target) -> Observation {
        let Locator::Remote { host, port } = &target.locator else {
            return Observation::unavailable("target has no remote locator");
        };

        match self.client.list_processes(host, *port).await {
            Ok(names) => Observation::Processes(ProcessSet::exact(names)),
            Err(reason) => Observation::unavailable(reason),
        }
    }
}

/// Routes each target to the lister matching its locator.
pub struct CompositeLister {
    local: Box<dyn TargetLister>,
    remote: Box<dyn TargetLister>,
}

impl CompositeLister {
    pub fn new(local: Box<dyn TargetLister>, remote: Box<dyn TargetLister>) -> Self {
        Self { local, remote }
    }

    pub fn from_client(client: AgentClient) -> Self {
        Self::new(Box::new(LocalLister), Box::new(RemoteLister::new(client)))
    }
}

#[async_trait]
impl TargetLister for CompositeLister {
    async fn list_running(&self, target: &Target) -> Observation {
        match target.locator {
            Locator::Local => self.local.list_running(target).await,
            Locator::Remote { .. } => self.remote.list_running(target).await,
        }
    }
}
