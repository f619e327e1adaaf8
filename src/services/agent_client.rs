use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::models::{AgentHealth, ProcessListResponse};

pub const PROCESS_LIST_TIMEOUT: Duration = Duration::from_secs(10);
pub const STATUS_PROBE_TIMEOUT: Duration = Duration::from_secs(3);
pub const TEST_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the remote agent contract
#[derive(Clone)]
pub struct AgentClient {
    client: Client,
    list_timeout: Duration,
}

impl AgentClient {
    pub fn new() -> Self {
        Self::with_timeout(PROCESS_LIST_TIMEOUT)
    }

    pub fn with_timeout(list_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            list_timeout,
        }
    }

    /// Lightweight reachability probe; `None` when the agent can't be reached,
    /// answers with a non-200 status or reports a status other than `ok`.
    pub async fn check_health(&self, host: &str, port: u16, timeout: Duration) -> Option<AgentHealth> {
        let url = format!("http://{}:{}/api/health", host, port);
        let response = match self.client.get(&url).timeout(timeout).send().await {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Agent {}:{} unreachable: {}", host, port, e);
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            log::warn!("Agent health check {}:{} failed: HTTP {}", host, port, response.status());
            return None;
        }

        match response.json::<AgentHealth>().await {
            Ok(health) if health.status == "ok" => Some(health),
            Ok(health) => {
                log::warn!("Agent {}:{} reports status '{}'", host, port, health.status);
                None
            }
            Err(e) => {
                log::warn!("Agent {}:{} returned an unreadable health body: {}", host, port, e);
                None
            }
        }
    }

    /// Fetches the agent's running process names.
    ///
    /// Transport errors, non-200 responses, undecodable bodies and bodies
    /// whose `status` is not `ok` are all reported as `Err` with a reason.
    pub async fn list_processes(&self, host: &str, port: u16) -> Result<Vec<String>, String> {
        let url = format!("http://{}:{}/api/processes", host, port);
        let response = self
            .client
            .get(&url)
            .timeout(self.list_timeout)
            .send()
            .await
            .map_err(|e| format!("request to {}:{} failed: {}", host, port, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(format!("agent {}:{} returned HTTP {}", host, port, status));
        }

        let body: ProcessListResponse = response
            .json()
            .await
            .map_err(|e| format!("agent {}:{} returned an unreadable body: {}", host, port, e))?;

        if body.status != "ok" {
            return Err(format!(
                "agent {}:{} reported an error: {}",
                host,
                port,
                body.error.unwrap_or_else(|| body.status.clone())
            ));
        }

        Ok(body.processes)
    }
}

impl Default for AgentClient {
    fn default() -> Self {
        Self::new()
    }
}
