use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::sync::watch;

use crate::models::HeartbeatConfig;

const PING_TIMEOUT: Duration = Duration::from_secs(10);
const PLACEHOLDER_UUID: &str = "YOUR_UUID_HERE";

/// Pings an external dead-man's-switch so the watchdog's own death is noticed.
///
/// Follows the healthchecks.io URL scheme: `<url>` for a ping, `<url>/start`
/// when the service boots and `<url>/fail` with a message body on failure.
pub struct HeartbeatMonitor {
    client: Client,
    enabled: bool,
    url: String,
    interval: Duration,
}

impl HeartbeatMonitor {
    pub fn new(config: &HeartbeatConfig) -> Self {
        Self {
            client: Client::new(),
            enabled: config.enabled,
            url: config.url.trim_end_matches('/').to_string(),
            interval: Duration::from_secs(config.interval_seconds.max(1)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.url.contains(PLACEHOLDER_UUID)
    }

    pub async fn ping(&self) -> bool {
        if !self.enabled {
            return false;
        }
        if !self.is_configured() {
            log::warn!("Heartbeat URL not configured, ping skipped");
            return false;
        }

        match self.client.get(&self.url).timeout(PING_TIMEOUT).send().await {
            Ok(resp) if resp.status() == StatusCode::OK => {
                log::debug!("Heartbeat sent");
                true
            }
            Ok(resp) => {
                log::warn!("Heartbeat rejected: HTTP {}", resp.status());
                false
            }
            Err(e) => {
                log::error!("Heartbeat failed: {}", e);
                false
            }
        }
    }

    pub async fn ping_start(&self) {
        if !self.enabled || !self.is_configured() {
            return;
        }
        let url = format!("{}/start", self.url);
        match self.client.get(&url).timeout(PING_TIMEOUT).send().await {
            Ok(_) => log::info!("Heartbeat start signal sent"),
            Err(e) => log::error!("Heartbeat start signal failed: {}", e),
        }
    }

    pub async fn ping_fail(&self, message: &str) {
        if !self.enabled || !self.is_configured() {
            return;
        }
        let url = format!("{}/fail", self.url);
        match self
            .client
            .post(&url)
            .timeout(PING_TIMEOUT)
            .body(message.to_string())
            .send()
            .await
        {
            Ok(_) => log::info!("Heartbeat failure signal sent: {}", message),
            Err(e) => log::error!("Heartbeat failure signal failed: {}", e),
        }
    }

    /// Pings every `interval` until shutdown; returns immediately when disabled.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if !self.enabled {
            log::info!("Heartbeat disabled");
            return;
        }

        log::info!("Heartbeat started, interval {}s", self.interval.as_secs());
        self.ping_start().await;

        loop {
            if *shutdown.borrow() {
                break;
            }
            self.ping().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        log::info!("Heartbeat stopped");
    }
}
