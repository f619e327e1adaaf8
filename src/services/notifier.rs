use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Local, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

use crate::models::{AlertEvent, NotificationConfig};

type HmacSha256 = Hmac<Sha256>;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);
const PLACEHOLDER_TOKEN: &str = "YOUR_ACCESS_TOKEN_HERE";

/// Best-effort message delivery.
///
/// Implementations retry on their own and report the final outcome; every
/// failure class maps to `false`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> bool;
}

#[derive(Serialize)]
struct TextMessage<'a> {
    msgtype: &'a str,
    text: TextContent<'a>,
}

#[derive(Serialize)]
struct TextContent<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct RobotReply {
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// DingTalk custom robot webhook
pub struct DingTalkNotifier {
    client: Client,
    webhook_url: String,
    secret: Option<String>,
    retries: u32,
    backoff: Duration,
}

impl DingTalkNotifier {
    pub fn new(config: &NotificationConfig) -> Self {
        Self {
            client: Client::new(),
            webhook_url: config.webhook_url.clone(),
            secret: config.secret.clone().filter(|s| !s.is_empty()),
            retries: config.retries.max(1),
            backoff: Duration::from_secs(config.retry_backoff_seconds),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.webhook_url.is_empty() && !self.webhook_url.contains(PLACEHOLDER_TOKEN)
    }

    /// Webhook URL with `timestamp` and `sign` appended when a secret is set
    fn signed_url(&self, timestamp_ms: i64) -> String {
        match &self.secret {
            Some(secret) => {
                let sign = sign(secret, timestamp_ms);
                let sep = if self.webhook_url.contains('?') { '&' } else { '?' };
                format!(
                    "{}{}timestamp={}&sign={}",
                    self.webhook_url,
                    sep,
                    timestamp_ms,
                    urlencoding::encode(&sign)
                )
            }
            None => self.webhook_url.clone(),
        }
    }

    async fn send_once(&self, message: &str) -> Result<(), String> {
        let payload = TextMessage {
            msgtype: "text",
            text: TextContent { content: message },
        };
        let url = self.signed_url(Utc::now().timestamp_millis());

        let response = self
            .client
            .post(&url)
            .timeout(SEND_TIMEOUT)
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if response.status() != StatusCode::OK {
            return Err(format!("HTTP {}", response.status()));
        }

        let reply: RobotReply = response
            .json()
            .await
            .map_err(|e| format!("unreadable reply: {}", e))?;

        if reply.errcode != 0 {
            return Err(format!("robot rejected message: {} {}", reply.errcode, reply.errmsg));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for DingTalkNotifier {
    async fn notify(&self, message: &str) -> bool {
        if !self.is_configured() {
            log::warn!("Notification webhook not configured, message dropped");
            return false;
        }

        for attempt in 1..=self.retries {
            match self.send_once(message).await {
                Ok(()) => {
                    log::info!("Notification sent: {}", preview(message));
                    return true;
                }
                Err(e) => {
                    log::error!("Notification attempt {}/{} failed: {}", attempt, self.retries, e);
                }
            }
            if attempt < self.retries {
                tokio::time::sleep(self.backoff * attempt).await;
            }
        }
        false
    }
}

/// `base64(hmac_sha256(secret, "{timestamp}\n{secret}"))`
pub fn sign(secret: &str, timestamp_ms: i64) -> String {
    let string_to_sign = format!("{}\n{}", timestamp_ms, secret);
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(string_to_sign.as_bytes());
    general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

fn preview(message: &str) -> String {
    let first: String = message.chars().take(50).collect();
    first.replace('\n', " ")
}

fn local_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn alert_message(event: &AlertEvent, reporter: &str) -> String {
    let title = if event.is_reminder() {
        "[Process Alert - still stopped]"
    } else {
        "[Process Alert]"
    };
    let mut lines = vec![
        title.to_string(),
        format!("Monitor: {}", event.key.target),
        format!("Location: {}", event.locator),
        format!("Process: {}", event.key.process),
        "Status: stopped".to_string(),
    ];
    if let Some(since) = event.down_since {
        lines.push(format!("Down since: {}", local_time(since)));
    }
    lines.push(format!("Time: {}", local_time(event.observed_at)));
    lines.push(format!("Reported by: {}", reporter));
    lines.join("\n")
}

pub fn startup_message(reporter: &str) -> String {
    format!(
        "[Watchdog Started]\nHost: {}\nStatus: service started\nTime: {}",
        reporter,
        local_time(Utc::now())
    )
}

pub fn test_message(reporter: &str) -> String {
    format!(
        "[Test Message]\nHost: {}\nStatus: notification channel works\nTime: {}",
        reporter,
        local_time(Utc::now())
    )
}
