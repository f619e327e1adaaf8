use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::config::DEFAULT_AGENT_PORT;
use crate::services::agent_client::TEST_PROBE_TIMEOUT;
use crate::services::notifier::test_message;
use crate::state::AppState;

fn default_port() -> u16 {
    DEFAULT_AGENT_PORT
}

#[derive(Deserialize)]
pub struct TestAgentRequest {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

pub async fn test_agent(
    data: web::Data<AppState>,
    req: web::Json<TestAgentRequest>,
) -> Result<HttpResponse, ApiError> {
    let host = req.host.trim();
    if host.is_empty() {
        return Err(ApiError::BadRequest("host is required".into()));
    }

    match data.agent.check_health(host, req.port, TEST_PROBE_TIMEOUT).await {
        Some(health) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Agent reachable",
            "data": health
        }))),
        None => Err(ApiError::Upstream(format!(
            "cannot reach agent at {}:{}, check host and port",
            host, req.port
        ))),
    }
}

pub async fn test_notification(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let message = test_message(&data.reporter);
    if data.notifier.notify(&message).await {
        Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "message": "Test message sent"
        })))
    } else {
        Err(ApiError::Upstream(
            "failed to send test message, check the notification settings".into(),
        ))
    }
}
