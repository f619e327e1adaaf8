use serde::{Deserialize, Serialize};

/// `GET /api/health` body of a remote agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentHealth {
    pub status: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub hostname: String,
}

/// `GET /api/processes` body of a remote agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessListResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default)]
    pub processes: Vec<String>,
    #[serde(default)]
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /api/process/{name}` body of a remote agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessCheckResponse {
    pub status: String,
    pub process: String,
    pub running: bool,
    pub count: usize,
}
