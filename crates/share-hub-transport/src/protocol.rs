//! Wire protocol for owners and viewers.
//!
//! Field names follow the client, hence `sessionID` rather than snake case.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /share_create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareCreateRequest {
    #[serde(rename = "sessionID")]
    pub session_id: String,
}

/// Response of `POST /share_create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareCreateResponse {
    pub secret: String,
    pub url: String,
}

/// Body of `POST /share_delete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareDeleteRequest {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    pub secret: String,
}

/// Body of `POST /share_sync`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareSyncRequest {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    pub secret: String,
    pub key: String,
    pub content: Value,
}

/// Query of `GET /share_poll` and `GET /share_data`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollQuery {
    pub id: Option<String>,
}

/// Empty JSON object response, `{}`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Empty {}
