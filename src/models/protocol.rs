//! Request/response payloads for the gateway REST protocol.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Body of `POST /v1/sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Client-chosen session name (shows up in gateway logs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,

    /// Session properties (defaults merged with custom overrides)
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

/// Response of `POST /v1/sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    /// Opaque handle of the created session
    pub session_handle: String,
}

/// Body of `POST /v1/sessions/{handle}/statements`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitStatementRequest {
    /// SQL text to execute
    pub statement: String,
}

/// Response of `POST /v1/sessions/{handle}/statements`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitStatementResponse {
    /// Opaque handle of the asynchronous operation
    pub operation_handle: String,
}
