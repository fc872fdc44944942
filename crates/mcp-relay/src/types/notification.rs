//! MCP notification types pushed to clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::RequestId;

pub const PROGRESS_METHOD: &str = "notifications/progress";
pub const PARTIAL_METHOD: &str = "notifications/partial";
pub const CANCELLED_METHOD: &str = "notifications/cancelled";
pub const INITIALIZED_METHOD: &str = "notifications/initialized";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressToken {
    String(String),
    Number(i64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressParams {
    pub progress_token: ProgressToken,
    pub progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A streamed partial result for an outstanding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialResultParams {
    pub request_id: RequestId,
    pub partial: Value,
}
