//! Wire shapes for the newline-delimited JSON IPC protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcRequest {
    pub id: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "cached_at", skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<i64>,
}

impl IpcResponse {
    pub fn ok(id: impl Into<String>, result: Value) -> Self {
        Self { id: id.into(), result: Some(result), error: None, cached_at: None }
    }

    pub fn ok_cached(id: impl Into<String>, result: Value, cached_at: i64) -> Self {
        Self { id: id.into(), result: Some(result), error: None, cached_at: Some(cached_at) }
    }

    pub fn err(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self { id: id.into(), result: None, error: Some(error.into()), cached_at: None }
    }
}
