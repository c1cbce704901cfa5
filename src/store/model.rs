//! Audit rows written by the telemetry recorder.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::telemetry::CorrelationId;

/// Column format for `RequestTime` / `ResponseTime`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of `RequestLogs`.
#[derive(Debug, Clone, Serialize)]
pub struct RequestLogEntry {
    pub request_id: CorrelationId,
    pub http_method: String,
    pub request_path: String,
    /// Parsed query parameters, `None` when the query is empty.
    pub query_string: Option<serde_json::Value>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    /// Truncated to whole seconds.
    pub request_time: DateTime<Utc>,
    pub http_version: String,
}

impl RequestLogEntry {
    /// Query parameters as stored in the `QueryString` column.
    pub fn query_string_column(&self) -> Option<String> {
        self.query_string.as_ref().map(|q| q.to_string())
    }

    pub fn request_time_column(&self) -> String {
        self.request_time.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// One row of `ResponseLogs`.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseLogEntry {
    pub request_id: CorrelationId,
    pub status_code: u16,
    /// Header snapshot taken when the handler returned.
    pub response_headers: serde_json::Value,
    /// Truncated to whole seconds.
    pub response_time: DateTime<Utc>,
    pub duration_ms: u64,
    pub server_ip: Option<String>,
    pub response_size_in_bytes: u64,
}

impl ResponseLogEntry {
    pub fn response_headers_column(&self) -> String {
        self.response_headers.to_string()
    }

    pub fn response_time_column(&self) -> String {
        self.response_time.format(TIMESTAMP_FORMAT).to_string()
    }
}
