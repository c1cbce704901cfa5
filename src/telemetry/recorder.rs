//! Request/response audit middleware.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use serde_json::{Map, Value};

use crate::http::request::{client_address, host_name, http_version_label, parse_query};
use crate::observability::metrics;
use crate::store::{GatewayStore, RequestLogEntry};
use crate::telemetry::body::{CountingBody, ResponseCompletion};
use crate::telemetry::{wall_clock_seconds, CorrelationId};

/// Shared state of the telemetry layer.
pub struct TelemetryRecorder {
    store: Arc<dyn GatewayStore>,
    server_identity: Option<String>,
}

impl TelemetryRecorder {
    pub fn new(store: Arc<dyn GatewayStore>, server_identity: Option<String>) -> Self {
        Self {
            store,
            server_identity,
        }
    }

    /// Host identity recorded on response rows.
    fn server_ip<B>(&self, request: &Request<B>) -> Option<String> {
        self.server_identity
            .clone()
            .or_else(|| host_name(request))
    }
}

/// Build the request row for `request`.
pub fn request_log_entry<B>(request_id: CorrelationId, request: &Request<B>) -> RequestLogEntry {
    RequestLogEntry {
        request_id,
        http_method: request.method().to_string(),
        request_path: request.uri().path().to_string(),
        query_string: parse_query(request.uri().query()),
        client_ip: client_address(request).map(|ip| ip.to_string()),
        user_agent: request
            .headers()
            .get(axum::http::header::USER_AGENT)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned()),
        request_time: wall_clock_seconds(),
        http_version: http_version_label(request.version()).to_string(),
    }
}

/// Serialize headers as a JSON object keyed by lower-case name.
///
/// Repeated headers become arrays in the order they were added.
pub fn headers_to_json(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for name in headers.keys() {
        let mut values: Vec<Value> = headers
            .get_all(name)
            .iter()
            .map(|v| Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();

        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            Value::Array(values)
        };
        map.insert(name.as_str().to_string(), value);
    }
    Value::Object(map)
}

/// Middleware: correlate, log the request, then wrap the response body.
///
/// The request row is written before the rest of the stack runs. The
/// response row is written by a detached task once the body completes.
///
/// Response headers are the ones the application returned, snapshotted when
/// its response comes back through this layer. Headers the connection adds
/// while encoding (`date`, `content-length`, `transfer-encoding`) are not
/// part of the row.
pub async fn record_telemetry(
    State(recorder): State<Arc<TelemetryRecorder>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let request_id = CorrelationId::new();
    let started = Instant::now();

    let entry = request_log_entry(request_id, &request);
    let method = request.method().clone();
    let server_ip = recorder.server_ip(&request);

    tracing::debug!(
        request_id = %request_id,
        method = %entry.http_method,
        path = %entry.request_path,
        client = ?entry.client_ip,
        "Request received"
    );

    if let Err(e) = recorder.store.record_request(&entry).await {
        metrics::record_store_error("record_request");
        tracing::warn!(request_id = %request_id, error = %e, "Failed to store request log");
    }

    request.extensions_mut().insert(request_id);
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let completion = ResponseCompletion {
        store: Arc::clone(&recorder.store),
        request_id,
        method,
        status: parts.status,
        headers: headers_to_json(&parts.headers),
        server_ip,
        started,
    };

    Response::from_parts(parts, Body::new(CountingBody::new(body, completion)))
}
