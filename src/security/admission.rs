//! Admission Filter Middleware.
//! Rejects clients whose address is on the blocklist.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::request::client_address;
use crate::observability::metrics;
use crate::security::blocklist::BlocklistCache;
use crate::telemetry::CorrelationId;

/// Body of the rejection response.
pub const FORBIDDEN_BODY: &str = "Forbidden: Your IP is blocked.";

pub async fn admission_filter(
    State(blocklist): State<Arc<BlocklistCache>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    // Unknown peers cannot match an entry
    let Some(address) = client_address(&request).map(|ip| ip.to_string()) else {
        return next.run(request).await;
    };

    if blocklist.contains(&address) {
        metrics::record_blocked();
        tracing::warn!(
            client = %address,
            request_id = ?request.extensions().get::<CorrelationId>().map(ToString::to_string),
            path = %request.uri().path(),
            "Rejected request from blocked address"
        );
        return (StatusCode::FORBIDDEN, FORBIDDEN_BODY).into_response();
    }

    next.run(request).await
}
