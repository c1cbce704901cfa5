//! Pass-through response body that measures what it forwards.
//!
//! `CountingBody` hands every frame to the connection untouched and adds the
//! length of each data frame to a counter. When the stream ends, errors, or
//! is dropped by a closing connection, its `ResponseCompletion` fires once.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::http::{Method, StatusCode};
use hyper::body::{Body as HttpBody, Frame, SizeHint};

use crate::observability::metrics;
use crate::store::{GatewayStore, ResponseLogEntry};
use crate::telemetry::{wall_clock_seconds, CorrelationId};

/// Deferred response-log write for one request.
pub struct ResponseCompletion {
    pub(crate) store: Arc<dyn GatewayStore>,
    pub(crate) request_id: CorrelationId,
    pub(crate) method: Method,
    pub(crate) status: StatusCode,
    pub(crate) headers: serde_json::Value,
    pub(crate) server_ip: Option<String>,
    pub(crate) started: Instant,
}

impl ResponseCompletion {
    /// Spawn the response-log write. Never blocks the caller.
    pub fn finish(self, bytes_sent: u64) {
        let elapsed = self.started.elapsed();
        metrics::record_request(self.method.as_str(), self.status.as_u16(), elapsed);

        let entry = ResponseLogEntry {
            request_id: self.request_id,
            status_code: self.status.as_u16(),
            response_headers: self.headers,
            response_time: wall_clock_seconds(),
            duration_ms: round_millis(elapsed),
            server_ip: self.server_ip,
            response_size_in_bytes: bytes_sent,
        };

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!(
                    request_id = %entry.request_id,
                    "No runtime available, response log dropped"
                );
                return;
            }
        };

        let store = self.store;
        handle.spawn(async move {
            if let Err(e) = store.record_response(&entry).await {
                metrics::record_store_error("record_response");
                tracing::warn!(
                    request_id = %entry.request_id,
                    error = %e,
                    "Failed to store response log"
                );
            }
        });
    }
}

/// Milliseconds rounded to the nearest integer.
pub fn round_millis(elapsed: Duration) -> u64 {
    let millis = (elapsed.as_nanos() + 500_000) / 1_000_000;
    u64::try_from(millis).unwrap_or(u64::MAX)
}

/// Response body decorator that counts forwarded bytes.
pub struct CountingBody {
    inner: Body,
    bytes_sent: u64,
    completion: Option<ResponseCompletion>,
}

impl CountingBody {
    pub fn new(inner: Body, completion: ResponseCompletion) -> Self {
        Self {
            inner,
            bytes_sent: 0,
            completion: Some(completion),
        }
    }

    /// Data bytes forwarded so far.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    fn complete(&mut self) {
        if let Some(completion) = self.completion.take() {
            completion.finish(self.bytes_sent);
        }
    }
}

impl HttpBody for CountingBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.bytes_sent += data.len() as u64;
                }
            }
            Poll::Ready(Some(Err(_))) | Poll::Ready(None) => this.complete(),
            Poll::Pending => {}
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for CountingBody {
    fn drop(&mut self) {
        self.complete();
    }
}
