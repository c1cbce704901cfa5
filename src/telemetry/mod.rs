//! Request/response audit trail.
//!
//! # Data Flow
//! ```text
//! Inbound request:
//!     → correlation.rs (fresh CorrelationId)
//!     → recorder.rs (request row, awaited before the handler runs)
//!     → [admission filter, handler]
//!     → body.rs (CountingBody wraps the response body)
//!
//! Body finished / connection closed:
//!     → ResponseCompletion (detached task writes the response row)
//! ```
//!
//! # Design Decisions
//! - The request write is on the request path; the response write never is
//! - Store failures are logged and swallowed, the client never sees them
//! - The response reaches the client byte-for-byte as the handler produced it

pub mod body;
pub mod correlation;
pub mod recorder;

use chrono::{DateTime, SubsecRound, Utc};

pub use body::{CountingBody, ResponseCompletion};
pub use correlation::CorrelationId;
pub use recorder::{record_telemetry, TelemetryRecorder};

/// Current UTC time truncated to whole seconds.
pub fn wall_clock_seconds() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}
