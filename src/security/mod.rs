//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (after telemetry capture):
//!     → admission.rs (client address in blocklist? → 403)
//!     → Pass to application handler
//!
//! Refresh scheduler:
//!     → blocklist.rs (rebuild snapshot from the store, atomic swap)
//! ```
//!
//! # Design Decisions
//! - Lookups never block: readers load an immutable snapshot
//! - Fail open on store errors: a failed refresh keeps the last good snapshot
//! - The rejection travels back through telemetry like any other response

pub mod admission;
pub mod blocklist;

pub use admission::{admission_filter, FORBIDDEN_BODY};
pub use blocklist::BlocklistCache;
