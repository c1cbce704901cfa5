//! Blocklist refresh subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     interval.rs (read MaliciousIpCheckIntervalInSeconds, default 60)
//!     → BlocklistCache::refresh (immediate load, awaited)
//!     → scheduler.rs (spawn timer loop)
//!
//! Every tick:
//!     → detached BlocklistCache::refresh
//! ```
//!
//! # Design Decisions
//! - Interval fixed at startup; no live reconfiguration
//! - Ticks never wait for the previous refresh
//! - Shutdown via the lifecycle broadcast channel

pub mod interval;
pub mod scheduler;

pub use interval::{parse_interval, resolve_interval, MAX_INTERVAL};
pub use scheduler::{RefreshScheduler, ScheduledRefresh};
