//! HTTP gateway with a correlated request/response audit trail and an IP
//! blocklist refreshed from the database.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod refresh;
pub mod security;
pub mod store;
pub mod telemetry;

pub use config::GatewayConfig;
pub use http::{GatewayServer, GatewayState};
pub use lifecycle::Shutdown;
pub use security::BlocklistCache;
pub use store::{GatewayStore, MemoryStore, SqlStore, StoreError};
pub use telemetry::CorrelationId;
