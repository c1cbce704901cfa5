//! Persistence gateway.
//!
//! # Data Flow
//! ```text
//! telemetry recorder
//!     → record_request / record_response (RequestLogs, ResponseLogs)
//!
//! blocklist cache / refresh scheduler
//!     → list_active_blocked_addresses (BlacklistedIps)
//!     → read_config_value (Configurations)
//! ```
//!
//! # Design Decisions
//! - One object-safe trait so the core never names a concrete backend
//! - Every operation is fallible; callers log and swallow, nothing retries
//! - Backend chosen from the database URL at startup

pub mod memory;
pub mod model;
pub mod sql;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::DatabaseConfig;

pub use memory::MemoryStore;
pub use model::{RequestLogEntry, ResponseLogEntry};
pub use sql::SqlStore;

/// URL prefix selecting the in-process store.
pub const MEMORY_URL_PREFIX: &str = "memory:";

/// Errors surfaced by a store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The relational backend rejected the query or could not be reached.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store is not accepting operations.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Operations the gateway core needs from durable storage.
#[async_trait]
pub trait GatewayStore: Send + Sync {
    /// Persist one request row.
    async fn record_request(&self, entry: &RequestLogEntry) -> Result<(), StoreError>;

    /// Persist one response row.
    async fn record_response(&self, entry: &ResponseLogEntry) -> Result<(), StoreError>;

    /// Addresses whose blocklist record is active.
    async fn list_active_blocked_addresses(&self) -> Result<Vec<String>, StoreError>;

    /// Value stored under `key` in the configuration table, if any.
    async fn read_config_value(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// Open the store described by `config`.
pub async fn connect_store(config: &DatabaseConfig) -> Result<Arc<dyn GatewayStore>, StoreError> {
    if config.url.starts_with(MEMORY_URL_PREFIX) {
        tracing::warn!("Using in-memory store; audit rows are not durable");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = SqlStore::connect(config).await?;
    Ok(Arc::new(store))
}
