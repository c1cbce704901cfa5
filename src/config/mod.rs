//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + GATEWAY_DATABASE_URL
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!
//! Runtime settings (blocklist, refresh interval)
//!     → read from the database, not from this file
//! ```
//!
//! # Design Decisions
//! - File holds bootstrap settings only; operators tune the gateway through the database
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{default_config, load_config, ConfigError};
pub use schema::{
    BlocklistConfig, DatabaseConfig, GatewayConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    TelemetryConfig, TimeoutConfig,
};
