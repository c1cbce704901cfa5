//! Startup orchestration.
//!
//! # Responsibilities
//! - Connect the store
//! - Build the blocklist cache and telemetry recorder
//! - Run the refresh scheduler's startup sequence
//!
//! # Design Decisions
//! - Fail fast: a store that cannot be reached at all is fatal
//! - A failed first blocklist load is not fatal (logged, empty list)
//! - Listeners start last, after this returns

use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::{default_config, load_config, ConfigError, GatewayConfig, ListenerConfig};
use crate::http::server::GatewayState;
use crate::lifecycle::Shutdown;
use crate::refresh::{RefreshScheduler, ScheduledRefresh};
use crate::security::BlocklistCache;
use crate::store::{connect_store, GatewayStore, StoreError};

/// Fatal startup failures.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
}

/// Everything the server needs once startup has finished.
pub struct Initialized {
    pub state: GatewayState,
    pub refresh: ScheduledRefresh,
}

/// Load the file at `path`, or run on defaults when there is none.
pub fn load_configuration(path: Option<&Path>) -> Result<GatewayConfig, StartupError> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => default_config()?,
    };
    Ok(config)
}

/// Bind the public listener.
pub async fn bind_listener(config: &ListenerConfig) -> Result<TcpListener, StartupError> {
    let listener = TcpListener::bind(&config.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");
    Ok(listener)
}

/// Connect to the configured store and bring the core up.
pub async fn initialize(config: &GatewayConfig, shutdown: &Shutdown) -> Result<Initialized, StartupError> {
    let store = connect_store(&config.database).await?;
    Ok(initialize_with_store(config, store, shutdown).await)
}

/// Bring the core up on an already opened store.
pub async fn initialize_with_store(
    config: &GatewayConfig,
    store: Arc<dyn GatewayStore>,
    shutdown: &Shutdown,
) -> Initialized {
    let blocklist = Arc::new(BlocklistCache::new());
    let state = GatewayState::new(Arc::clone(&store), Arc::clone(&blocklist), &config.telemetry);

    let refresh = RefreshScheduler::new(store, blocklist, &config.blocklist)
        .start(shutdown.subscribe())
        .await;

    tracing::info!(
        blocked_addresses = state.blocklist.len(),
        refresh_interval_secs = refresh.interval.as_secs(),
        "Gateway core initialized"
    );

    Initialized { state, refresh }
}
