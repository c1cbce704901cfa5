//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the application router with the gateway middleware
//! - Order the layers: trace → telemetry → timeout → admission → handler
//! - Serve with peer addresses attached (`ConnectInfo`)
//! - Stop accepting on shutdown and drain in-flight requests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{GatewayConfig, TelemetryConfig};
use crate::security::{admission_filter, BlocklistCache};
use crate::store::GatewayStore;
use crate::telemetry::{record_telemetry, TelemetryRecorder};

/// Shared state handed to the middleware layers.
#[derive(Clone)]
pub struct GatewayState {
    pub blocklist: Arc<BlocklistCache>,
    pub recorder: Arc<TelemetryRecorder>,
}

impl GatewayState {
    pub fn new(
        store: Arc<dyn GatewayStore>,
        blocklist: Arc<BlocklistCache>,
        telemetry: &TelemetryConfig,
    ) -> Self {
        let recorder = Arc::new(TelemetryRecorder::new(store, telemetry.server_identity.clone()));
        Self {
            blocklist,
            recorder,
        }
    }
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    /// Wrap `app` with the gateway layers.
    pub fn new(config: &GatewayConfig, state: GatewayState, app: Router) -> Self {
        Self {
            router: Self::build_router(config, &state, app),
        }
    }

    /// Build the layered router.
    ///
    /// Telemetry sits outside the timeout so a timed-out request still gets
    /// a response row; admission sits inside it so rejections get one too.
    #[allow(deprecated)]
    pub fn build_router(config: &GatewayConfig, state: &GatewayState, app: Router) -> Router {
        app.layer(middleware::from_fn_with_state(
            Arc::clone(&state.blocklist),
            admission_filter,
        ))
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.recorder),
            record_telemetry,
        ))
        .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

