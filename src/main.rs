//! IP audit gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request        ┌──────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ trace ─▶ telemetry ─▶ timeout ─▶ admission ─┼─▶ handler
//!                           │               │                      │       │
//!     Client Response       │               ▼                      ▼       │
//!     ◀─────────────────────┼── CountingBody (response row)   BlocklistCache
//!                           │               │                      ▲       │
//!                           │               ▼                      │       │
//!                           │  ┌──────────────────────┐   ┌─────────────┐  │
//!                           │  │ store (RequestLogs,  │◀──│  refresh    │  │
//!                           │  │ ResponseLogs, ...)   │   │  scheduler  │  │
//!                           │  └──────────────────────┘   └─────────────┘  │
//!                           └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use ip_audit_gateway::http::{demo_routes, GatewayServer};
use ip_audit_gateway::lifecycle::{bind_listener, initialize, load_configuration, signals, Shutdown};
use ip_audit_gateway::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "ip-audit-gateway", version, about = "HTTP gateway with audit trail and IP blocklist")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_configuration(cli.config.as_deref())?;

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let core = initialize(&config, &shutdown).await?;

    let listener = bind_listener(&config.listener).await?;

    let server = GatewayServer::new(&config, core.state, demo_routes());
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    signals::shutdown_signal().await;
    shutdown.trigger();

    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
        Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
    }
    if let Err(e) = core.refresh.task.await {
        tracing::error!(error = %e, "Refresh scheduler task panicked");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
