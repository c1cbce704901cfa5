//! Shared utilities for the gateway integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use ip_audit_gateway::config::GatewayConfig;
use ip_audit_gateway::http::{GatewayServer, GatewayState};
use ip_audit_gateway::lifecycle::Shutdown;
use ip_audit_gateway::security::BlocklistCache;
use ip_audit_gateway::store::{GatewayStore, MemoryStore};

/// A gateway wired to an in-memory store, driven without a socket.
pub struct TestGateway {
    pub store: Arc<MemoryStore>,
    pub blocklist: Arc<BlocklistCache>,
    pub router: Router,
}

impl TestGateway {
    pub fn new(app: Router) -> Self {
        Self::with_config(GatewayConfig::default(), app)
    }

    pub fn with_config(config: GatewayConfig, app: Router) -> Self {
        let store = Arc::new(MemoryStore::new());
        let blocklist = Arc::new(BlocklistCache::new());
        let state = GatewayState::new(
            Arc::clone(&store) as Arc<dyn GatewayStore>,
            Arc::clone(&blocklist),
            &config.telemetry,
        );
        let router = GatewayServer::build_router(&config, &state, app);
        Self {
            store,
            blocklist,
            router,
        }
    }

    /// Mark `address` as blocked in the store and reload the cache.
    pub async fn block(&self, address: &str) {
        self.store.set_blocked(address, true);
        self.blocklist
            .refresh(&*self.store)
            .await
            .expect("blocklist refresh");
    }
}

/// Build a request as if it arrived from `peer`.
pub fn request_from(method: Method, uri: &str, peer: &str, body: Body) -> Request<Body> {
    let addr: SocketAddr = peer.parse().expect("peer address");
    let mut request = Request::builder()
        .method(method)
        .uri(uri)
        .header("host", "gateway.test:3000")
        .body(body)
        .expect("request");
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

pub fn get_from(uri: &str, peer: &str) -> Request<Body> {
    request_from(Method::GET, uri, peer, Body::empty())
}

/// A gateway serving on an ephemeral local port.
pub struct RunningGateway {
    pub addr: SocketAddr,
    pub store: Arc<MemoryStore>,
    pub blocklist: Arc<BlocklistCache>,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), std::io::Error>>,
}

pub async fn start_gateway(app: Router) -> RunningGateway {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();

    let store = Arc::new(MemoryStore::new());
    let blocklist = Arc::new(BlocklistCache::new());
    let state = GatewayState::new(
        Arc::clone(&store) as Arc<dyn GatewayStore>,
        Arc::clone(&blocklist),
        &config.telemetry,
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = GatewayServer::new(&config, state, app);
    let task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    RunningGateway {
        addr,
        store,
        blocklist,
        shutdown,
        task,
    }
}
