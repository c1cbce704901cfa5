//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (peer address attached)
//!     → server.rs (layer stack)
//!     → telemetry recorder (request row, body wrapper)
//!     → request timeout
//!     → admission filter (blocklist)
//!     → application routes (demo.rs in the binary)
//! ```

pub mod demo;
pub mod request;
pub mod server;

pub use demo::demo_routes;
pub use server::{GatewayServer, GatewayState};
