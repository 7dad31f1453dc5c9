//! # ARI Transport
//!
//! Network-facing half of the ARI client: the schema loader, the HTTP
//! operation engine, and the WebSocket event transport with backoff
//! reconnection. Depends on `ari-core` for data types only; never
//! constructs a client-bound `Instance` itself — `ari-client` owns that.

pub mod config;
pub mod http;
pub mod schema_loader;
pub mod ws;

pub use config::{ClientConfig, WsReconnectConfig};
pub use schema_loader::load_schema;
pub use ws::{WsFrame, WsHandle, WsLifecycleEvent};
