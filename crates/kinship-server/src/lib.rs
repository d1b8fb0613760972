//! Kinship Server - WebSocket access to the relationship resolver
//!
//! This crate serves relationship queries over JSON-RPC 2.0, so record
//! management UIs and other services can ask how two persons are related.
//!
//! The server supports:
//! - Multiple concurrent connections
//! - Per-scope index caching with generation checks
//! - Explicit cache invalidation after record edits

mod handlers;
mod protocol;
mod server;

pub use handlers::{error_response, ServiceState, SharedState};
pub use protocol::{codes, Request, Response, RpcError, TreeParams};
pub use server::{process_message, KinshipServer, ServerConfig, ServerError, DEFAULT_PORT};
