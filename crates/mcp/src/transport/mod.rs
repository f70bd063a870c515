//! Transport abstraction for MCP JSON-RPC message exchange: stdio, tcp, and
//! unix-domain-socket backends (spec.md §4.6).

pub mod stdio;
#[cfg(unix)]
pub mod unix;
pub mod tcp;

use async_trait::async_trait;
use portunix_core::errors::Result;
use std::sync::Arc;

use crate::server::McpServer;

/// Transport layer for MCP JSON-RPC message exchange. Implementations
/// handle reading requests and writing responses over a specific channel;
/// `serve` blocks until the transport shuts down.
#[async_trait]
pub trait McpTransport: Send {
    async fn serve(self, server: Arc<McpServer>) -> Result<()>;
}
