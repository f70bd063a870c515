//! Stdio transport: newline-delimited JSON-RPC on stdin/stdout. This is the
//! default MCP transport — AI-assistant clients launch the server and speak
//! this protocol over pipes. Informational logging goes to stderr
//! exclusively; stdout carries nothing but wire frames (spec.md §7).

use async_trait::async_trait;
use portunix_core::errors::{PortunixError, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error};

use crate::protocol::{JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};
use crate::server::McpServer;
use crate::transport::McpTransport;

pub struct StdioTransport;

#[async_trait]
impl McpTransport for StdioTransport {
    async fn serve(self, server: Arc<McpServer>) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        let mut lines = stdin.lines();

        debug!("stdio transport ready, waiting for JSON-RPC messages on stdin");

        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(req) => req,
                Err(e) => {
                    error!(error = %e, "failed to parse JSON-RPC request");
                    let resp = JsonRpcResponse::error(None, PARSE_ERROR, format!("parse error: {e}"));
                    write_response(&mut stdout, &resp).await?;
                    continue;
                }
            };

            debug!(method = %request.method, "handling MCP request");

            if let Some(response) = server.handle_request(request).await {
                write_response(&mut stdout, &response).await?;
            }
        }

        debug!("stdin closed, shutting down stdio transport");
        Ok(())
    }
}

async fn write_response(stdout: &mut tokio::io::Stdout, response: &JsonRpcResponse) -> Result<()> {
    let json = serde_json::to_string(response).map_err(PortunixError::Json)?;
    stdout.write_all(json.as_bytes()).await.map_err(PortunixError::Io)?;
    stdout.write_all(b"\n").await.map_err(PortunixError::Io)?;
    stdout.flush().await.map_err(PortunixError::Io)?;
    Ok(())
}
