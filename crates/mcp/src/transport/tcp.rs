//! TCP transport: one listening socket, each accepted connection its own
//! JSON-RPC session processed sequentially; sessions run concurrently with
//! each other (spec.md §4.6, §5).

use async_trait::async_trait;
use portunix_core::errors::{PortunixError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::protocol::{JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};
use crate::server::McpServer;
use crate::transport::McpTransport;

pub struct TcpTransport {
    pub addr: SocketAddr,
}

#[async_trait]
impl McpTransport for TcpTransport {
    async fn serve(self, server: Arc<McpServer>) -> Result<()> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|e| PortunixError::Transport {
                message: format!("failed to bind {}: {e}", self.addr),
            })?;
        info!(addr = %self.addr, "MCP tcp transport listening");

        loop {
            let (stream, peer) = listener.accept().await.map_err(|e| PortunixError::Transport {
                message: format!("accept failed: {e}"),
            })?;
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                debug!(%peer, "accepted MCP tcp connection");
                if let Err(e) = handle_connection(stream, server).await {
                    error!(%peer, error = %e, "MCP tcp connection ended with error");
                }
            });
        }
    }
}

async fn handle_connection(stream: TcpStream, server: Arc<McpServer>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                let resp = JsonRpcResponse::error(None, PARSE_ERROR, format!("parse error: {e}"));
                write_line(&mut writer, &resp).await?;
                continue;
            }
        };

        if let Some(response) = server.handle_request(request).await {
            write_line(&mut writer, &response).await?;
        }
    }

    Ok(())
}

async fn write_line(
    writer: &mut tokio::net::tcp::OwnedWriteHalf,
    response: &JsonRpcResponse,
) -> Result<()> {
    let json = serde_json::to_string(response).map_err(PortunixError::Json)?;
    writer.write_all(json.as_bytes()).await.map_err(PortunixError::Io)?;
    writer.write_all(b"\n").await.map_err(PortunixError::Io)?;
    writer.flush().await.map_err(PortunixError::Io)?;
    Ok(())
}
