//! Unix domain socket transport: identical session semantics to
//! [`crate::transport::tcp`], bound to a filesystem socket path instead of
//! a TCP port (spec.md §4.6). Unix-only.

use async_trait::async_trait;
use portunix_core::errors::{PortunixError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info};

use crate::protocol::{JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};
use crate::server::McpServer;
use crate::transport::McpTransport;

pub struct UnixTransport {
    pub path: PathBuf,
}

#[async_trait]
impl McpTransport for UnixTransport {
    async fn serve(self, server: Arc<McpServer>) -> Result<()> {
        // A leftover socket file from a crashed prior run must be removed
        // before binding, or the bind itself fails with AddrInUse.
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(PortunixError::Io)?;
        }

        let listener = UnixListener::bind(&self.path).map_err(|e| PortunixError::Transport {
            message: format!("failed to bind {}: {e}", self.path.display()),
        })?;
        info!(path = %self.path.display(), "MCP unix transport listening");

        loop {
            let (stream, _) = listener.accept().await.map_err(|e| PortunixError::Transport {
                message: format!("accept failed: {e}"),
            })?;
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                debug!("accepted MCP unix connection");
                if let Err(e) = handle_connection(stream, server).await {
                    error!(error = %e, "MCP unix connection ended with error");
                }
            });
        }
    }
}

async fn handle_connection(stream: UnixStream, server: Arc<McpServer>) -> Result<()> {
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
    writer: &mut tokio::net::unix::OwnedWriteHalf,
    response: &JsonRpcResponse,
) -> Result<()> {
    let json = serde_json::to_string(response).map_err(PortunixError::Json)?;
    writer.write_all(json.as_bytes()).await.map_err(PortunixError::Io)?;
    writer.write_all(b"\n").await.map_err(PortunixError::Io)?;
    writer.flush().await.map_err(PortunixError::Io)?;
    Ok(())
}
