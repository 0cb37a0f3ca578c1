//! Stdio transport — reads JSON-RPC from stdin, writes to stdout.

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::broadcast;

use crate::protocol::{EngineReply, ProtocolHandler, SessionEngine};
use crate::types::{McpError, McpResult};

use super::framing;

/// Session id of the single engine behind the stdio transport.
pub const STDIO_SESSION_ID: &str = "stdio";

/// Stdio transport for desktop MCP clients.
pub struct StdioTransport {
    handler: ProtocolHandler,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self { handler }
    }

    /// Run the transport loop — reads from stdin, writes to stdout.
    pub async fn run(&self) -> McpResult<()> {
        self.run_with(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Run over arbitrary byte streams. Returns on EOF or when the engine
    /// terminates.
    pub async fn run_with<R, W>(&self, input: R, mut output: W) -> McpResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.handler.connect().await?;
        let mut notifications = self.handler.subscribe();
        let mut lines = BufReader::new(input).lines();

        tracing::info!("Stdio transport started");

        loop {
            tokio::select! {
                next = lines.next_line() => {
                    let Some(line) = next.map_err(McpError::Io)? else {
                        tracing::info!("EOF on stdin, shutting down");
                        break;
                    };
                    if let Some(response) = self.handle_line(&line).await {
                        write_value(&mut output, &response).await?;
                    }
                    if self.handler.is_terminated() {
                        tracing::info!("Engine terminated, shutting down");
                        break;
                    }
                }
                notification = notifications.recv() => match notification {
                    Ok(value) => write_value(&mut output, &value).await?,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Dropped {n} notification(s)");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        // Flush anything emitted by the final request.
        while let Ok(value) = notifications.try_recv() {
            write_value(&mut output, &value).await?;
        }
        self.handler.close().await;
        Ok(())
    }

    async fn handle_line(&self, line: &str) -> Option<Value> {
        if line.trim().is_empty() {
            return None;
        }
        let msg = match framing::parse_message(line) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("Parse error: {e}");
                return Some(framing::error_envelope(&e));
            }
        };
        match self.handler.handle(msg).await {
            Ok(EngineReply::Response(value)) => Some(value),
            Ok(EngineReply::Accepted) => None,
            Err(e) => {
                tracing::error!("Engine error: {e}");
                Some(framing::error_envelope(&e))
            }
        }
    }
}

async fn write_value<W: AsyncWrite + Unpin>(output: &mut W, value: &Value) -> McpResult<()> {
    let framed = framing::frame_message(value)?;
    output
        .write_all(framed.as_bytes())
        .await
        .map_err(McpError::Io)?;
    output.flush().await.map_err(McpError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cryptowire::{ApiClient, UpstreamConfig};

    #[tokio::test]
    async fn test_stdio_round_trip_until_eof() {
        let handler = ProtocolHandler::new(STDIO_SESSION_ID, ApiClient::new(UpstreamConfig::default()));
        let transport = StdioTransport::new(handler);

        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-03-26","capabilities":{},"clientInfo":{"name":"t","version":"1"}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            "not json\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
        );
        let mut output = Vec::new();
        transport
            .run_with(input.as_bytes(), &mut output)
            .await
            .unwrap();

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["error"]["code"], -32700);
        assert_eq!(lines[2]["id"], 2);
    }

    #[tokio::test]
    async fn test_stdio_stops_after_shutdown() {
        let handler = ProtocolHandler::new(STDIO_SESSION_ID, ApiClient::new(UpstreamConfig::default()));
        let transport = StdioTransport::new(handler);

        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"shutdown"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
        );
        let mut output = Vec::new();
        transport
            .run_with(input.as_bytes(), &mut output)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(output).unwrap().lines().count(), 1);
    }
}
