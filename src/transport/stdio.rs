//! Local transport: newline-delimited JSON over a pipe (normally the
//! process's stdin/stdout), carrying exactly one implicit session.

use super::message::{route_message, RouteOutcome};
use super::stream::open_session;
use crate::error::{Error, Result};
use crate::registry::{SessionId, SessionRegistry, SingleSession};
use crate::server::Server;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

/// The id of the single session in local mode.
pub const LOCAL_SESSION_ID: &str = "stdio";

/// Serves the process's stdin/stdout until stdin closes.
pub async fn serve_stdio(server: Arc<Server>) -> Result<()> {
    info!("Medium MCP server running on stdio");
    serve_pipe(server, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serves one session over `reader`/`writer` until `reader` reaches EOF.
///
/// Each input line is routed exactly like an HTTP post to the session; every
/// message the session sends is written to `writer` as one line.
pub async fn serve_pipe<R, W>(server: Arc<Server>, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let registry: Arc<dyn SessionRegistry> = Arc::new(SingleSession::new());
    let mut session = open_session(
        Arc::clone(&registry),
        &server,
        SessionId::from(LOCAL_SESSION_ID),
    )?;
    let mut lines = BufReader::new(reader).lines();

    let read_loop = async move {
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match route_message(registry.as_ref(), Some(LOCAL_SESSION_ID), line.as_bytes()).await {
                RouteOutcome::Replied(_) | RouteOutcome::Accepted => {}
                RouteOutcome::InvalidMessage(reason) => {
                    warn!(reason = %reason, "Ignoring malformed input line")
                }
                RouteOutcome::Failed(reason) => warn!(reason = %reason, "Failed to handle input line"),
                RouteOutcome::MissingSession | RouteOutcome::UnknownSession => {
                    return Err(Error::ChannelClosed);
                }
            }
        }
        // Dropping the last inbound sender lets the session finish its queue
        // and flush pending notifications before its stream ends.
        debug!("Input closed, draining local session");
        drop(registry.remove(LOCAL_SESSION_ID));
        Ok::<_, Error>(())
    };
    let write_loop = async {
        while let Some(msg) = session.recv().await {
            write_line(&mut writer, &msg).await?;
        }
        Ok::<_, Error>(())
    };

    tokio::try_join!(read_loop, write_loop)?;
    drop(session);
    Ok(())
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, msg: &str) -> Result<()> {
    writer.write_all(msg.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ConnectionHandle;
    use crate::types::{CallToolResult, Tool};
    use serde_json::{json, Value};
    use tokio::io::AsyncReadExt;

    /// Feeds `input` to a pipe session and returns every line it wrote.
    async fn run_pipe(server: Server, input: &[Value]) -> Vec<Value> {
        let mut stdin = String::new();
        for msg in input {
            stdin.push_str(&msg.to_string());
            stdin.push('\n');
        }

        let (mut out_reader, out_writer) = tokio::io::duplex(64 * 1024);
        tokio::time::timeout(
            std::time::Duration::from_secs(2),
            serve_pipe(Arc::new(server), stdin.as_bytes(), out_writer),
        )
        .await
        .expect("pipe session timed out")
        .expect("pipe session failed");

        let mut output = String::new();
        out_reader.read_to_string(&mut output).await.unwrap();
        output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn echo_server() -> Server {
        Server::new("test").register_tool(
            Tool {
                name: "echo".to_string(),
                ..Default::default()
            },
            |_handle: ConnectionHandle, args: Value| async move {
                Ok(CallToolResult::text(args["text"].as_str().unwrap_or_default()))
            },
        )
    }

    #[tokio::test]
    async fn round_trip_over_pipe() {
        let output = run_pipe(
            echo_server(),
            &[
                json!({
                    "jsonrpc": "2.0", "id": 1, "method": "initialize",
                    "params": {
                        "protocolVersion": "2024-11-05",
                        "capabilities": {},
                        "clientInfo": { "name": "pipe-test", "version": "0" }
                    }
                }),
                json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
                json!({
                    "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                    "params": { "name": "echo", "arguments": { "text": "hi" } }
                }),
            ],
        )
        .await;

        assert_eq!(output.len(), 2);
        assert_eq!(output[0]["id"], 1);
        assert_eq!(output[0]["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(output[1]["id"], 2);
        assert_eq!(output[1]["result"]["content"][0]["text"], "hi");
    }

    #[tokio::test]
    async fn tool_notifications_are_flushed_at_eof() {
        let server = Server::new("test").register_tool(
            Tool {
                name: "chatty".to_string(),
                ..Default::default()
            },
            |handle: ConnectionHandle, _args: Value| async move {
                handle.log_message("info", json!("step one")).await?;
                handle.log_message("info", json!("step two")).await?;
                Ok(CallToolResult::text("done"))
            },
        );
        let output = run_pipe(
            server,
            &[
                json!({
                    "jsonrpc": "2.0", "id": 1, "method": "initialize",
                    "params": {
                        "protocolVersion": "2024-11-05",
                        "capabilities": {},
                        "clientInfo": { "name": "pipe-test", "version": "0" }
                    }
                }),
                json!({
                    "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                    "params": { "name": "chatty", "arguments": {} }
                }),
            ],
        )
        .await;

        assert_eq!(output.len(), 4);
        let logged: Vec<&Value> = output
            .iter()
            .filter(|msg| msg["method"] == "notifications/message")
            .map(|msg| &msg["params"]["data"])
            .collect();
        assert_eq!(logged, [&json!("step one"), &json!("step two")]);
        assert!(output.iter().any(|msg| msg["id"] == 2 && msg["result"]["content"][0]["text"] == "done"));
    }

    #[tokio::test]
    async fn non_string_method_does_not_stall_input() {
        let output = run_pipe(
            echo_server(),
            &[
                json!({ "jsonrpc": "2.0", "id": 1, "method": null }),
                json!({ "jsonrpc": "2.0", "id": 2, "method": "ping" }),
            ],
        )
        .await;

        assert_eq!(output.len(), 1);
        assert_eq!(output[0]["id"], 2);
    }

    #[tokio::test]
    async fn panicking_tool_ends_the_session_without_hanging() {
        let server = Server::new("test").register_tool(
            Tool {
                name: "boom".to_string(),
                ..Default::default()
            },
            |_handle: ConnectionHandle, args: Value| async move {
                if args.is_object() {
                    panic!("tool blew up");
                }
                Ok(CallToolResult::text("unreachable"))
            },
        );
        let output = run_pipe(
            server,
            &[
                json!({
                    "jsonrpc": "2.0", "id": 1, "method": "initialize",
                    "params": {
                        "protocolVersion": "2024-11-05",
                        "capabilities": {},
                        "clientInfo": { "name": "pipe-test", "version": "0" }
                    }
                }),
                json!({
                    "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                    "params": { "name": "boom", "arguments": {} }
                }),
                json!({ "jsonrpc": "2.0", "id": 3, "method": "ping" }),
            ],
        )
        .await;

        assert_eq!(output.len(), 1);
        assert_eq!(output[0]["id"], 1);
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let (mut out_reader, out_writer) = tokio::io::duplex(64 * 1024);
        let input = "not json\n\n{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n";
        serve_pipe(Arc::new(echo_server()), input.as_bytes(), out_writer)
            .await
            .unwrap();

        let mut output = String::new();
        out_reader.read_to_string(&mut output).await.unwrap();
        let replies: Vec<Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["id"], 1);
    }
}
