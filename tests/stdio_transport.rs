//! The local pipe transport, driven end to end with the Medium tools.

use medium_mcp::medium::MediumClient;
use medium_mcp::tools::build_server;
use medium_mcp::transport::stdio::serve_pipe;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

#[tokio::test]
async fn tools_are_listed_and_called_over_a_pipe() {
    let mut medium = mockito::Server::new_async().await;
    medium
        .mock("GET", "/me")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "data": { "id": "u1", "username": "ada" } }).to_string())
        .create_async()
        .await;
    medium
        .mock("POST", "/users/u1/posts")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"errors":[{"message":"Token was invalid.","code":6003}]}"#)
        .create_async()
        .await;

    let client = MediumClient::new(&medium.url(), "token").unwrap();
    client.authenticate().await.unwrap();
    let server = Arc::new(build_server(client));

    let input = [
        json!({
            "jsonrpc": "2.0", "id": 1, "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": { "name": "pipe", "version": "0" }
            }
        }),
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
        json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
        json!({
            "jsonrpc": "2.0", "id": 3, "method": "tools/call",
            "params": {
                "name": "publish-article",
                "arguments": { "title": "Hello", "content": "A long enough body" }
            }
        }),
    ]
    .iter()
    .map(|msg| format!("{}\n", msg))
    .collect::<String>();

    let (mut out_reader, out_writer) = tokio::io::duplex(64 * 1024);
    serve_pipe(server, input.as_bytes(), out_writer).await.unwrap();

    let mut output = String::new();
    out_reader.read_to_string(&mut output).await.unwrap();
    let replies: Vec<Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(replies.len(), 3);

    assert_eq!(replies[0]["result"]["protocolVersion"], "2025-03-26");

    let tools = replies[1]["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 3);
    assert_eq!(tools[1]["name"], "publish-article");
    assert_eq!(tools[1]["inputSchema"]["properties"]["content"]["minLength"], 10);

    let publish = &replies[2]["result"];
    assert_eq!(publish["isError"], true);
    assert_eq!(
        publish["content"][0]["text"],
        "Error publishing article: Medium API error (status 401): Token was invalid."
    );
}
