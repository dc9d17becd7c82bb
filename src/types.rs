//! Core data structures for the Model Context Protocol (MCP) as spoken by this
//! server: the JSON-RPC envelope, the initialize handshake, and tools.
//!
//! Everything here is plain `serde` data; no I/O happens in this module.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// --- Protocol Version ---
pub const LATEST_PROTOCOL_VERSION: &str = "2024-11-05";
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26"];

// --- JSON-RPC Error Codes ---
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const SERVER_NOT_INITIALIZED: i32 = -32002;

/// Implemented by `#[derive(ToolArguments)]`; yields the JSON schema used as a
/// tool's `inputSchema`.
pub trait ToolArgumentsDescriptor {
    fn input_schema() -> Value;
}

/// Definition for a tool the client can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
}

impl Tool {
    /// Builds a tool whose input schema is derived from `Args`.
    pub fn from_args<Args: ToolArgumentsDescriptor>(name: &str, description: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            description: description.map(str::to_string),
            input_schema: Args::input_schema(),
        }
    }
}

impl Default for Tool {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            input_schema: serde_json::json!({ "type": "object" }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// The server's response to a `tools/call` request.
///
/// A tool that ran but failed is still a successful JSON-RPC response, with
/// `is_error` set so the peer can tell "routing worked, operation failed" apart
/// from a transport failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Serializes `value` as pretty-printed JSON text.
    pub fn json<T: Serialize>(value: &T) -> crate::error::Result<Self> {
        Ok(Self::text(serde_json::to_string_pretty(value)?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}

// --- Foundational JSON-RPC Types ---

/// An incoming request. `params` may be omitted by the peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response<T> {
    pub jsonrpc: String,
    pub id: RequestId,
    pub result: T,
}

impl<T> Response<T> {
    pub fn new(id: RequestId, result: T) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Num(i64),
    Str(String),
}

impl RequestId {
    /// Reads the `id` member of a raw JSON-RPC message, if it has a usable one.
    pub fn from_message(message: &Value) -> Option<Self> {
        match message.get("id")? {
            Value::Number(n) => n.as_i64().map(RequestId::Num),
            Value::String(s) => Some(RequestId::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Num(n) => write!(f, "{}", n),
            RequestId::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification<T> {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub params: Option<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JSONRPCResponse<T> {
    Success(Response<T>),
    Error(ErrorResponse),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    pub error: ErrorData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    pub code: i32,
    pub message: String,
}

// --- Initialization Handshake Types ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequestParams {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Value,
    pub client_info: Implementation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: Implementation,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

// --- Method-Specific Parameter Types ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Parameters of the `notifications/message` log notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingMessageParams {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_serializes_input_schema_in_camel_case() {
        let tool = Tool {
            name: "get-publications".to_string(),
            description: Some("Retrieve user's publications".to_string()),
            input_schema: json!({ "type": "object", "properties": {} }),
        };
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["inputSchema"]["type"], "object");
        assert!(value.get("input_schema").is_none());
    }

    #[test]
    fn error_result_sets_is_error_flag() {
        let value = serde_json::to_value(CallToolResult::error("boom")).unwrap();
        assert_eq!(value["isError"], true);
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "boom");
    }

    #[test]
    fn request_without_params_defaults_to_null() {
        let req: Request =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 7, "method": "tools/list" }))
                .unwrap();
        assert_eq!(req.id, RequestId::Num(7));
        assert!(req.params.is_null());
    }

    #[test]
    fn request_id_is_read_from_raw_messages() {
        assert_eq!(
            RequestId::from_message(&json!({ "id": "abc" })),
            Some(RequestId::Str("abc".to_string()))
        );
        assert_eq!(RequestId::from_message(&json!({ "id": 3 })), Some(RequestId::Num(3)));
        assert_eq!(RequestId::from_message(&json!({ "id": null })), None);
        assert_eq!(RequestId::from_message(&json!({ "method": "ping" })), None);
    }

    #[test]
    fn jsonrpc_response_distinguishes_errors() {
        let error_json = json!({
            "jsonrpc": "2.0",
            "id": 2,
            "error": { "code": METHOD_NOT_FOUND, "message": "Method not found" }
        });
        match serde_json::from_value::<JSONRPCResponse<Value>>(error_json).unwrap() {
            JSONRPCResponse::Error(e) => assert_eq!(e.error.code, METHOD_NOT_FOUND),
            JSONRPCResponse::Success(_) => panic!("Expected error response"),
        }
    }
}
