//! Defines the ServerSession, which runs the MCP state machine for a single
//! client session.

use super::server::Server;
use crate::error::Result;
use crate::network_adapter::NetworkAdapter;
use crate::protocol::ProtocolConnection;
use crate::registry::SessionId;
use crate::types::{
    CallToolParams, CallToolResult, ErrorData, ErrorResponse, Implementation,
    InitializeRequestParams, InitializeResult, ListToolsResult, LoggingMessageParams,
    Notification, Request, RequestId, Response, ServerCapabilities, ToolsCapability,
    INVALID_PARAMS, INVALID_REQUEST, LATEST_PROTOCOL_VERSION, METHOD_NOT_FOUND,
    SERVER_NOT_INITIALIZED, SUPPORTED_PROTOCOL_VERSIONS,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// A handle given to tool handlers to send notifications back to the client.
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    session_id: SessionId,
    pub(crate) notification_sender: mpsc::Sender<String>,
}

impl ConnectionHandle {
    pub fn new(session_id: SessionId, notification_sender: mpsc::Sender<String>) -> Self {
        Self {
            session_id,
            notification_sender,
        }
    }

    /// The session this handle belongs to.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Sends a notification to the client associated with this connection.
    pub async fn send_notification<T: Serialize>(
        &self,
        notification: Notification<T>,
    ) -> Result<()> {
        let json_string = serde_json::to_string(&notification)?;
        self.notification_sender.send(json_string).await?;
        Ok(())
    }

    /// Sends a `notifications/message` log entry to the client.
    pub async fn log_message(&self, level: &str, data: Value) -> Result<()> {
        self.send_notification(Notification {
            jsonrpc: "2.0".to_string(),
            method: "notifications/message".to_string(),
            params: Some(LoggingMessageParams {
                level: level.to_string(),
                logger: None,
                data,
            }),
        })
        .await
    }
}

/// One open session and its protocol state.
///
/// Messages are handled one at a time in arrival order; every request with an
/// id gets exactly one response.
pub(crate) struct ServerSession<A: NetworkAdapter> {
    connection: ProtocolConnection<A>,
    server: Arc<Server>,
    session_id: SessionId,
    is_initialized: bool,
}

impl<A: NetworkAdapter + 'static> ServerSession<A> {
    pub(crate) fn new(
        connection: ProtocolConnection<A>,
        server: Arc<Server>,
        session_id: SessionId,
    ) -> Self {
        Self {
            connection,
            server,
            session_id,
            is_initialized: false,
        }
    }

    /// Runs until the adapter's inbound side closes.
    pub(crate) async fn run(mut self) -> Result<()> {
        let (notification_tx, mut notification_rx) = mpsc::channel::<String>(32);

        loop {
            tokio::select! {
                result = self.connection.recv_message::<Value>() => {
                    let raw_msg = match result {
                        Ok(Some(msg)) => msg,
                        Ok(None) => {
                            notification_rx.close();
                            while let Some(notif_json) = notification_rx.recv().await {
                                self.connection.send_raw(&notif_json).await?;
                            }
                            debug!(session_id = %self.session_id, "Session inbound closed");
                            return Ok(());
                        }
                        Err(e) => {
                            warn!(session_id = %self.session_id, error = %e, "Dropping unreadable message");
                            continue;
                        }
                    };
                    let handle = ConnectionHandle::new(self.session_id.clone(), notification_tx.clone());
                    if let Err(e) = self.dispatch_message(raw_msg, handle).await {
                        error!(session_id = %self.session_id, error = %e, "Error dispatching message");
                    }
                },
                Some(notif_json) = notification_rx.recv() => {
                    self.connection.send_raw(&notif_json).await?;
                }
            }
        }
    }

    async fn dispatch_message(&mut self, raw_msg: Value, handle: ConnectionHandle) -> Result<()> {
        let method = match raw_msg.get("method") {
            Some(Value::String(method)) => method.as_str(),
            Some(_) => {
                return match RequestId::from_message(&raw_msg) {
                    Some(id) => {
                        self.send_error(id, INVALID_REQUEST, "Invalid request: method must be a string")
                            .await
                    }
                    None => {
                        debug!(session_id = %self.session_id, "Ignoring notification without a method name");
                        Ok(())
                    }
                };
            }
            None => {
                debug!(session_id = %self.session_id, "Ignoring response from client");
                return Ok(());
            }
        };
        let Some(id) = RequestId::from_message(&raw_msg) else {
            self.handle_notification(method);
            return Ok(());
        };

        let req: Request = match serde_json::from_value(raw_msg) {
            Ok(req) => req,
            Err(e) => {
                return self
                    .send_error(id, INVALID_REQUEST, &format!("Invalid request: {}", e))
                    .await
            }
        };

        if !self.is_initialized && req.method != "initialize" && req.method != "ping" {
            return self
                .send_error(req.id, SERVER_NOT_INITIALIZED, "Server not initialized")
                .await;
        }

        match req.method.as_str() {
            "initialize" => self.handle_initialize(req).await,
            "ping" => self.send_result(req.id, json!({})).await,
            "tools/list" => {
                let result = ListToolsResult {
                    tools: self.server.tools(),
                };
                self.send_result(req.id, result).await
            }
            "tools/call" => self.handle_call_tool(req, handle).await,
            unhandled_method => {
                let message = format!("Method '{}' not found", unhandled_method);
                self.send_error(req.id, METHOD_NOT_FOUND, &message).await
            }
        }
    }

    fn handle_notification(&self, method: &str) {
        match method {
            "notifications/initialized" => {
                debug!(session_id = %self.session_id, "Client finished initialization")
            }
            "notifications/cancelled" => {
                debug!(session_id = %self.session_id, "Client cancelled a request")
            }
            other => debug!(session_id = %self.session_id, method = other, "Ignoring notification"),
        }
    }

    async fn handle_initialize(&mut self, req: Request) -> Result<()> {
        if self.is_initialized {
            return self
                .send_error(req.id, INVALID_REQUEST, "Server already initialized")
                .await;
        }
        let params: InitializeRequestParams = match serde_json::from_value(req.params) {
            Ok(params) => params,
            Err(e) => {
                let message = format!("Invalid initialize params: {}", e);
                return self.send_error(req.id, INVALID_PARAMS, &message).await;
            }
        };

        let protocol_version = if SUPPORTED_PROTOCOL_VERSIONS.contains(&params.protocol_version.as_str()) {
            params.protocol_version
        } else {
            LATEST_PROTOCOL_VERSION.to_string()
        };
        info!(
            session_id = %self.session_id,
            client = %params.client_info.name,
            protocol_version = %protocol_version,
            "Session initialized"
        );

        let result = InitializeResult {
            protocol_version,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
                logging: Some(json!({})),
            },
            server_info: Implementation {
                name: self.server.name.clone(),
                version: self.server.version.clone(),
            },
        };
        self.send_result(req.id, result).await?;
        self.is_initialized = true;
        Ok(())
    }

    async fn handle_call_tool(&mut self, req: Request, handle: ConnectionHandle) -> Result<()> {
        let params: CallToolParams = match serde_json::from_value(req.params) {
            Ok(params) => params,
            Err(e) => {
                let message = format!("Invalid tools/call params: {}", e);
                return self.send_error(req.id, INVALID_PARAMS, &message).await;
            }
        };

        let Some(call) = self.server.call_tool(handle, &params.name, params.arguments) else {
            let message = format!("Tool {} not found", params.name);
            return self.send_error(req.id, INVALID_PARAMS, &message).await;
        };

        info!(session_id = %self.session_id, tool = %params.name, "Calling tool");
        let result = match call.await {
            Ok(result) => result,
            Err(e) => {
                error!(session_id = %self.session_id, tool = %params.name, error = %e, "Tool failed");
                CallToolResult::error(e.to_string())
            }
        };
        self.send_result(req.id, result).await
    }

    async fn send_result<T: Serialize + Send + Sync>(&mut self, id: RequestId, result: T) -> Result<()> {
        self.connection
            .send_serializable(Response::new(id, result))
            .await
    }

    async fn send_error(&mut self, id: RequestId, code: i32, message: &str) -> Result<()> {
        let error_response = ErrorResponse {
            jsonrpc: "2.0".to_string(),
            id,
            error: ErrorData {
                code,
                message: message.to_string(),
            },
        };
        self.connection.send_serializable(error_response).await
    }
}
