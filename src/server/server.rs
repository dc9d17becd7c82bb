//! Defines the main `Server` struct and its builder API for registering tools.

use super::session::{ConnectionHandle, ServerSession};
use crate::{
    error::{Error, Result},
    network_adapter::NetworkAdapter,
    protocol::ProtocolConnection,
    registry::SessionId,
    types::{CallToolResult, Tool},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::{future::Future, pin::Pin, sync::Arc};
use tokio::task::JoinHandle;
use tracing::{error, warn};

// Type alias for the boxed future returned by handlers
type BoxedFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

pub(crate) type ToolHandler =
    Box<dyn Fn(ConnectionHandle, Value) -> BoxedFuture<Result<CallToolResult>> + Send + Sync>;

/// The MCP tool server: a name, a version, and a table of tools.
///
/// `Server` knows nothing about transports. A transport opens a session by
/// calling [`Server::connect`] with an adapter, and the server runs that
/// session's protocol loop on its own task.
///
/// # Example
///
/// ```rust
/// use medium_mcp::server::{ConnectionHandle, Server};
/// use medium_mcp::types::{CallToolResult, Tool};
/// use medium_mcp::ToolArguments;
/// use serde::Deserialize;
///
/// #[derive(ToolArguments, Deserialize)]
/// struct EchoArgs {
///     #[tool_arg(desc = "Text to echo back.", min_len = 1)]
///     message: String,
/// }
///
/// let server = Server::new("echo-server").register_tool_typed(
///     Tool::from_args::<EchoArgs>("echo", Some("Echoes a message.")),
///     |_handle: ConnectionHandle, args: EchoArgs| async move {
///         Ok(CallToolResult::text(args.message))
///     },
/// );
/// assert_eq!(server.tools().len(), 1);
/// ```
#[derive(Default, Clone)]
pub struct Server {
    pub(crate) name: String,
    pub(crate) version: String,
    // tool_name -> (metadata, handler)
    pub(crate) tools_and_handlers: HashMap<String, (Tool, Arc<ToolHandler>)>,
}

impl Server {
    /// Creates a new `Server` builder. `name` is sent to the client during the
    /// initialization handshake, along with this crate's version.
    pub fn new(name: &str) -> Self {
        Server {
            name: name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Default::default()
        }
    }

    /// Registers a tool whose handler takes raw JSON arguments.
    pub fn register_tool<F, Fut>(mut self, tool: Tool, handler: F) -> Self
    where
        F: Fn(ConnectionHandle, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CallToolResult>> + Send + 'static,
    {
        let handler: ToolHandler = Box::new(move |conn_handle, args| {
            Box::pin(handler(conn_handle, args)) as BoxedFuture<Result<CallToolResult>>
        });
        self.tools_and_handlers
            .insert(tool.name.clone(), (tool, Arc::new(handler)));
        self
    }

    /// Registers a tool with a handler that accepts strongly-typed arguments.
    ///
    /// The `tool` should be built with `Tool::from_args::<Args>()` so that its
    /// `input_schema` matches `Args`. Incoming arguments are checked against
    /// that schema (length limits included) and then deserialized into `Args`.
    /// If either step fails, the client gets an error `CallToolResult` and the
    /// handler is not called.
    pub fn register_tool_typed<Args, Fut, F>(mut self, tool: Tool, handler: F) -> Self
    where
        Args: DeserializeOwned + Send + 'static,
        Fut: Future<Output = Result<CallToolResult>> + Send + 'static,
        F: Fn(ConnectionHandle, Args) -> Fut + Send + Sync + 'static,
    {
        let user_handler = Arc::new(handler);
        let tool_name = tool.name.clone();
        let validator = match jsonschema::validator_for(&tool.input_schema) {
            Ok(validator) => Some(Arc::new(validator)),
            Err(e) => {
                warn!(tool = %tool_name, error = %e, "Input schema does not compile; arguments will not be validated");
                None
            }
        };

        let wrapped: ToolHandler = Box::new(move |conn_handle: ConnectionHandle, args: Value| {
            let user_handler = Arc::clone(&user_handler);
            let validator = validator.clone();
            let tool_name = tool_name.clone();

            Box::pin(async move {
                let args = if args.is_null() {
                    Value::Object(Default::default())
                } else {
                    args
                };
                if let Some(validator) = &validator {
                    if let Err(e) = validator.validate(&args) {
                        warn!(tool = %tool_name, error = %e, "Rejected tool arguments");
                        return Ok(CallToolResult::error(format!(
                            "Invalid arguments for tool '{}': {}",
                            tool_name, e
                        )));
                    }
                }
                match serde_json::from_value::<Args>(args) {
                    Ok(typed_args) => (user_handler)(conn_handle, typed_args).await,
                    Err(e) => {
                        error!(tool = %tool_name, error = %e, "Failed to deserialize arguments for tool");
                        Ok(CallToolResult::error(format!(
                            "Invalid arguments for tool '{}': {}",
                            tool_name, e
                        )))
                    }
                }
            }) as BoxedFuture<Result<CallToolResult>>
        });

        self.tools_and_handlers
            .insert(tool.name.clone(), (tool, Arc::new(wrapped)));
        self
    }

    /// All registered tools, sorted by name.
    pub fn tools(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self
            .tools_and_handlers
            .values()
            .map(|(tool, _)| tool.clone())
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Starts the named tool, or returns `None` if no such tool is registered.
    pub(crate) fn call_tool(
        &self,
        handle: ConnectionHandle,
        name: &str,
        args: Value,
    ) -> Option<BoxedFuture<Result<CallToolResult>>> {
        self.tools_and_handlers
            .get(name)
            .map(|(_, handler)| (handler)(handle, args))
    }

    /// Connects a session's adapter to the protocol layer.
    ///
    /// The session's protocol loop runs on its own task until the adapter's
    /// inbound side closes. Fails if there is no async runtime to run it on.
    pub fn connect<A>(self: &Arc<Self>, session_id: SessionId, adapter: A) -> Result<JoinHandle<()>>
    where
        A: NetworkAdapter + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Other(format!("no async runtime to run the session on: {}", e)))?;

        let session = ServerSession::new(
            ProtocolConnection::new(adapter),
            Arc::clone(self),
            session_id.clone(),
        );
        Ok(runtime.spawn(async move {
            if let Err(e) = session.run().await {
                error!(session_id = %session_id, error = %e, "Session ended with an error");
            }
        }))
    }
}
