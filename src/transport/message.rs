//! The message endpoint: routes one posted JSON-RPC message to its session.

use crate::error::Error;
use crate::registry::SessionRegistry;
use crate::types::RequestId;
use serde_json::Value;
use tracing::{debug, warn};

/// What happened to a posted message. Transports map these onto their own
/// status reporting (HTTP status codes, log lines).
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// No session id was supplied.
    MissingSession,
    /// The session id is not (or no longer) registered.
    UnknownSession,
    /// The body is not a JSON-RPC message.
    InvalidMessage(String),
    /// The session answered the request; this is its response.
    Replied(Value),
    /// A notification or client response was handed to the session.
    Accepted,
    /// Forwarding failed.
    Failed(String),
}

/// Delivers `body` to the session named by `session_id`.
///
/// Requests wait for the session's response with the same id. The registry is
/// only read here, and is consulted again if the session's channel turns out
/// to be closed, so a stream that closed mid-call reports `UnknownSession`.
pub async fn route_message(
    registry: &dyn SessionRegistry,
    session_id: Option<&str>,
    body: &[u8],
) -> RouteOutcome {
    let Some(session_id) = session_id.filter(|id| !id.is_empty()) else {
        return RouteOutcome::MissingSession;
    };
    let Some(handle) = registry.get(session_id) else {
        debug!(session_id, "Message for unknown session");
        return RouteOutcome::UnknownSession;
    };

    let message = match serde_json::from_slice::<Value>(body) {
        Ok(message @ Value::Object(_)) => message,
        Ok(_) => return RouteOutcome::InvalidMessage("Expected a JSON-RPC object".to_string()),
        Err(e) => return RouteOutcome::InvalidMessage(format!("Invalid JSON: {}", e)),
    };

    let is_request = match message.get("method") {
        None => false,
        Some(Value::String(_)) => true,
        Some(_) => {
            return RouteOutcome::InvalidMessage("JSON-RPC method must be a string".to_string())
        }
    };
    let result = match RequestId::from_message(&message) {
        Some(id) if is_request => handle
            .request(id, message.to_string())
            .await
            .map(RouteOutcome::Replied),
        _ => handle
            .notify(message.to_string())
            .await
            .map(|()| RouteOutcome::Accepted),
    };
    drop(handle);

    match result {
        Ok(outcome) => outcome,
        Err(Error::ChannelClosed) if registry.get(session_id).is_none() => {
            debug!(session_id, "Session closed while handling message");
            RouteOutcome::UnknownSession
        }
        Err(e) => {
            warn!(session_id, error = %e, "Failed to forward message");
            RouteOutcome::Failed(e.to_string())
        }
    }
}
