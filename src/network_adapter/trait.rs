//! The adapter contract between a session and its transport.

use crate::error::Result;
use async_trait::async_trait;

/// A message-based transport a session's protocol handler talks through.
#[async_trait]
pub trait NetworkAdapter: Send + Sync {
    /// Sends one complete JSON-RPC message toward the peer.
    async fn send(&mut self, msg: &str) -> Result<()>;
    /// Receives the next complete message. `Ok(None)` means the transport closed.
    async fn recv(&mut self) -> Result<Option<String>>;
}
