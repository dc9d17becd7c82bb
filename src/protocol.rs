//! Defines the protocol layer for MCP message serialization and deserialization.
//!
//! This layer sits on top of a `NetworkAdapter` and provides a typed interface
//! for sending and receiving JSON-RPC messages, keeping `serde_json` calls out
//! of the session logic.

use crate::error::Result;
use crate::network_adapter::NetworkAdapter;
use serde::{de::DeserializeOwned, Serialize};

/// A connection that handles MCP protocol framing over a generic `NetworkAdapter`.
pub struct ProtocolConnection<A: NetworkAdapter> {
    adapter: A,
}

impl<A: NetworkAdapter> ProtocolConnection<A> {
    /// Creates a new `ProtocolConnection` that will use the given adapter for communication.
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    /// Serializes a message struct into a JSON string and sends it via the adapter.
    pub async fn send_serializable<T: Serialize + Send + Sync>(&mut self, msg: T) -> Result<()> {
        let json_string = serde_json::to_string(&msg)?;
        self.adapter.send(&json_string).await
    }

    /// Sends a raw, already-serialized JSON string over the adapter.
    pub async fn send_raw(&mut self, json_string: &str) -> Result<()> {
        self.adapter.send(json_string).await
    }

    /// Receives a raw JSON string from the adapter and deserializes it.
    ///
    /// Returns `Ok(None)` once the adapter is closed. Blank messages are skipped.
    pub async fn recv_message<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        loop {
            match self.adapter.recv().await? {
                Some(json_string) if json_string.trim().is_empty() => continue,
                Some(json_string) => return Ok(Some(serde_json::from_str::<T>(&json_string)?)),
                None => return Ok(None),
            }
        }
    }
}
