//! The in-process adapter joining a session task to its stream and posters.

use super::r#trait::NetworkAdapter;
use crate::error::Result;
use crate::registry::PendingReplies;
use crate::types::RequestId;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// The session side of an open stream.
///
/// Inbound messages arrive from the message endpoint through `inbound`.
/// Everything the session sends goes out over the stream (`outbound`). A
/// response whose id matches a poster waiting in `pending` is also handed to
/// that poster.
pub struct ChannelAdapter {
    inbound: mpsc::Receiver<String>,
    outbound: mpsc::Sender<String>,
    pending: PendingReplies,
}

impl ChannelAdapter {
    pub fn new(
        inbound: mpsc::Receiver<String>,
        outbound: mpsc::Sender<String>,
        pending: PendingReplies,
    ) -> Self {
        Self {
            inbound,
            outbound,
            pending,
        }
    }

    fn deliver_reply(&self, msg: &str) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let value: Value = serde_json::from_str(msg)?;
        if value.get("method").is_some() {
            return Ok(());
        }
        if let Some(id) = RequestId::from_message(&value) {
            if let Some((_, waiter)) = self.pending.remove(&id) {
                if waiter.send(value).is_err() {
                    debug!(request_id = %id, "Poster gave up before the reply arrived");
                }
            }
        }
        Ok(())
    }
}

impl Drop for ChannelAdapter {
    // Runs on normal exit and when the session task unwinds from a panic.
    // Inbound is closed first so no poster can park after the clear.
    fn drop(&mut self) {
        self.inbound.close();
        self.pending.clear();
    }
}

#[async_trait]
impl NetworkAdapter for ChannelAdapter {
    async fn send(&mut self, msg: &str) -> Result<()> {
        // A closed stream is expected when the peer disconnects mid-call.
        if self.outbound.send(msg.to_string()).await.is_err() {
            warn!("Stream closed; dropping outbound message");
        }
        self.deliver_reply(msg)
    }

    async fn recv(&mut self) -> Result<Option<String>> {
        Ok(self.inbound.recv().await)
    }
}
