//! The stream endpoint: opening a session registers it, dropping the stream
//! deregisters it.

use crate::error::Result;
use crate::network_adapter::ChannelAdapter;
use crate::registry::{PendingReplies, SessionHandle, SessionId, SessionRegistry};
use crate::server::Server;
use dashmap::DashMap;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::info;

const INBOUND_CAPACITY: usize = 32;
const OUTBOUND_CAPACITY: usize = 64;

/// Removes the session from its registry when dropped.
struct SessionGuard {
    registry: Arc<dyn SessionRegistry>,
    id: SessionId,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.registry.remove(self.id.as_str()) {
            handle.close();
        }
        info!(
            session_id = %self.id,
            sessions = self.registry.len(),
            "Session closed"
        );
    }
}

/// The outbound side of an open session.
///
/// Yields every JSON-RPC message the session sends, already serialized. The
/// session stays registered exactly as long as this value is alive.
pub struct SessionStream {
    id: SessionId,
    rx: mpsc::Receiver<String>,
    _guard: SessionGuard,
}

impl std::fmt::Debug for SessionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStream").field("id", &self.id).finish_non_exhaustive()
    }
}

impl SessionStream {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Waits for the next outbound message.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Returns the next outbound message if one is already queued.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

impl Stream for SessionStream {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        self.rx.poll_recv(cx)
    }
}

/// Registers a new session under `id` and starts its protocol task.
///
/// Fails without registering anything if `id` is already taken. If the
/// protocol task cannot be started, the entry is removed again before this
/// returns.
pub fn open_session(
    registry: Arc<dyn SessionRegistry>,
    server: &Arc<Server>,
    id: SessionId,
) -> Result<SessionStream> {
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let pending: PendingReplies = Arc::new(DashMap::new());

    registry.put(id.clone(), SessionHandle::new(inbound_tx, Arc::clone(&pending)))?;
    let guard = SessionGuard {
        registry,
        id: id.clone(),
    };
    info!(session_id = %id, sessions = guard.registry.len(), "Session opened");

    server.connect(id.clone(), ChannelAdapter::new(inbound_rx, outbound_tx, pending))?;

    Ok(SessionStream {
        id,
        rx: outbound_rx,
        _guard: guard,
    })
}
