//! The session registry: which streams are open, keyed by session id.
//!
//! The stream endpoint is the only writer (put on open, remove on close); the
//! message endpoint only reads. Both get the registry injected, so tests can
//! use a fresh one per case.

use crate::error::{Error, Result};
use crate::types::RequestId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::borrow::Borrow;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Posters waiting on a reply, keyed by the JSON-RPC id of their request.
pub type PendingReplies = Arc<DashMap<RequestId, oneshot::Sender<Value>>>;

/// Opaque session identifier, minted by the transport when a stream opens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to one open session, as stored in the registry.
///
/// Cloning is cheap; every clone feeds the same session task.
#[derive(Clone)]
pub struct SessionHandle {
    inbound: mpsc::Sender<String>,
    pending: PendingReplies,
}

impl SessionHandle {
    pub fn new(inbound: mpsc::Sender<String>, pending: PendingReplies) -> Self {
        Self { inbound, pending }
    }

    /// Forwards a request and waits for the session's response with the same id.
    pub async fn request(&self, id: RequestId, message: String) -> Result<Value> {
        let (tx, rx) = oneshot::channel();
        match self.pending.entry(id.clone()) {
            Entry::Occupied(_) => return Err(Error::DuplicateRequest(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(tx);
            }
        }

        if let Err(e) = self.inbound.send(message).await {
            self.pending.remove(&id);
            return Err(e.into());
        }
        Ok(rx.await?)
    }

    /// Forwards a message that expects no reply.
    pub async fn notify(&self, message: String) -> Result<()> {
        self.inbound.send(message).await?;
        Ok(())
    }

    /// Fails every poster still waiting on this session.
    pub(crate) fn close(&self) {
        self.pending.clear();
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("closed", &self.inbound.is_closed())
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// The registry contract shared by the networked and local modes.
pub trait SessionRegistry: Send + Sync {
    /// Registers a session. An id that is already registered is rejected and
    /// the existing entry is left untouched.
    fn put(&self, id: SessionId, handle: SessionHandle) -> Result<()>;

    fn get(&self, id: &str) -> Option<SessionHandle>;

    /// Deletes the entry if present; returns what was removed.
    fn remove(&self, id: &str) -> Option<SessionHandle>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registry for the networked mode: any number of concurrent sessions.
#[derive(Default)]
pub struct SessionMap {
    sessions: DashMap<SessionId, SessionHandle>,
}

impl SessionMap {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRegistry for SessionMap {
    fn put(&self, id: SessionId, handle: SessionHandle) -> Result<()> {
        match self.sessions.entry(id) {
            Entry::Occupied(entry) => Err(Error::SessionExists(entry.key().to_string())),
            Entry::Vacant(slot) => {
                slot.insert(handle);
                Ok(())
            }
        }
    }

    fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    fn remove(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.remove(id).map(|(_, handle)| handle)
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}

/// Registry for the local pipe mode: exactly one implicit session.
#[derive(Default)]
pub struct SingleSession {
    slot: Mutex<Option<(SessionId, SessionHandle)>>,
}

impl SingleSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_slot<R>(&self, f: impl FnOnce(&mut Option<(SessionId, SessionHandle)>) -> R) -> R {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut slot)
    }
}

impl SessionRegistry for SingleSession {
    fn put(&self, id: SessionId, handle: SessionHandle) -> Result<()> {
        self.with_slot(|slot| {
            if let Some((existing, _)) = slot.as_ref() {
                return Err(Error::SessionExists(existing.to_string()));
            }
            *slot = Some((id, handle));
            Ok(())
        })
    }

    fn get(&self, id: &str) -> Option<SessionHandle> {
        self.with_slot(|slot| match slot.as_ref() {
            Some((current, handle)) if current.as_str() == id => Some(handle.clone()),
            _ => None,
        })
    }

    fn remove(&self, id: &str) -> Option<SessionHandle> {
        self.with_slot(|slot| {
            let is_current = matches!(slot.as_ref(), Some((current, _)) if current.as_str() == id);
            if is_current {
                slot.take().map(|(_, handle)| handle)
            } else {
                None
            }
        })
    }

    fn len(&self) -> usize {
        self.with_slot(|slot| usize::from(slot.is_some()))
    }
}
