//! Connection Registry
//!
//! Tracks live sessions and how far into the message history each one has
//! been sent. All membership and cursor changes go through a single mutex, so
//! a fan-out that walks the registry sees one consistent set of sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use parley_protocol::ServerMessage;
use parley_utils::{ParleyError, Result};

/// Outbound half of a session's transport
///
/// The receiving end is drained by the connection's single writer task.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

/// Unique session identifier, never reused within a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a SessionId from a raw value (mainly for testing)
    #[cfg(test)]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Session({})", self.0)
    }
}

/// A registered session
pub struct Session {
    pub id: SessionId,
    outbox: Outbox,
    /// History index up to which this session has been sent messages
    cursor: u64,
}

impl Session {
    /// Queue a frame for this session's writer
    pub fn send(&self, message: ServerMessage) -> Result<()> {
        self.outbox
            .send(message)
            .map_err(|_| ParleyError::transport(format!("{} outbox closed", self.id)))
    }

    /// True once the writer side has gone away
    pub fn is_closed(&self) -> bool {
        self.outbox.is_closed()
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Set the history index this session has been sent up to
    pub fn advance_cursor(&mut self, to: u64) {
        self.cursor = to;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("cursor", &self.cursor)
            .field("outbox_closed", &self.outbox.is_closed())
            .finish()
    }
}

/// Registry of all live sessions
pub struct ConnectionRegistry {
    sessions: Mutex<HashMap<SessionId, Session>>,
    next_session_id: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_session_id: AtomicU64::new(1),
        }
    }

    /// Allocate a fresh session id
    pub fn next_id(&self) -> SessionId {
        SessionId(self.next_session_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Add a session with its cursor at the start of history
    pub fn register(&self, id: SessionId, outbox: Outbox) -> Result<()> {
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(&id) {
            return Err(ParleyError::DuplicateSession(id.value()));
        }

        sessions.insert(
            id,
            Session {
                id,
                outbox,
                cursor: 0,
            },
        );
        debug!("Registered {} ({} live)", id, sessions.len());
        Ok(())
    }

    /// Remove a session
    ///
    /// Returns `UnknownSession` if it was already removed; teardown paths may
    /// race, so callers are expected to tolerate that.
    pub fn unregister(&self, id: SessionId) -> Result<()> {
        let mut sessions = self.sessions.lock();
        match sessions.remove(&id) {
            Some(_) => {
                debug!("Unregistered {} ({} live)", id, sessions.len());
                Ok(())
            }
            None => Err(ParleyError::UnknownSession(id.value())),
        }
    }

    /// Set a session's cursor
    ///
    /// Fan-out already holds the lock and calls [`Session::advance_cursor`]
    /// directly; this is the entry point for callers outside a walk.
    pub fn advance_cursor(&self, id: SessionId, to: u64) -> Result<()> {
        self.with_session(id, |session| session.advance_cursor(to))
    }

    /// Current cursor of a session
    pub fn cursor(&self, id: SessionId) -> Result<u64> {
        self.with_session(id, |session| session.cursor())
    }

    /// Run `f` against one session while holding the registry lock
    pub fn with_session<R>(&self, id: SessionId, f: impl FnOnce(&mut Session) -> R) -> Result<R> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(&id)
            .ok_or(ParleyError::UnknownSession(id.value()))?;
        Ok(f(session))
    }

    /// Apply `f` to every registered session other than `except`
    ///
    /// The registry lock is held for the whole walk, so `f` must not block.
    pub fn for_each_except(&self, except: SessionId, mut f: impl FnMut(&mut Session)) {
        let mut sessions = self.sessions.lock();
        for (_, session) in sessions.iter_mut().filter(|(id, _)| **id != except) {
            f(session);
        }
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.lock().contains_key(&id)
    }

    /// Ids of all live sessions, sorted
    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.sessions.lock().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}
