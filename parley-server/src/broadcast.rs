//! Message fan-out
//!
//! Publishing appends to the history and then walks the registry, pushing
//! each recipient everything between its cursor and the new history length.
//! Cursor drains run under the registry lock, which keeps per-recipient order
//! equal to history order even when publishes from different sessions
//! interleave: whoever reaches a recipient first sends both messages, and the
//! later publish finds nothing left to send.

use std::sync::Arc;

use tracing::{debug, warn};

use parley_protocol::{Message, ServerMessage};
use parley_utils::Result;

use crate::history::MessageLog;
use crate::registry::{ConnectionRegistry, Session, SessionId};

/// Outcome of a single publish
#[derive(Debug)]
pub struct PublishReport {
    /// The stored message
    pub message: Arc<Message>,
    /// Sessions whose pending entries were all queued
    pub delivered: usize,
    /// Sessions whose outbox rejected a send
    pub failed: Vec<SessionId>,
}

/// Appends messages and pushes them to live sessions
#[derive(Clone)]
pub struct Broadcaster {
    history: Arc<MessageLog>,
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    pub fn new(history: Arc<MessageLog>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { history, registry }
    }

    /// Append a message and deliver it to every session except `origin`
    ///
    /// A recipient whose outbox is gone is reported and skipped; its own
    /// session handler notices the dead transport and unregisters it.
    pub fn publish(
        &self,
        author: impl Into<String>,
        body: impl Into<String>,
        origin: SessionId,
    ) -> PublishReport {
        let message = self.history.append(author, body, origin);
        let upto = message.sequence + 1;

        let mut delivered = 0;
        let mut failed = Vec::new();

        self.registry.for_each_except(origin, |session| {
            match drain(&self.history, session, upto) {
                Ok(_) => delivered += 1,
                Err(e) => {
                    warn!(
                        "Delivery of #{} to {} failed: {}",
                        message.sequence, session.id, e
                    );
                    failed.push(session.id);
                }
            }
        });

        debug!(
            sequence = message.sequence,
            %origin,
            delivered,
            failed = failed.len(),
            "Published message"
        );

        PublishReport {
            message,
            delivered,
            failed,
        }
    }

    /// Send a session every entry it has not seen yet
    ///
    /// Returns the number of messages queued.
    pub fn catch_up(&self, id: SessionId) -> Result<usize> {
        let upto = self.history.len();
        self.registry
            .with_session(id, |session| drain(&self.history, session, upto))?
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }
}

/// Push `[session.cursor, upto)` to one session, advancing its cursor
///
/// Entries the session published itself are skipped but still counted as
/// seen. On a send failure the cursor stays at the entry that failed.
fn drain(history: &MessageLog, session: &mut Session, upto: u64) -> Result<usize> {
    if session.cursor() >= upto {
        return Ok(0);
    }

    let mut sent = 0;
    for entry in history.range(session.cursor(), upto)? {
        if entry.origin != session.id {
            session.send(ServerMessage::Message(Arc::clone(&entry.message)))?;
            sent += 1;
        }
        session.advance_cursor(entry.message.sequence + 1);
    }
    Ok(sent)
}
