//! Append-only message history
//!
//! Every message ever published lives here for the lifetime of the process.
//! Sequence numbers equal log positions and are handed out under the write
//! lock, so concurrent appends are totally ordered. Readers clone `Arc`
//! handles out of a read guard and therefore always observe a whole prefix.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::trace;

use parley_protocol::Message;
use parley_utils::{ParleyError, Result};

use crate::registry::SessionId;

/// One stored message plus the session that published it
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub message: Arc<Message>,
    pub origin: SessionId,
}

/// Globally ordered, append-only message store
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: RwLock<Vec<LogEntry>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, assigning it the next sequence number
    pub fn append(
        &self,
        author: impl Into<String>,
        body: impl Into<String>,
        origin: SessionId,
    ) -> Arc<Message> {
        let mut entries = self.entries.write();
        let sequence = entries.len() as u64;
        let message = Arc::new(Message::new(sequence, author, body, now_timestamp()));

        entries.push(LogEntry {
            message: Arc::clone(&message),
            origin,
        });
        trace!(sequence, %origin, "Appended message to history");

        message
    }

    /// All entries with `sequence >= from`, in order
    pub fn slice(&self, from: u64) -> Result<Vec<LogEntry>> {
        let entries = self.entries.read();
        Self::collect(&entries, from, entries.len() as u64)
    }

    /// Entries in `[from, to)`; `to` is clamped to the current length
    pub fn range(&self, from: u64, to: u64) -> Result<Vec<LogEntry>> {
        let entries = self.entries.read();
        let to = to.min(entries.len() as u64);
        Self::collect(&entries, from, to)
    }

    /// Number of stored messages
    pub fn len(&self) -> u64 {
        self.entries.read().len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn collect(entries: &[LogEntry], from: u64, to: u64) -> Result<Vec<LogEntry>> {
        let len = entries.len() as u64;
        if from > len {
            return Err(ParleyError::InvalidRange { from, len });
        }
        if from >= to {
            return Ok(Vec::new());
        }
        Ok(entries[from as usize..to as usize].to_vec())
    }
}

/// Seconds since the Unix epoch with microsecond precision
fn now_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
