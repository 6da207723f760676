//! Core data types

use serde::{Deserialize, Serialize};

/// A single chat message as stored in the server's history
///
/// Immutable once created. The server assigns `sequence` (the message's
/// position in the history) and `timestamp` (seconds since the Unix epoch)
/// when the message is appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub author: String,
    pub body: String,
    pub sequence: u64,
    pub timestamp: f64,
}

impl Message {
    pub fn new(
        sequence: u64,
        author: impl Into<String>,
        body: impl Into<String>,
        timestamp: f64,
    ) -> Self {
        Self {
            author: author.into(),
            body: body.into(),
            sequence,
            timestamp,
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}: {}", self.sequence, self.author, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_display() {
        let msg = Message::new(3, "ana", "hello there", 1_700_000_000.5);
        assert_eq!(msg.to_string(), "#3 ana: hello there");
    }
}
