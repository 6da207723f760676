//! Client-server message types

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::Message;

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ClientMessage {
    /// Optional handshake announcing the client's name and protocol version
    Hello {
        author: String,
        protocol_version: u32,
    },

    /// Publish a message to every other connected client
    Post { author: String, body: String },

    /// Ping for keepalive
    Ping,
}

impl ClientMessage {
    /// Build a `Post` frame
    pub fn post(author: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Post {
            author: author.into(),
            body: body.into(),
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ServerMessage {
    /// Session accepted
    ///
    /// `backlog` is the history length when the session was accepted. Every
    /// one of those entries follows, but so may messages published while the
    /// session was registering, so treat it as a lower bound.
    Welcome {
        session_id: u64,
        backlog: u64,
        protocol_version: u32,
    },

    /// A message from the shared history, replayed or live
    Message(Arc<Message>),

    /// Error response
    Error { code: ErrorCode, message: String },

    /// Pong response to ping
    Pong,
}

/// Error codes for protocol errors
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    ProtocolMismatch,
}
