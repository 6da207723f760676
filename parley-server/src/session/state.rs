//! Session lifecycle states

use parley_utils::ParleyError;

/// Lifecycle of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Registry entry being created
    Connecting,
    /// Replaying history the session has not seen
    CatchingUp,
    /// Exchanging live messages
    Active,
    /// Unregistered; terminal
    Closed,
}

impl SessionState {
    /// Whether moving to `next` is a legal step
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Connecting, CatchingUp)
                | (CatchingUp, Active)
                | (Connecting, Closed)
                | (CatchingUp, Closed)
                | (Active, Closed)
        )
    }

    pub fn is_closed(self) -> bool {
        self == SessionState::Closed
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Connecting => "connecting",
            SessionState::CatchingUp => "catching-up",
            SessionState::Active => "active",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer closed the connection
    Disconnected,
    /// Read or write on the transport failed
    Transport(String),
    /// Peer sent a malformed frame
    Decode(String),
    /// Peer announced an incompatible protocol version
    ProtocolMismatch { client: u32, server: u32 },
    /// Server is shutting down
    Shutdown,
}

impl From<ParleyError> for CloseReason {
    fn from(err: ParleyError) -> Self {
        match err {
            ParleyError::Decode(msg) => CloseReason::Decode(msg),
            ParleyError::ProtocolMismatch { client, server } => {
                CloseReason::ProtocolMismatch { client, server }
            }
            other => CloseReason::Transport(other.to_string()),
        }
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::Disconnected => write!(f, "peer disconnected"),
            CloseReason::Transport(e) => write!(f, "transport error: {}", e),
            CloseReason::Decode(e) => write!(f, "malformed frame: {}", e),
            CloseReason::ProtocolMismatch { client, server } => {
                write!(f, "protocol mismatch (client={}, server={})", client, server)
            }
            CloseReason::Shutdown => write!(f, "server shutdown"),
        }
    }
}
