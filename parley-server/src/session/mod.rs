//! Per-connection session handling
//!
//! A session moves through `Connecting -> CatchingUp -> Active -> Closed`.
//! Each connection gets one reader loop (the [`SessionHandler`]) and one
//! writer task draining the session's outbox onto the socket.

mod handler;
mod state;

pub use handler::SessionHandler;
pub use state::{CloseReason, SessionState};
