//! parley-protocol: Wire definitions shared by client and server
//!
//! This crate defines the chat message entity, the frames exchanged over a
//! connection, and the length-prefixed codec that carries them.

pub mod codec;
pub mod messages;
pub mod types;

// Re-export main types at crate root
pub use codec::{ClientCodec, CodecError, ServerCodec, MAX_MESSAGE_SIZE};
pub use messages::{ClientMessage, ErrorCode, ServerMessage};
pub use types::Message;

/// Current protocol version
pub const PROTOCOL_VERSION: u32 = 1;
