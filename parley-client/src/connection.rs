//! Client-server connection management
//!
//! Provides the TCP connection to the parley server with automatic message
//! framing and async dispatch.

mod client;

pub use client::Connection;
