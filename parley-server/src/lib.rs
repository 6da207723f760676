//! parley-server: session, history and broadcast engine
//!
//! Clients connect over TCP, receive a replay of everything said so far, and
//! from then on get every message any other client publishes.

pub mod broadcast;
pub mod config;
pub mod history;
pub mod registry;
pub mod server;
pub mod session;

use std::sync::Arc;

use tokio::sync::broadcast as shutdown;

pub use broadcast::{Broadcaster, PublishReport};
pub use config::{AppConfig, ConfigLoader};
pub use history::{LogEntry, MessageLog};
pub use registry::{ConnectionRegistry, Outbox, Session, SessionId};
pub use server::Server;
pub use session::{CloseReason, SessionHandler, SessionState};

/// State shared by every session task
///
/// Cheap to clone; each field is reference counted.
#[derive(Clone)]
pub struct SharedState {
    pub history: Arc<MessageLog>,
    pub registry: Arc<ConnectionRegistry>,
    pub broadcaster: Broadcaster,
    pub config: Arc<AppConfig>,
    shutdown_tx: shutdown::Sender<()>,
}

impl SharedState {
    pub fn new(config: AppConfig) -> Self {
        let history = Arc::new(MessageLog::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&history), Arc::clone(&registry));
        let (shutdown_tx, _) = shutdown::channel(1);

        Self {
            history,
            registry,
            broadcaster,
            config: Arc::new(config),
            shutdown_tx,
        }
    }

    /// Receiver that fires once `shutdown` is called
    pub fn subscribe_shutdown(&self) -> shutdown::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Ask the accept loop and every session to stop
    pub fn shutdown(&self) {
        // No receivers just means nothing is running yet
        let _ = self.shutdown_tx.send(());
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}
