//! TCP listener and accept loop

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{debug, error, info};

use parley_utils::{ParleyError, Result};

use crate::session::SessionHandler;
use crate::SharedState;

/// Bound listener plus the state its sessions share
pub struct Server {
    listener: TcpListener,
    shared: SharedState,
}

impl Server {
    /// Bind to the configured listen address
    pub async fn bind(shared: SharedState) -> Result<Self> {
        let addr = shared.config.server.listen_addr.clone();
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            ParleyError::connection(format!("Failed to bind TCP listener to {}: {}", addr, e))
        })?;

        info!("TCP listener bound to {}", addr);
        Ok(Self { listener, shared })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shared(&self) -> &SharedState {
        &self.shared
    }

    /// Accept connections until shutdown is signalled
    pub async fn run(self) {
        run_tcp_accept_loop(self.listener, self.shared).await;
    }
}

/// Run the TCP accept loop
///
/// Each accepted stream is split and handed to its own session task.
pub async fn run_tcp_accept_loop(listener: TcpListener, shared_state: SharedState) {
    let mut shutdown_rx = shared_state.subscribe_shutdown();

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer_addr)) => {
                        debug!("New TCP connection from {}", peer_addr);
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!("Could not set TCP_NODELAY for {}: {}", peer_addr, e);
                        }
                        let state_clone = shared_state.clone();
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            SessionHandler::run(state_clone, reader, writer, peer_addr.to_string()).await;
                        });
                        debug!("Active sessions: {}", shared_state.registry.len());
                    }
                    Err(e) => {
                        error!("TCP accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, stopping TCP accept loop");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppConfig;

    fn local_state() -> SharedState {
        let mut config = AppConfig::default();
        config.server.listen_addr = "127.0.0.1:0".to_string();
        SharedState::new(config)
    }

    #[tokio::test]
    async fn test_tcp_listener_binds_and_shuts_down() {
        let shared_state = local_state();
        let server = Server::bind(shared_state.clone()).await.unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);

        let handle = tokio::spawn(server.run());

        // Give it a moment to start accepting
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        shared_state.shutdown();

        let result = tokio::time::timeout(tokio::time::Duration::from_secs(1), handle).await;
        assert!(result.is_ok(), "TCP listener did not shut down");
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = AppConfig::default();
        config.server.listen_addr = taken.local_addr().unwrap().to_string();

        let result = Server::bind(SharedState::new(config)).await;
        assert!(matches!(result, Err(ParleyError::Connection(_))));
    }
}
