//! Connection client for parley server

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use url::Url;

use parley_protocol::{ClientCodec, ClientMessage, ServerMessage};
use parley_utils::{ParleyError, Result};

/// How long `disconnect` waits for queued frames to reach the socket
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Client connection to parley server
pub struct Connection {
    /// Server address (host:port or tcp://host:port)
    connect_addr: String,
    state: ConnectionState,
    /// Channel for outgoing messages
    tx: mpsc::Sender<ClientMessage>,
    /// Channel for receiving messages
    rx: mpsc::Receiver<ServerMessage>,
    /// Handle to the connection task
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Connection {
    /// Create a connection to `addr` (not yet connected)
    pub fn with_addr(addr: impl Into<String>) -> Self {
        let (tx, _) = mpsc::channel(100);
        let (_, rx) = mpsc::channel(100);

        Self {
            connect_addr: addr.into(),
            state: ConnectionState::Disconnected,
            tx,
            rx,
            task_handle: None,
        }
    }

    /// Get current connection state
    #[cfg(test)]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Connect to the server
    pub async fn connect(&mut self) -> Result<()> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;

        let addr = match resolve_addr(&self.connect_addr) {
            Ok(addr) => addr,
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                return Err(e);
            }
        };

        let stream = TcpStream::connect(&addr).await.map_err(|e| {
            self.state = ConnectionState::Disconnected;
            ParleyError::Connection(format!("Failed to connect to {}: {}", addr, e))
        })?;

        let framed = Framed::new(stream, ClientCodec::new());

        let (outgoing_tx, outgoing_rx) = mpsc::channel::<ClientMessage>(100);
        let (incoming_tx, incoming_rx) = mpsc::channel::<ServerMessage>(100);

        self.tx = outgoing_tx;
        self.rx = incoming_rx;

        let handle = tokio::spawn(Self::connection_task(framed, outgoing_rx, incoming_tx));
        self.task_handle = Some(handle);

        self.state = ConnectionState::Connected;
        tracing::info!("Connected to {}", addr);
        Ok(())
    }

    /// Disconnect from server
    ///
    /// Frames already passed to [`send`](Self::send) are written before the
    /// socket closes.
    pub async fn disconnect(&mut self) {
        // Closing the outgoing queue tells the task to finish up once drained
        let (closed_tx, _) = mpsc::channel(1);
        drop(std::mem::replace(&mut self.tx, closed_tx));

        if let Some(mut handle) = self.task_handle.take() {
            match tokio::time::timeout(FLUSH_TIMEOUT, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("Connection task failed: {}", e),
                Err(_) => {
                    tracing::warn!("Timed out flushing outgoing messages");
                    handle.abort();
                }
            }
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Send a message to the server
    pub async fn send(&self, msg: ClientMessage) -> Result<()> {
        if self.state != ConnectionState::Connected {
            return Err(ParleyError::connection("Not connected"));
        }

        self.tx
            .send(msg)
            .await
            .map_err(|_| ParleyError::ConnectionClosed)?;

        Ok(())
    }

    /// Receive next message from server
    ///
    /// Returns `None` once the server has closed the connection.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.rx.recv().await
    }

    /// Background task that handles the actual socket I/O
    async fn connection_task(
        mut framed: Framed<TcpStream, ClientCodec>,
        mut outgoing: mpsc::Receiver<ClientMessage>,
        incoming: mpsc::Sender<ServerMessage>,
    ) {
        loop {
            tokio::select! {
                msg = outgoing.recv() => {
                    let Some(msg) = msg else {
                        tracing::debug!("Outgoing queue closed, closing connection");
                        break;
                    };
                    if let Err(e) = framed.send(msg).await {
                        tracing::error!("Failed to send message: {}", e);
                        break;
                    }
                }

                result = framed.next() => {
                    match result {
                        Some(Ok(msg)) => {
                            if incoming.send(msg).await.is_err() {
                                tracing::debug!("Incoming channel closed, receiver dropped");
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            tracing::error!("Failed to receive message: {}", e);
                            break;
                        }
                        None => {
                            tracing::info!("Server closed connection");
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Turn `host:port` or `tcp://host:port` into a connectable `host:port`
fn resolve_addr(addr: &str) -> Result<String> {
    if !addr.contains("://") {
        return Ok(addr.to_string());
    }

    let url = Url::parse(addr)
        .map_err(|e| ParleyError::Connection(format!("Invalid URL '{}': {}", addr, e)))?;
    if url.scheme() != "tcp" {
        return Err(ParleyError::Connection(format!(
            "Unsupported scheme '{}' (expected tcp://)",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| ParleyError::Connection("Missing host in TCP URL".into()))?;
    let port = url
        .port()
        .ok_or_else(|| ParleyError::Connection("Missing port in TCP URL".into()))?;
    Ok(format!("{}:{}", host, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_protocol::{ServerCodec, PROTOCOL_VERSION};
    use tokio::net::TcpListener;

    #[test]
    fn test_resolve_plain_addr() {
        assert_eq!(resolve_addr("127.0.0.1:7000").unwrap(), "127.0.0.1:7000");
    }

    #[test]
    fn test_resolve_tcp_url() {
        assert_eq!(
            resolve_addr("tcp://chat.local:7100").unwrap(),
            "chat.local:7100"
        );
    }

    #[test]
    fn test_resolve_rejects_other_schemes() {
        assert!(resolve_addr("unix:///tmp/parley.sock").is_err());
        assert!(resolve_addr("tcp://chat.local").is_err());
    }

    #[tokio::test]
    async fn test_connection_state_initial() {
        let conn = Connection::with_addr("127.0.0.1:1");
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_no_server() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut conn = Connection::with_addr(addr);
        let result = conn.connect().await;
        assert!(matches!(result, Err(ParleyError::Connection(_))));
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_send_not_connected() {
        let conn = Connection::with_addr("127.0.0.1:1");
        let result = conn.send(ClientMessage::Ping).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_disconnect_flushes_queued_messages() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, ServerCodec::new());
            let mut received = Vec::new();
            while let Some(Ok(msg)) = framed.next().await {
                received.push(msg);
            }
            received
        });

        let mut conn = Connection::with_addr(addr);
        conn.connect().await.unwrap();
        conn.send(ClientMessage::Hello {
            author: "ana".into(),
            protocol_version: PROTOCOL_VERSION,
        })
        .await
        .unwrap();
        conn.send(ClientMessage::post("ana", "bye")).await.unwrap();
        conn.disconnect().await;
        assert_eq!(conn.state(), ConnectionState::Disconnected);

        let received = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server never saw the connection close")
            .unwrap();
        assert_eq!(
            received,
            vec![
                ClientMessage::Hello {
                    author: "ana".into(),
                    protocol_version: PROTOCOL_VERSION,
                },
                ClientMessage::post("ana", "bye"),
            ]
        );
        assert!(conn.send(ClientMessage::Ping).await.is_err());
    }

    #[tokio::test]
    async fn test_exchange_with_mock_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("tcp://{}", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = Framed::new(stream, ServerCodec::new());
            framed
                .send(ServerMessage::Welcome {
                    session_id: 1,
                    backlog: 0,
                    protocol_version: PROTOCOL_VERSION,
                })
                .await
                .unwrap();
            let got = framed.next().await.unwrap().unwrap();
            framed.send(ServerMessage::Pong).await.unwrap();
            got
        });

        let mut conn = Connection::with_addr(addr);
        conn.connect().await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Connected);

        assert!(matches!(
            conn.recv().await,
            Some(ServerMessage::Welcome { session_id: 1, .. })
        ));
        conn.send(ClientMessage::Ping).await.unwrap();
        assert_eq!(conn.recv().await, Some(ServerMessage::Pong));

        assert_eq!(server.await.unwrap(), ClientMessage::Ping);

        // Server task has dropped its socket
        assert!(conn.recv().await.is_none());

        conn.disconnect().await;
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }
}
