//! Session control loop

use std::ops::ControlFlow;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

use parley_protocol::{ClientMessage, ErrorCode, ServerCodec, ServerMessage, PROTOCOL_VERSION};
use parley_utils::{ParleyError, Result};

use super::state::{CloseReason, SessionState};
use crate::registry::{Outbox, SessionId};
use crate::SharedState;

/// Author used when a client posts without naming itself
const ANONYMOUS: &str = "unknown";

/// Drives one connected client from registration to teardown
pub struct SessionHandler {
    id: SessionId,
    peer: String,
    state: SessionState,
    /// Name announced in `Hello`, used for posts with an empty author
    author: Option<String>,
    outbox: Outbox,
    shared: SharedState,
}

impl SessionHandler {
    pub fn new(shared: SharedState, peer: impl Into<String>, outbox: Outbox) -> Self {
        Self {
            id: shared.registry.next_id(),
            peer: peer.into(),
            state: SessionState::Connecting,
            author: None,
            outbox,
            shared,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Serve one connection until it closes
    ///
    /// Spawns the writer task, registers the session, replays history, then
    /// reads frames until EOF, a transport or decode failure, or shutdown.
    pub async fn run<R, W>(shared: SharedState, reader: R, writer: W, peer: impl Into<String>) -> CloseReason
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbox, outbox_rx) = mpsc::unbounded_channel();
        let mut shutdown_rx = shared.subscribe_shutdown();
        let mut handler = SessionHandler::new(shared, peer, outbox);

        let writer_task = tokio::spawn(write_loop(
            handler.id,
            FramedWrite::new(writer, ServerCodec::new()),
            outbox_rx,
        ));

        let reason = match handler.start() {
            Ok(()) => {
                handler
                    .read_loop(FramedRead::new(reader, ServerCodec::new()), &mut shutdown_rx)
                    .await
            }
            Err(e) => CloseReason::from(e),
        };

        handler.close(&reason);
        let id = handler.id;
        // Last outbox handle; the writer flushes what is queued and exits
        drop(handler);

        if let Err(e) = writer_task.await {
            warn!("Writer task for {} failed: {}", id, e);
        }
        reason
    }

    /// Connecting and CatchingUp
    pub fn start(&mut self) -> Result<()> {
        self.connect()?;
        let replayed = self.catch_up()?;
        info!(
            "{} from {} caught up ({} messages replayed)",
            self.id, self.peer, replayed
        );
        Ok(())
    }

    /// Greet the client and add the session to the registry
    fn connect(&mut self) -> Result<()> {
        let backlog = self.shared.history.len();
        self.send(ServerMessage::Welcome {
            session_id: self.id.value(),
            backlog,
            protocol_version: PROTOCOL_VERSION,
        })?;

        self.shared.registry.register(self.id, self.outbox.clone())?;
        info!("{} connected from {}", self.id, self.peer);
        self.transition(SessionState::CatchingUp);
        Ok(())
    }

    /// Replay history from the session's cursor, then go live
    fn catch_up(&mut self) -> Result<usize> {
        let replayed = self.shared.broadcaster.catch_up(self.id)?;
        self.transition(SessionState::Active);
        Ok(replayed)
    }

    async fn read_loop<R>(
        &mut self,
        mut frames: FramedRead<R, ServerCodec>,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> CloseReason
    where
        R: AsyncRead + Unpin,
    {
        loop {
            let reason = tokio::select! {
                frame = frames.next() => match frame {
                    Some(Ok(msg)) => match self.handle_message(msg) {
                        ControlFlow::Continue(()) => None,
                        ControlFlow::Break(reason) => Some(reason),
                    },
                    Some(Err(e)) if e.is_decode_error() => Some(CloseReason::Decode(e.to_string())),
                    Some(Err(e)) => Some(CloseReason::Transport(e.to_string())),
                    None => Some(CloseReason::Disconnected),
                },
                _ = shutdown_rx.recv() => Some(CloseReason::Shutdown),
            };

            if let Some(reason) = reason {
                return reason;
            }
        }
    }

    /// Handle one inbound frame while Active
    pub fn handle_message(&mut self, msg: ClientMessage) -> ControlFlow<CloseReason> {
        match msg {
            ClientMessage::Hello {
                author,
                protocol_version,
            } => {
                if protocol_version != PROTOCOL_VERSION {
                    let err = ParleyError::ProtocolMismatch {
                        client: protocol_version,
                        server: PROTOCOL_VERSION,
                    };
                    warn!("{} rejected: {}", self.id, err);
                    // Best effort; the session closes either way
                    let _ = self.send(ServerMessage::Error {
                        code: ErrorCode::ProtocolMismatch,
                        message: err.to_string(),
                    });
                    return ControlFlow::Break(err.into());
                }

                debug!("{} identifies as {:?}", self.id, author);
                self.author = Some(author);
                ControlFlow::Continue(())
            }

            ClientMessage::Post { author, body } => {
                let author = if author.is_empty() {
                    self.author.clone().unwrap_or_else(|| ANONYMOUS.to_string())
                } else {
                    author
                };
                debug!("[{}] {}: {}", self.peer, author, body);
                self.shared.broadcaster.publish(author, body, self.id);
                ControlFlow::Continue(())
            }

            ClientMessage::Ping => match self.send(ServerMessage::Pong) {
                Ok(()) => ControlFlow::Continue(()),
                Err(e) => ControlFlow::Break(e.into()),
            },
        }
    }

    /// Unregister and enter Closed
    ///
    /// Safe to call more than once.
    pub fn close(&mut self, reason: &CloseReason) {
        if self.state.is_closed() {
            return;
        }

        match self.shared.registry.unregister(self.id) {
            Ok(()) => {}
            Err(ParleyError::UnknownSession(_)) => {
                debug!("{} was already unregistered", self.id);
            }
            Err(e) => warn!("Failed to unregister {}: {}", self.id, e),
        }

        info!("{} ({}) closed: {}", self.id, self.peer, reason);
        self.transition(SessionState::Closed);
    }

    fn send(&self, message: ServerMessage) -> Result<()> {
        self.outbox
            .send(message)
            .map_err(|_| ParleyError::transport(format!("{} outbox closed", self.id)))
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!("{}: {} -> {}", self.id, self.state, next);
        self.state = next;
    }
}

/// Forward queued frames to the socket until every outbox handle is dropped
async fn write_loop<W>(
    id: SessionId,
    mut sink: FramedWrite<W, ServerCodec>,
    mut outbox_rx: mpsc::UnboundedReceiver<ServerMessage>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(msg) = outbox_rx.recv().await {
        if let Err(e) = sink.send(msg).await {
            // Dropping the receiver makes later broadcasts to this
            // session fail fast; the reader notices the dead socket.
            warn!("Write to {} failed: {}", id, e);
            return;
        }
    }
    debug!("Writer for {} finished", id);
}
