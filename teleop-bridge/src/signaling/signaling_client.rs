use crate::channel::ChannelHandler;
use crate::error::SignalingError;
use crate::retry::RetryPolicy;
use crate::session::{NegotiationState, SessionConfig, SessionHandle, SessionRegistry};
use crate::signaling::signaling_output::SignalingOutput;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use teleop_core::{ControlEnvelope, IceCandidate, Role, RoomId};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// What the relay connection reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingEvent {
    Envelope(ControlEnvelope),
    /// The connection is gone. Reconnecting is up to the caller.
    Closed,
}

struct ClientInner {
    room_id: RoomId,
    role: Role,
    outbound: mpsc::UnboundedSender<Message>,
    closed: AtomicBool,
}

/// Websocket connection to the signaling relay, joined to one room.
#[derive(Clone)]
pub struct SignalingClient {
    inner: Arc<ClientInner>,
}

impl SignalingClient {
    /// Connects to `url` and joins `room_id` as `role`. Inbound envelopes are
    /// delivered on the returned receiver, followed by a single
    /// [`SignalingEvent::Closed`] once the connection ends.
    pub async fn connect(
        url: &str,
        room_id: RoomId,
        role: Role,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SignalingEvent>), SignalingError> {
        let (socket, _) = connect_async(url).await?;
        info!("Connected to signaling relay {} as {}", url, role);

        let (mut sender, mut receiver) = socket.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let client = Self {
            inner: Arc::new(ClientInner {
                room_id: room_id.clone(),
                role,
                outbound: out_tx,
                closed: AtomicBool::new(false),
            }),
        };

        client.send(&ControlEnvelope::JoinRoom { room_id, role })?;

        let mut send_task = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let is_close = matches!(msg, Message::Close(_));
                if sender.send(msg).await.is_err() || is_close {
                    break;
                }
            }
        });

        let mut recv_task = tokio::spawn({
            let event_tx = event_tx.clone();

            async move {
                while let Some(Ok(msg)) = receiver.next().await {
                    match msg {
                        Message::Text(text) => {
                            match serde_json::from_str::<ControlEnvelope>(&text) {
                                Ok(envelope) => {
                                    debug!("Signaling received '{}'", envelope.kind());
                                    if event_tx.send(SignalingEvent::Envelope(envelope)).is_err() {
                                        break;
                                    }
                                }
                                Err(e) => warn!("Ignoring signaling frame {:?}: {}", text, e),
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
            }
        });

        let supervisor = client.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = (&mut send_task) => recv_task.abort(),
                _ = (&mut recv_task) => send_task.abort(),
            };

            supervisor.inner.closed.store(true, Ordering::SeqCst);
            info!(
                "Signaling connection for room {} closed",
                supervisor.inner.room_id
            );
            let _ = event_tx.send(SignalingEvent::Closed);
        });

        Ok((client, event_rx))
    }

    pub fn room_id(&self) -> &RoomId {
        &self.inner.room_id
    }

    pub fn role(&self) -> Role {
        self.inner.role
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn send(&self, envelope: &ControlEnvelope) -> Result<(), SignalingError> {
        if self.is_closed() {
            return Err(SignalingError::Closed);
        }
        let json = serde_json::to_string(envelope)?;
        self.inner
            .outbound
            .send(Message::Text(json))
            .map_err(|_| SignalingError::Closed)
    }

    /// Sends a close frame. Pending envelopes queued before it are still
    /// written.
    pub fn close(&self) {
        let _ = self.inner.outbound.send(Message::Close(None));
    }

    fn send_logged(&self, envelope: ControlEnvelope) {
        if let Err(e) = self.send(&envelope) {
            error!("Failed to send '{}' to signaling relay: {}", envelope.kind(), e);
        }
    }
}

#[async_trait]
impl SignalingOutput for SignalingClient {
    async fn send_offer(&self, sdp: String) {
        self.send_logged(ControlEnvelope::Offer { sdp });
    }

    async fn send_answer(&self, sdp: String) {
        self.send_logged(ControlEnvelope::Answer { sdp });
    }

    async fn send_ice(&self, candidate: IceCandidate) {
        self.send_logged(ControlEnvelope::IceCandidate { candidate });
    }
}

/// Why [`forward_to_session`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardEnd {
    /// The relay connection is gone. The session was told so.
    SignalingClosed,
    /// The session closed while the relay connection stayed up.
    SessionClosed,
}

/// Feeds relay events into `session` until either the relay connection or
/// the session closes.
pub async fn forward_to_session(
    events: &mut mpsc::UnboundedReceiver<SignalingEvent>,
    session: &SessionHandle,
) -> ForwardEnd {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(SignalingEvent::Envelope(envelope)) => {
                    if session.signal(envelope).await.is_err() {
                        debug!("Session {} is gone, stop forwarding", session.id());
                        return ForwardEnd::SessionClosed;
                    }
                }
                Some(SignalingEvent::Closed) | None => {
                    let _ = session.signaling_closed().await;
                    return ForwardEnd::SignalingClosed;
                }
            },
            _ = session.wait_for_state(NegotiationState::Closed) => {
                debug!("Session {} closed, stop forwarding", session.id());
                return ForwardEnd::SessionClosed;
            }
        }
    }
}

/// Keeps one session per relay connection alive until the connection ends.
///
/// A session that closes while the relay stays up is replaced by a fresh one
/// on the same connection, and an initiator offers again without waiting for
/// another join. Replacements back off along `restart`, counted from the
/// last session that got connected.
pub async fn serve_room(
    registry: SessionRegistry,
    config: SessionConfig,
    signaling: Arc<dyn SignalingOutput>,
    mut events: mpsc::UnboundedReceiver<SignalingEvent>,
    handler: Arc<dyn ChannelHandler>,
    restart: RetryPolicy,
) {
    let mut session = registry
        .start_session(config.clone(), signaling.clone(), handler.clone())
        .await;
    let mut failures = 0u32;

    loop {
        let (end, connected) = {
            let forwarding = forward_to_session(&mut events, &session);
            tokio::pin!(forwarding);

            let mut connected = false;
            loop {
                tokio::select! {
                    end = &mut forwarding => break (end, connected),
                    Ok(()) = session.wait_for_state(NegotiationState::Connected), if !connected => {
                        connected = true;
                    }
                }
            }
        };

        if end == ForwardEnd::SignalingClosed {
            return;
        }

        failures = if connected { 1 } else { failures.saturating_add(1) };
        let delay = restart.delay(failures);
        info!(
            "Session for {} closed, starting a new one in {:?}",
            config.identity, delay
        );
        tokio::time::sleep(delay).await;

        session = registry
            .start_session(config.clone(), signaling.clone(), handler.clone())
            .await;
        if config.initiator && session.initiate().await.is_err() {
            warn!("Session {} closed before it could offer", session.id());
        }
    }
}
