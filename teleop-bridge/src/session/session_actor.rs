use crate::session::session::Session;
use crate::session::session_command::SessionCommand;
use crate::session::session_handle::SessionHandle;
use crate::session::session_state::SessionInput;
use crate::error::SessionError;
use crate::transport::TransportEvent;
use dashmap::DashMap;
use std::sync::Arc;
use teleop_core::{ControlEnvelope, RoomId};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Owns a [`Session`] and feeds it every input from one task.
pub(crate) struct SessionActor {
    session: Session,
    command_rx: mpsc::Receiver<SessionCommand>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    sessions: Option<Arc<DashMap<RoomId, SessionHandle>>>,
}

impl SessionActor {
    pub(crate) fn new(
        session: Session,
        command_rx: mpsc::Receiver<SessionCommand>,
        transport_rx: mpsc::Receiver<TransportEvent>,
        sessions: Option<Arc<DashMap<RoomId, SessionHandle>>>,
    ) -> Self {
        Self {
            session,
            command_rx,
            transport_rx,
            sessions,
        }
    }

    pub(crate) async fn run(mut self) {
        let id = self.session.id();
        let identity = self.session.config().identity.clone();
        info!("Session {} for {} event loop started", id, identity);

        while !self.session.is_closed() {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Command channel closed. Stopping session {}", id);
                            self.apply(SessionInput::Stop).await;
                        }
                    }
                }

                evt = self.transport_rx.recv() => {
                    match evt {
                        Some(e) => self.apply(SessionInput::Transport(e)).await,
                        None => {
                            warn!("Transport channel closed unexpectedly");
                            self.apply(SessionInput::Stop).await;
                        }
                    }
                }
            }
        }

        if let Some(sessions) = self.sessions {
            sessions.remove_if(&identity, |_, handle| handle.id() == id);
        }
        info!("Session {} for {} event loop finished", id, identity);
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        let input = match cmd {
            SessionCommand::Initiate => SessionInput::Initiate,
            SessionCommand::SignalingClosed => SessionInput::SignalingClosed,
            SessionCommand::Stop => SessionInput::Stop,
            SessionCommand::Signal(envelope) => match envelope {
                ControlEnvelope::Offer { sdp } => SessionInput::RemoteOffer(sdp),
                ControlEnvelope::Answer { sdp } => SessionInput::RemoteAnswer(sdp),
                ControlEnvelope::IceCandidate { candidate } => {
                    SessionInput::RemoteCandidate(candidate)
                }
                ControlEnvelope::SessionAck => SessionInput::SessionAck,
                ControlEnvelope::JoinRoom { role, .. } => SessionInput::PeerJoined(role),
            },
        };

        self.apply(input).await;
    }

    async fn apply(&mut self, input: SessionInput) {
        match self.session.apply(input).await {
            Ok(()) => {}
            Err(e @ SessionError::Negotiation { .. }) => {
                error!("Session {}: {}", self.session.id(), e)
            }
            Err(e) => warn!("Session {}: {}", self.session.id(), e),
        }
    }
}
