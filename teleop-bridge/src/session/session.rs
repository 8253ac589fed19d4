use crate::channel::{ChannelHandler, CommandChannel};
use crate::error::SessionError;
use crate::session::candidate_queue::CandidateQueue;
use crate::session::session_state::{ChannelState, NegotiationState, SessionInput, SessionStatus};
use crate::signaling::SignalingOutput;
use crate::transport::{PeerState, PeerTransport, TransportEvent, TransportFactory};
use std::sync::Arc;
use teleop_core::utils::COMMAND_CHANNEL_LABEL;
use teleop_core::{IceCandidate, Role, RoomId, SdpKind, SessionId};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Identity and role a session negotiates under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub identity: RoomId,
    pub role: Role,
    /// Whether this side creates the data channel and the offer.
    pub initiator: bool,
}

impl SessionConfig {
    pub fn new(identity: RoomId, role: Role) -> Self {
        Self {
            identity,
            role,
            initiator: role.initiates(),
        }
    }
}

type StepResult<T> = Result<T, (&'static str, anyhow::Error)>;

trait Stage<T> {
    fn stage(self, name: &'static str) -> StepResult<T>;
}

impl<T> Stage<T> for anyhow::Result<T> {
    fn stage(self, name: &'static str) -> StepResult<T> {
        self.map_err(|e| (name, e))
    }
}

/// One peer session for one robot identity.
///
/// All state lives here and changes only through [`Session::apply`], which
/// must be called from a single task.
pub struct Session {
    id: SessionId,
    config: SessionConfig,
    state: NegotiationState,
    remote_applied: bool,
    pending: CandidateQueue,
    transport: Option<Box<dyn PeerTransport>>,
    generation: u64,
    factory: Arc<dyn TransportFactory>,
    signaling: Arc<dyn SignalingOutput>,
    events_tx: mpsc::Sender<TransportEvent>,
    channel: CommandChannel,
    status_tx: watch::Sender<SessionStatus>,
}

impl Session {
    /// Creates an idle session. Transport events must be read from the
    /// returned receiver and fed back through [`SessionInput::Transport`].
    pub fn new(
        config: SessionConfig,
        factory: Arc<dyn TransportFactory>,
        signaling: Arc<dyn SignalingOutput>,
        handler: Arc<dyn ChannelHandler>,
    ) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (events_tx, events_rx) = mpsc::channel(256);
        let (status_tx, status_rx) = watch::channel(SessionStatus::default());
        let channel = CommandChannel::new(config.identity.clone(), status_rx, handler);

        let session = Self {
            id: SessionId::new(),
            config,
            state: NegotiationState::Idle,
            remote_applied: false,
            pending: CandidateQueue::new(),
            transport: None,
            generation: 0,
            factory,
            signaling,
            events_tx,
            channel,
            status_tx,
        };

        (session, events_rx)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == NegotiationState::Closed
    }

    pub fn remote_applied(&self) -> bool {
        self.remote_applied
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending.len()
    }

    pub fn channel(&self) -> &CommandChannel {
        &self.channel
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    /// The single transition function.
    pub async fn apply(&mut self, input: SessionInput) -> Result<(), SessionError> {
        let name = input.name();

        match input {
            SessionInput::Stop => {
                self.close("stopped").await;
                Ok(())
            }
            SessionInput::Transport(event) => {
                self.handle_transport_event(event).await;
                Ok(())
            }
            _ if self.is_closed() => Err(SessionError::Closed),
            SessionInput::Initiate => self.initiate(name).await,
            SessionInput::SessionAck => {
                if self.config.initiator && self.state == NegotiationState::Idle {
                    info!("Join acknowledged for {}, starting offer", self.config.identity);
                    self.initiate(name).await
                } else {
                    debug!(
                        "Join acknowledged for {} while {:?}",
                        self.config.identity, self.state
                    );
                    Ok(())
                }
            }
            SessionInput::PeerJoined(role) => {
                if self.config.initiator
                    && role.is_operator()
                    && self.state == NegotiationState::Idle
                {
                    info!("{} joined room {}, starting offer", role, self.config.identity);
                    self.initiate(name).await
                } else {
                    debug!(
                        "{} joined room {} while {:?}",
                        role, self.config.identity, self.state
                    );
                    Ok(())
                }
            }
            SessionInput::RemoteOffer(sdp) => self.accept_offer(sdp).await,
            SessionInput::RemoteAnswer(sdp) => self.accept_answer(name, sdp).await,
            SessionInput::RemoteCandidate(candidate) => {
                self.accept_candidate(candidate).await;
                Ok(())
            }
            SessionInput::SignalingClosed => {
                if self.state == NegotiationState::Connected {
                    warn!(
                        "Signaling closed for {}, peer connection stays up",
                        self.config.identity
                    );
                } else {
                    self.close("signaling closed before the peer connected")
                        .await;
                }
                Ok(())
            }
        }
    }

    async fn initiate(&mut self, input: &'static str) -> Result<(), SessionError> {
        if self.state != NegotiationState::Idle {
            return Err(SessionError::IllegalTransition {
                state: self.state,
                input,
            });
        }

        self.set_state(NegotiationState::Offering);
        let result = self.offer_steps().await;
        self.finish(result).await
    }

    async fn offer_steps(&mut self) -> StepResult<()> {
        let generation = self.next_generation();
        let transport = self
            .factory
            .create(generation, self.events_tx.clone())
            .await
            .stage("creating peer connection")?;
        let transport = self.transport.insert(transport);

        transport
            .create_data_channel(COMMAND_CHANNEL_LABEL)
            .await
            .stage("creating data channel")?;
        let offer = transport.create_offer().await.stage("creating offer")?;
        self.signaling.send_offer(offer).await;

        self.set_state(NegotiationState::AwaitingRemote);
        Ok(())
    }

    async fn accept_offer(&mut self, sdp: String) -> Result<(), SessionError> {
        if self.transport.is_some() {
            info!(
                "New offer for {} while {:?}, replacing the peer connection",
                self.config.identity, self.state
            );
            self.release_peer().await;
        }

        self.set_state(NegotiationState::Answering);
        let result = self.answer_steps(sdp).await;
        self.finish(result).await
    }

    async fn answer_steps(&mut self, sdp: String) -> StepResult<()> {
        let generation = self.next_generation();
        let transport = self
            .factory
            .create(generation, self.events_tx.clone())
            .await
            .stage("creating peer connection")?;
        let transport = self.transport.insert(transport);

        transport
            .set_remote_description(SdpKind::Offer, sdp)
            .await
            .stage("applying remote offer")?;
        self.remote_applied = true;
        drain_pending(&mut self.pending, &**transport).await;

        let answer = transport.create_answer().await.stage("creating answer")?;
        self.signaling.send_answer(answer).await;

        self.set_state(NegotiationState::Negotiating);
        Ok(())
    }

    async fn accept_answer(&mut self, input: &'static str, sdp: String) -> Result<(), SessionError> {
        if self.state != NegotiationState::AwaitingRemote {
            return Err(SessionError::IllegalTransition {
                state: self.state,
                input,
            });
        }

        let result = self.apply_answer(sdp).await;
        self.finish(result).await
    }

    async fn apply_answer(&mut self, sdp: String) -> StepResult<()> {
        let Some(transport) = self.transport.as_ref() else {
            return Err(("applying remote answer", anyhow::anyhow!("no peer connection")));
        };

        transport
            .set_remote_description(SdpKind::Answer, sdp)
            .await
            .stage("applying remote answer")?;
        self.remote_applied = true;
        drain_pending(&mut self.pending, &**transport).await;

        self.set_state(NegotiationState::Negotiating);
        Ok(())
    }

    async fn accept_candidate(&mut self, candidate: IceCandidate) {
        let transport = match self.transport.as_ref() {
            Some(transport) if self.remote_applied => transport,
            _ => {
                self.pending.push(candidate);
                debug!(
                    "Queued remote ICE candidate for {} ({} pending)",
                    self.config.identity,
                    self.pending.len()
                );
                return;
            }
        };

        if let Err(e) = transport.add_ice_candidate(candidate).await {
            warn!(
                "Failed to add ICE candidate for {}: {:?}",
                self.config.identity, e
            );
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        if self.transport.is_none() || event.generation() != self.generation {
            debug!("Ignoring stale transport event {:?}", event);
            return;
        }

        match event {
            TransportEvent::CandidateGenerated(_, candidate) => {
                self.signaling.send_ice(candidate).await;
            }
            TransportEvent::ConnectionState(_, state) => match state {
                PeerState::Connected => {
                    if self.state == NegotiationState::Negotiating {
                        self.set_state(NegotiationState::Connected);
                    }
                }
                PeerState::Disconnected => {
                    warn!(
                        "Peer connection for {} disconnected, waiting for it to recover",
                        self.config.identity
                    );
                }
                PeerState::Failed | PeerState::Closed => {
                    self.close("peer connection lost").await;
                }
                PeerState::New | PeerState::Connecting => {}
            },
            TransportEvent::ChannelOpen(_, data_channel) => {
                self.channel.attach(data_channel).await;
                self.set_channel_state(ChannelState::Open);
            }
            TransportEvent::ChannelClosed(_) => {
                self.channel.detach().await;
                self.set_channel_state(ChannelState::Closed);
            }
            TransportEvent::Message(_, data) => {
                self.channel.receive(&data);
            }
        }
    }

    async fn finish(&mut self, result: StepResult<()>) -> Result<(), SessionError> {
        match result {
            Ok(()) => Ok(()),
            Err((stage, source)) => {
                error!(
                    "Negotiation for {} failed while {}: {:?}",
                    self.config.identity, stage, source
                );
                self.close("negotiation failed").await;
                Err(SessionError::Negotiation { stage, source })
            }
        }
    }

    /// Closes the data channel, then the peer connection.
    async fn release_peer(&mut self) {
        self.channel.detach().await;
        self.set_channel_state(ChannelState::Closed);

        self.remote_applied = false;
        let Some(transport) = self.transport.take() else {
            return;
        };
        if let Err(e) = transport.close().await {
            warn!(
                "Failed to close peer connection for {}: {:?}",
                self.config.identity, e
            );
        }
    }

    async fn close(&mut self, reason: &str) {
        if self.is_closed() {
            return;
        }

        self.release_peer().await;
        self.pending.clear();
        self.channel.shutdown();
        self.set_state(NegotiationState::Closed);
        info!(
            "Session {} for {} closed: {}",
            self.id, self.config.identity, reason
        );
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn set_state(&mut self, state: NegotiationState) {
        if self.state == state {
            return;
        }

        info!(
            "Session {} for {}: {:?} -> {:?}",
            self.id, self.config.identity, self.state, state
        );
        self.state = state;
        self.status_tx.send_modify(|status| status.negotiation = state);
    }

    fn set_channel_state(&mut self, state: ChannelState) {
        self.status_tx.send_if_modified(|status| {
            let changed = status.channel != state;
            status.channel = state;
            changed
        });
    }
}

async fn drain_pending(pending: &mut CandidateQueue, transport: &dyn PeerTransport) {
    let queued = pending.drain();
    if queued.is_empty() {
        return;
    }

    debug!("Applying {} queued ICE candidates", queued.len());
    for candidate in queued {
        if let Err(e) = transport.add_ice_candidate(candidate).await {
            warn!("Failed to add queued ICE candidate: {:?}", e);
        }
    }
}
