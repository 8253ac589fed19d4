use crate::channel::{ChannelHandler, CommandChannel};
use crate::error::SessionError;
use crate::session::session::{Session, SessionConfig};
use crate::session::session_actor::SessionActor;
use crate::session::session_command::SessionCommand;
use crate::session::session_state::{ChannelState, NegotiationState, SessionStatus};
use crate::signaling::SignalingOutput;
use crate::transport::TransportFactory;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use teleop_core::{ControlEnvelope, RoomId, SessionId};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::warn;

/// Commands a session buffers before senders wait.
pub const COMMAND_QUEUE_CAPACITY: usize = 100;

/// How long [`SessionHandle::stop`] waits for the actor, queueing the stop
/// included, before aborting it.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Client side of a running session actor.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    identity: RoomId,
    command_tx: mpsc::Sender<SessionCommand>,
    status_rx: watch::Receiver<SessionStatus>,
    channel: CommandChannel,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SessionHandle {
    /// Spawns an actor for a new, idle session.
    pub fn spawn(
        config: SessionConfig,
        factory: Arc<dyn TransportFactory>,
        signaling: Arc<dyn SignalingOutput>,
        handler: Arc<dyn ChannelHandler>,
    ) -> Self {
        let (handle, actor) = Self::build(config, factory, signaling, handler, None);
        handle.start(actor);
        handle
    }

    pub(crate) fn build(
        config: SessionConfig,
        factory: Arc<dyn TransportFactory>,
        signaling: Arc<dyn SignalingOutput>,
        handler: Arc<dyn ChannelHandler>,
        sessions: Option<Arc<DashMap<RoomId, SessionHandle>>>,
    ) -> (Self, SessionActor) {
        let identity = config.identity.clone();
        let (session, transport_rx) = Session::new(config, factory, signaling, handler);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);

        let handle = Self {
            id: session.id(),
            identity,
            command_tx,
            status_rx: session.subscribe(),
            channel: session.channel().clone(),
            task: Arc::new(Mutex::new(None)),
        };
        let actor = SessionActor::new(session, command_rx, transport_rx, sessions);

        (handle, actor)
    }

    pub(crate) fn start(&self, actor: SessionActor) {
        let task = tokio::spawn(actor.run());
        if let Ok(mut slot) = self.task.try_lock() {
            *slot = Some(task);
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn identity(&self) -> &RoomId {
        &self.identity
    }

    pub fn channel(&self) -> &CommandChannel {
        &self.channel
    }

    /// Latest status. A session whose actor is gone reports `Closed`.
    pub fn status(&self) -> SessionStatus {
        let mut status = *self.status_rx.borrow();
        if self.status_rx.has_changed().is_err() {
            status.negotiation = NegotiationState::Closed;
            status.channel = ChannelState::Closed;
        }
        status
    }

    pub async fn signal(&self, envelope: ControlEnvelope) -> Result<(), SessionError> {
        self.send(SessionCommand::Signal(envelope)).await
    }

    pub async fn initiate(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Initiate).await
    }

    pub async fn signaling_closed(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::SignalingClosed).await
    }

    /// Waits until the session reaches `state`. Fails with
    /// [`SessionError::Closed`] if it closes first.
    pub async fn wait_for_state(&self, state: NegotiationState) -> Result<(), SessionError> {
        self.wait_until(|status| status.negotiation == state).await
    }

    pub async fn wait_for_channel(&self, state: ChannelState) -> Result<(), SessionError> {
        self.wait_until(|status| status.channel == state).await
    }

    async fn wait_until(
        &self,
        mut done: impl FnMut(&SessionStatus) -> bool,
    ) -> Result<(), SessionError> {
        let mut rx = self.status_rx.clone();
        let reached = rx
            .wait_for(|status| done(status) || status.negotiation == NegotiationState::Closed)
            .await
            .map(|status| done(&status))
            .unwrap_or(false);

        if reached || done(&self.status()) {
            Ok(())
        } else {
            Err(SessionError::Closed)
        }
    }

    /// Stops the session and waits for its actor to finish. Safe to call
    /// from any state and more than once.
    pub async fn stop(&self) {
        let deadline = Instant::now() + STOP_TIMEOUT;
        // A full command queue must not hold the deadline off.
        let _ = tokio::time::timeout_at(deadline, self.command_tx.send(SessionCommand::Stop)).await;

        let Some(mut task) = self.task.lock().await.take() else {
            return;
        };
        if tokio::time::timeout_at(deadline, &mut task).await.is_err() {
            warn!("Session {} did not stop in time, aborting", self.id);
            task.abort();
        }
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| SessionError::Closed)
    }
}
