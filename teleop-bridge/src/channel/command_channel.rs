use crate::channel::channel_handler::ChannelHandler;
use crate::error::ChannelError;
use crate::session::{NegotiationState, SessionStatus};
use crate::transport::DataChannel;
use std::sync::{Arc, Weak};
use teleop_core::{CommandMessage, DecodeError, RoomId};
use tokio::sync::{RwLock, mpsc, watch};
use tracing::{debug, warn};

enum ChannelEvent {
    Opened,
    Command(CommandMessage),
    Closed,
    Shutdown,
}

struct ChannelInner {
    identity: RoomId,
    data_channel: RwLock<Option<Arc<dyn DataChannel>>>,
    status: watch::Receiver<SessionStatus>,
    events: mpsc::UnboundedSender<ChannelEvent>,
}

/// The ordered, reliable command channel of one session.
///
/// Cheap to clone. Sending reports failure instead of panicking when the
/// peer is not connected or the channel is not open yet.
#[derive(Clone)]
pub struct CommandChannel {
    inner: Arc<ChannelInner>,
}

impl CommandChannel {
    pub(crate) fn new(
        identity: RoomId,
        status: watch::Receiver<SessionStatus>,
        handler: Arc<dyn ChannelHandler>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(ChannelInner {
            identity,
            data_channel: RwLock::new(None),
            status,
            events: events_tx,
        });

        tokio::spawn(dispatch_events(Arc::downgrade(&inner), events_rx, handler));

        Self { inner }
    }

    pub fn identity(&self) -> &RoomId {
        &self.inner.identity
    }

    pub async fn is_open(&self) -> bool {
        self.inner
            .data_channel
            .read()
            .await
            .as_ref()
            .is_some_and(|channel| channel.is_open())
    }

    /// Serializes `command` and writes it to the data channel.
    pub async fn send(&self, command: &CommandMessage) -> Result<(), ChannelError> {
        if self.inner.status.borrow().negotiation != NegotiationState::Connected {
            return Err(ChannelError::NotConnected);
        }

        let channel = self
            .inner
            .data_channel
            .read()
            .await
            .clone()
            .ok_or(ChannelError::NotOpen)?;
        if !channel.is_open() {
            return Err(ChannelError::NotOpen);
        }

        let text = command.encode()?;
        channel.send_text(text).await.map_err(ChannelError::Send)
    }

    pub(crate) async fn attach(&self, channel: Arc<dyn DataChannel>) {
        let previous = self.inner.data_channel.write().await.replace(channel);
        if let Some(previous) = previous {
            let _ = previous.close().await;
        }
        let _ = self.inner.events.send(ChannelEvent::Opened);
    }

    /// Closes and forgets the current data channel, if any.
    pub(crate) async fn detach(&self) {
        let Some(channel) = self.inner.data_channel.write().await.take() else {
            return;
        };
        if let Err(e) = channel.close().await {
            debug!(
                "Closing command channel for {} failed: {:?}",
                self.inner.identity, e
            );
        }
        let _ = self.inner.events.send(ChannelEvent::Closed);
    }

    /// Decodes one inbound frame and queues it for the handler.
    pub(crate) fn receive(&self, raw: &[u8]) {
        match CommandMessage::decode(raw) {
            Ok(command) => {
                let _ = self.inner.events.send(ChannelEvent::Command(command));
            }
            Err(DecodeError::UnknownType(kind)) => {
                warn!(
                    "Ignoring command of unknown type '{}' from {}",
                    kind, self.inner.identity
                );
            }
            Err(e) => {
                warn!("Ignoring malformed command from {}: {}", self.inner.identity, e);
            }
        }
    }

    /// Stops the handler task once queued events are delivered.
    pub(crate) fn shutdown(&self) {
        let _ = self.inner.events.send(ChannelEvent::Shutdown);
    }
}

async fn dispatch_events(
    inner: Weak<ChannelInner>,
    mut events: mpsc::UnboundedReceiver<ChannelEvent>,
    handler: Arc<dyn ChannelHandler>,
) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let channel = CommandChannel { inner };

        match event {
            ChannelEvent::Opened => handler.on_open(&channel).await,
            ChannelEvent::Command(command) => handler.on_command(&channel, command).await,
            ChannelEvent::Closed => handler.on_close(&channel).await,
            ChannelEvent::Shutdown => break,
        }
    }
}
