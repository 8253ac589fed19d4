use crate::transport::transport_event::TransportEvent;
use anyhow::Result;
use async_trait::async_trait;
use teleop_core::{IceCandidate, SdpKind};
use tokio::sync::mpsc;

/// An ordered, reliable message channel opened over a peer connection.
#[async_trait]
pub trait DataChannel: Send + Sync {
    fn label(&self) -> String;

    fn is_open(&self) -> bool;

    async fn send_text(&self, text: String) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// One peer connection, used for a single offer/answer negotiation.
///
/// Everything the connection discovers on its own (local candidates,
/// connectivity changes, channels, inbound frames) is reported through the
/// event sender it was created with.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Creates the command channel on the initiating side. The answering side
    /// learns about the channel through [`TransportEvent::ChannelOpen`].
    async fn create_data_channel(&self, label: &str) -> Result<()>;

    /// Creates a local offer and applies it as the local description.
    async fn create_offer(&self) -> Result<String>;

    /// Creates a local answer and applies it as the local description.
    async fn create_answer(&self) -> Result<String>;

    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Builds a fresh transport for every negotiation. `generation` tags every
/// event the transport emits so that events from a replaced transport can
/// be told apart.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        generation: u64,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>>;
}
