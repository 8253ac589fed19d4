use crate::transport::peer_transport::DataChannel;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use teleop_core::IceCandidate;

/// Connectivity of the underlying peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Events a transport reports to the session that owns it. The first field
/// is the generation of the transport that produced the event.
pub enum TransportEvent {
    /// A local candidate was discovered and must be sent to the remote side.
    CandidateGenerated(u64, IceCandidate),

    ConnectionState(u64, PeerState),

    /// The command channel is open and ready to carry frames.
    ChannelOpen(u64, Arc<dyn DataChannel>),

    ChannelClosed(u64),

    /// One inbound frame from the command channel.
    Message(u64, Bytes),
}

impl TransportEvent {
    pub fn generation(&self) -> u64 {
        match self {
            TransportEvent::CandidateGenerated(generation, _)
            | TransportEvent::ConnectionState(generation, _)
            | TransportEvent::ChannelOpen(generation, _)
            | TransportEvent::ChannelClosed(generation)
            | TransportEvent::Message(generation, _) => *generation,
        }
    }
}

impl fmt::Debug for TransportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportEvent::CandidateGenerated(g, c) => f
                .debug_tuple("CandidateGenerated")
                .field(g)
                .field(&c.candidate)
                .finish(),
            TransportEvent::ConnectionState(g, s) => {
                f.debug_tuple("ConnectionState").field(g).field(s).finish()
            }
            TransportEvent::ChannelOpen(g, channel) => f
                .debug_tuple("ChannelOpen")
                .field(g)
                .field(&channel.label())
                .finish(),
            TransportEvent::ChannelClosed(g) => f.debug_tuple("ChannelClosed").field(g).finish(),
            TransportEvent::Message(g, data) => f
                .debug_tuple("Message")
                .field(g)
                .field(&data.len())
                .finish(),
        }
    }
}
