use crate::transport::TransportEvent;
use teleop_core::{IceCandidate, Role};

/// Where a session is in its offer/answer handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationState {
    /// No peer connection exists.
    Idle,
    Offering,
    Answering,
    /// Local offer sent, waiting for the remote answer.
    AwaitingRemote,
    /// Descriptions exchanged, ICE connectivity checks in progress.
    Negotiating,
    Connected,
    Closed,
}

impl NegotiationState {
    /// Negotiating or connected.
    pub fn is_active(self) -> bool {
        !matches!(self, NegotiationState::Idle | NegotiationState::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    Closed,
    Open,
}

/// Snapshot published to session observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub negotiation: NegotiationState,
    pub channel: ChannelState,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            negotiation: NegotiationState::Idle,
            channel: ChannelState::Closed,
        }
    }
}

/// Every input the session state machine reacts to.
#[derive(Debug)]
pub enum SessionInput {
    Initiate,
    RemoteOffer(String),
    RemoteAnswer(String),
    RemoteCandidate(IceCandidate),
    SessionAck,
    /// Another member joined the room.
    PeerJoined(Role),
    Transport(TransportEvent),
    SignalingClosed,
    Stop,
}

impl SessionInput {
    pub fn name(&self) -> &'static str {
        match self {
            SessionInput::Initiate => "initiate",
            SessionInput::RemoteOffer(_) => "offer",
            SessionInput::RemoteAnswer(_) => "answer",
            SessionInput::RemoteCandidate(_) => "ice-candidate",
            SessionInput::SessionAck => "session-ack",
            SessionInput::PeerJoined(_) => "peer-joined",
            SessionInput::Transport(_) => "transport-event",
            SessionInput::SignalingClosed => "signaling-closed",
            SessionInput::Stop => "stop",
        }
    }
}
