use std::path::PathBuf;

use crate::session::NegotiationState;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("`{input}` is not valid while the session is {state:?}")]
    IllegalTransition {
        state: NegotiationState,
        input: &'static str,
    },

    #[error("negotiation failed while {stage}: {source}")]
    Negotiation {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("session is closed")]
    Closed,
}

/// Why a command could not be handed to the data channel. Sending never
/// panics; callers decide whether to drop or resample.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("peer connection is not connected")]
    NotConnected,

    #[error("command channel is not open")]
    NotOpen,

    #[error("failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("data channel send failed: {0}")]
    Send(#[source] anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum SignalingError {
    #[error("could not connect to signaling relay: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("signaling connection is closed")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
#[error("gave up after {attempts} attempts: cancelled")]
pub struct RetryCancelled {
    pub attempts: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity read cancelled")]
    Cancelled(#[from] RetryCancelled),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
