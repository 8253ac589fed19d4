use teleop_core::ControlEnvelope;

/// Commands a [`SessionHandle`](crate::SessionHandle) sends to its session
/// actor.
#[derive(Debug)]
pub enum SessionCommand {
    /// An envelope received from the signaling relay.
    Signal(ControlEnvelope),

    /// Start negotiating as the offering side.
    Initiate,

    /// The signaling connection went away.
    SignalingClosed,

    Stop,
}
