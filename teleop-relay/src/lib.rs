//! Signaling relay: groups websocket connections into rooms and forwards
//! negotiation envelopes between the members of a room.

mod server;
mod signaling;

pub use server::*;
pub use signaling::*;
