//! Session negotiation and command bridging between an operator console and
//! a robot.
//!
//! A [`SessionRegistry`] keeps at most one live [`SessionHandle`] per robot
//! identity. Each session is an actor that owns its peer transport, its ICE
//! candidate queue and its [`CommandChannel`]; signaling envelopes and
//! transport events are fed to it through channels so every mutation happens
//! on one task. Inbound channel frames are decoded and handed to a
//! [`ChannelHandler`], normally the [`CommandTranslator`], which normalizes
//! them and drives a [`RobotCommandSink`].

mod channel;
mod config;
mod error;
mod identity;
mod retry;
mod session;
mod signaling;
mod sink;
mod transport;
mod translator;

pub use channel::*;
pub use config::*;
pub use error::*;
pub use identity::*;
pub use retry::*;
pub use session::*;
pub use signaling::*;
pub use sink::*;
pub use transport::*;
pub use translator::*;
