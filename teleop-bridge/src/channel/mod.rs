mod channel_handler;
mod command_channel;

pub use channel_handler::*;
pub use command_channel::*;
