mod signaling_client;
mod signaling_output;

pub use signaling_client::*;
pub use signaling_output::*;
