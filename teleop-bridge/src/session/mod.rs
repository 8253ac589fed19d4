mod candidate_queue;
mod session;
mod session_actor;
mod session_command;
mod session_handle;
mod session_registry;
mod session_state;

pub use candidate_queue::*;
pub use session::*;
pub use session_command::*;
pub use session_handle::*;
pub use session_registry::*;
pub use session_state::*;
