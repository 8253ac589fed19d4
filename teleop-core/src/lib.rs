//! Wire model shared by the robot bridge, the signaling relay and operator
//! consoles.

pub mod model;
pub mod utils;

pub use model::*;
