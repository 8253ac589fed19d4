mod command_translator;
mod joystick;
mod joystick_mapping;
mod point_cloud;

pub use command_translator::*;
pub use joystick::*;
pub use joystick_mapping::*;
pub use point_cloud::*;
