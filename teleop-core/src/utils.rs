/// Public STUN server used when no ICE servers are configured.
pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";

/// Axis magnitude below which joystick input counts as neutral.
pub const JOYSTICK_SENSITIVITY_THRESHOLD: f64 = 0.09;

/// Number of axes in a normalized joystick command.
pub const JOYSTICK_AXES: usize = 8;

/// Number of logical buttons in a normalized joystick command.
pub const JOYSTICK_BUTTONS: usize = 11;

/// Label of the ordered, reliable command channel.
pub const COMMAND_CHANNEL_LABEL: &str = "dataChannel";
