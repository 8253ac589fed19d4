use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::utils::{JOYSTICK_AXES, JOYSTICK_BUTTONS};

/// Wall-clock time split the way robot middleware headers carry it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    pub sec: i64,
    pub nanosec: u32,
}

impl Stamp {
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            sec: elapsed.as_secs() as i64,
            nanosec: elapsed.subsec_nanos(),
        }
    }
}

/// Raw controller state as an operator console reports it: whatever
/// lengths the physical device has, trigger buttons as analog values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoystickFrame {
    pub axes: Vec<f64>,
    #[serde(default)]
    pub buttons: Vec<f64>,
}

/// Fixed-shape command handed to the robot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JoystickCommand {
    pub stamp: Stamp,
    pub axes: [f64; JOYSTICK_AXES],
    pub buttons: [i32; JOYSTICK_BUTTONS],
}
