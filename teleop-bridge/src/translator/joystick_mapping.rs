use serde::{Deserialize, Serialize};
use teleop_core::utils::{JOYSTICK_BUTTONS, JOYSTICK_SENSITIVITY_THRESHOLD};

/// Copies an analog native button (a trigger) into an axis slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerMapping {
    pub button: usize,
    pub axis: usize,
}

/// Writes `positive - negative` of two native buttons into an axis slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DpadMapping {
    pub positive: usize,
    pub negative: usize,
    pub axis: usize,
}

/// How a native gamepad state is laid out into a robot joystick command.
///
/// Robot variants disagree on this layout, so every index is data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoystickMapping {
    /// Dead-zone: axes below this magnitude count as neutral.
    pub threshold: f64,
    /// Axis slots whose sign is flipped.
    pub invert_axes: Vec<usize>,
    pub triggers: Vec<TriggerMapping>,
    pub dpad: Vec<DpadMapping>,
    /// Native button index for each logical robot button.
    pub buttons: [usize; JOYSTICK_BUTTONS],
    /// Native values at or above this count as pressed.
    pub button_press_threshold: f64,
}

impl Default for JoystickMapping {
    fn default() -> Self {
        Self {
            threshold: JOYSTICK_SENSITIVITY_THRESHOLD,
            invert_axes: Vec::new(),
            triggers: vec![
                TriggerMapping { button: 6, axis: 4 },
                TriggerMapping { button: 7, axis: 5 },
            ],
            dpad: vec![
                DpadMapping {
                    positive: 14,
                    negative: 15,
                    axis: 6,
                },
                DpadMapping {
                    positive: 12,
                    negative: 13,
                    axis: 7,
                },
            ],
            buttons: [0, 1, 2, 3, 4, 5, 8, 9, 16, 10, 11],
            button_press_threshold: 0.5,
        }
    }
}
