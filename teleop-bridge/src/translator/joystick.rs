use crate::translator::joystick_mapping::JoystickMapping;
use teleop_core::utils::{JOYSTICK_AXES, JOYSTICK_BUTTONS};
use teleop_core::{JoystickCommand, JoystickFrame, Stamp};

/// Turns native gamepad frames into fixed-shape robot joystick commands.
#[derive(Debug, Clone, Default)]
pub struct JoystickNormalizer {
    mapping: JoystickMapping,
}

impl JoystickNormalizer {
    pub fn new(mapping: JoystickMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &JoystickMapping {
        &self.mapping
    }

    /// Lays `frame` out as 8 axes and 11 buttons. Missing native values
    /// read as zero.
    pub fn normalize(&self, frame: &JoystickFrame) -> JoystickCommand {
        let mut axes = [0.0; JOYSTICK_AXES];
        for (slot, value) in axes.iter_mut().zip(&frame.axes) {
            *slot = finite(*value);
        }

        for &axis in &self.mapping.invert_axes {
            if let Some(slot) = axes.get_mut(axis) {
                *slot = -*slot;
            }
        }

        for trigger in &self.mapping.triggers {
            if let Some(slot) = axes.get_mut(trigger.axis) {
                *slot = native_button(frame, trigger.button);
            }
        }

        for dpad in &self.mapping.dpad {
            if let Some(slot) = axes.get_mut(dpad.axis) {
                *slot = native_button(frame, dpad.positive) - native_button(frame, dpad.negative);
            }
        }

        let mut buttons = [0; JOYSTICK_BUTTONS];
        for (slot, &native) in buttons.iter_mut().zip(&self.mapping.buttons) {
            if native_button(frame, native) >= self.mapping.button_press_threshold {
                *slot = 1;
            }
        }

        JoystickCommand {
            stamp: Stamp::now(),
            axes,
            buttons,
        }
    }

    /// True when every axis is inside the dead-zone and no button is pressed.
    pub fn is_neutral(&self, command: &JoystickCommand) -> bool {
        command
            .axes
            .iter()
            .all(|axis| axis.abs() < self.mapping.threshold)
            && command.buttons.iter().all(|&button| button == 0)
    }

    /// Normalizes `frame`, or returns `None` if the result is neutral.
    pub fn translate(&self, frame: &JoystickFrame) -> Option<JoystickCommand> {
        let command = self.normalize(frame);
        if self.is_neutral(&command) {
            None
        } else {
            Some(command)
        }
    }
}

fn native_button(frame: &JoystickFrame, index: usize) -> f64 {
    frame.buttons.get(index).copied().map(finite).unwrap_or(0.0)
}

fn finite(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
