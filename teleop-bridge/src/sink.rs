use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use teleop_core::{
    BinCommand, ClickCommand, ConveyorCommand, JoystickCommand, PointCloud, RecorderCommand,
};
use tokio::sync::mpsc;

/// Outcome of a conveyor goal reported by the robot's action server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalResult {
    pub success: bool,
}

/// The robot's actuation interface. Implementations forward normalized
/// commands to whatever drives the robot.
#[async_trait]
pub trait RobotCommandSink: Send + Sync + 'static {
    async fn publish_joystick(&self, command: JoystickCommand) -> Result<()>;

    async fn publish_point(&self, command: ClickCommand) -> Result<()>;

    async fn publish_bin(&self, command: BinCommand) -> Result<()>;

    /// Starts or stops the on-robot video recorder.
    async fn control_recorder(&self, command: RecorderCommand) -> Result<()>;

    /// Runs a jam/release goal to completion.
    async fn invoke_conveyor_goal(&self, command: ConveyorCommand) -> Result<GoalResult>;

    /// Point clouds published by the robot's sensors. Taken once when the
    /// bridge starts. Robots without a depth sensor return `None`.
    fn take_point_clouds(&self) -> Option<mpsc::Receiver<PointCloud>> {
        None
    }
}
