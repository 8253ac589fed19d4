use crate::channel::{ChannelHandler, CommandChannel};
use crate::sink::{GoalResult, RobotCommandSink};
use crate::translator::joystick::JoystickNormalizer;
use async_trait::async_trait;
use std::sync::Arc;
use teleop_core::CommandMessage;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What happened to one inbound command.
#[derive(Debug)]
pub enum Dispatch {
    /// Joystick frame inside the dead-zone.
    Suppressed,
    Published,
    /// Conveyor goal running in the background. Awaiting it is optional.
    Goal(JoinHandle<anyhow::Result<GoalResult>>),
    Failed(anyhow::Error),
    /// Not meant for the robot side.
    Ignored,
}

/// Robot side handler: normalizes operator commands and hands them to the
/// [`RobotCommandSink`].
pub struct CommandTranslator {
    normalizer: JoystickNormalizer,
    sink: Arc<dyn RobotCommandSink>,
}

impl CommandTranslator {
    pub fn new(normalizer: JoystickNormalizer, sink: Arc<dyn RobotCommandSink>) -> Self {
        Self { normalizer, sink }
    }

    pub async fn dispatch(&self, command: CommandMessage) -> Dispatch {
        let kind = command.kind();

        let result = match command {
            CommandMessage::Joystick(frame) => match self.normalizer.translate(&frame) {
                Some(joystick) => self.sink.publish_joystick(joystick).await,
                None => return Dispatch::Suppressed,
            },
            CommandMessage::Click(click) => self.sink.publish_point(click).await,
            CommandMessage::Bin(bin) => self.sink.publish_bin(bin).await,
            CommandMessage::Recorder(recorder) => self.sink.control_recorder(recorder).await,
            CommandMessage::Conveyor(conveyor) => {
                let sink = self.sink.clone();
                let goal = tokio::spawn(async move {
                    let result = sink.invoke_conveyor_goal(conveyor).await;
                    match &result {
                        Ok(GoalResult { success: true }) => {
                            info!("Conveyor goal {:?} succeeded", conveyor.command)
                        }
                        Ok(GoalResult { success: false }) => {
                            warn!("Conveyor goal {:?} reported failure", conveyor.command)
                        }
                        Err(e) => warn!("Conveyor goal {:?} failed: {:?}", conveyor.command, e),
                    }
                    result
                });
                return Dispatch::Goal(goal);
            }
            CommandMessage::PointCloud(_) => {
                debug!("Ignoring point cloud sent to the robot");
                return Dispatch::Ignored;
            }
        };

        match result {
            Ok(()) => Dispatch::Published,
            Err(e) => {
                warn!("Robot sink rejected '{}': {:?}", kind, e);
                Dispatch::Failed(e)
            }
        }
    }
}

#[async_trait]
impl ChannelHandler for CommandTranslator {
    async fn on_open(&self, channel: &CommandChannel) {
        info!("Command channel for {} open", channel.identity());
    }

    async fn on_command(&self, _channel: &CommandChannel, command: CommandMessage) {
        let _ = self.dispatch(command).await;
    }

    async fn on_close(&self, channel: &CommandChannel) {
        info!("Command channel for {} closed", channel.identity());
    }
}
