use crate::channel::command_channel::CommandChannel;
use async_trait::async_trait;
use teleop_core::CommandMessage;

/// Reacts to command channel traffic of one session.
///
/// Callbacks run on a dedicated task, in the order the events happened, so a
/// slow handler never stalls negotiation.
#[async_trait]
pub trait ChannelHandler: Send + Sync + 'static {
    async fn on_open(&self, channel: &CommandChannel);

    async fn on_command(&self, channel: &CommandChannel, command: CommandMessage);

    async fn on_close(&self, channel: &CommandChannel);
}
