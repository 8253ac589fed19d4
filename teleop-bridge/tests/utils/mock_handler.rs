use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use teleop_bridge::{ChannelHandler, CommandChannel};
use teleop_core::CommandMessage;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum HandlerEvent {
    Open,
    Command(CommandMessage),
    Close,
}

/// ChannelHandler that records every callback.
#[derive(Clone, Default)]
pub struct TestChannelHandler {
    events: Arc<Mutex<Vec<HandlerEvent>>>,
}

impl TestChannelHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<HandlerEvent> {
        self.events.lock().await.clone()
    }

    pub async fn commands(&self) -> Vec<CommandMessage> {
        self.events()
            .await
            .into_iter()
            .filter_map(|event| match event {
                HandlerEvent::Command(command) => Some(command),
                _ => None,
            })
            .collect()
    }

    /// Waits until at least `count` events were recorded.
    pub async fn wait_for_events(&self, count: usize, timeout_ms: u64) -> bool {
        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(timeout_ms);

        while start.elapsed() < timeout {
            if self.events.lock().await.len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

#[async_trait]
impl ChannelHandler for TestChannelHandler {
    async fn on_open(&self, _channel: &CommandChannel) {
        self.events.lock().await.push(HandlerEvent::Open);
    }

    async fn on_command(&self, _channel: &CommandChannel, command: CommandMessage) {
        self.events.lock().await.push(HandlerEvent::Command(command));
    }

    async fn on_close(&self, _channel: &CommandChannel) {
        self.events.lock().await.push(HandlerEvent::Close);
    }
}
