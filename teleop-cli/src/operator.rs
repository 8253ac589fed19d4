use anyhow::{Result, bail};
use async_trait::async_trait;
use colored::*;
use std::sync::Arc;
use teleop_bridge::{
    BridgeConfig, ChannelHandler, ChannelState, CommandChannel, NegotiationState, SessionConfig,
    SessionHandle, SessionRegistry, SignalingClient, WebRtcTransportFactory, forward_to_session,
    retry_until,
};
use teleop_core::{CommandMessage, RoomId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

/// Prints what the robot sends back.
struct ConsoleHandler;

#[async_trait]
impl ChannelHandler for ConsoleHandler {
    async fn on_open(&self, channel: &CommandChannel) {
        println!(
            "{} {}",
            "✅ Command channel open to".green().bold(),
            channel.identity()
        );
    }

    async fn on_command(&self, _channel: &CommandChannel, command: CommandMessage) {
        match command {
            CommandMessage::PointCloud(sample) => println!(
                "{} {}x{} ({} bytes, frame '{}')",
                "☁️  point cloud".cyan(),
                sample.width,
                sample.height,
                sample.data.len(),
                sample.header.frame_id
            ),
            other => println!("{} {:?}", "⬅️ ".cyan(), other),
        }
    }

    async fn on_close(&self, channel: &CommandChannel) {
        println!(
            "{} {}",
            "❌ Command channel closed to".red().bold(),
            channel.identity()
        );
    }
}

pub async fn run(config: BridgeConfig, room: RoomId, cancel: CancellationToken) -> Result<()> {
    let role = config.role;
    let connected = retry_until(&config.reconnect, &cancel, &config.signaling_url, |_| {
        SignalingClient::connect(&config.signaling_url, room.clone(), role)
    })
    .await;
    let Ok((client, mut events)) = connected else {
        return Ok(());
    };

    let registry = SessionRegistry::new(Arc::new(WebRtcTransportFactory::new(
        config.transport_config(),
    )));
    let session = registry
        .start_session(
            SessionConfig::new(room.clone(), role),
            Arc::new(client.clone()),
            Arc::new(ConsoleHandler),
        )
        .await;
    let forwarder = tokio::spawn({
        let session = session.clone();
        async move { forward_to_session(&mut events, &session).await }
    });

    println!("{} {}", "⏳ Waiting for robot".cyan(), room);
    let opened = tokio::select! {
        opened = session.wait_for_channel(ChannelState::Open) => opened,
        _ = cancel.cancelled() => Ok(()),
    };

    let result = match opened {
        Ok(()) if !cancel.is_cancelled() => send_stdin(&session, &cancel).await,
        Ok(()) => Ok(()),
        Err(e) => Err(e.into()),
    };

    client.close();
    registry.stop_all().await;
    forwarder.abort();
    result
}

async fn send_stdin(session: &SessionHandle, cancel: &CancellationToken) -> Result<()> {
    println!("{}", "Type one JSON command per line, Ctrl-D to quit".dimmed());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = cancel.cancelled() => return Ok(()),
        };
        let Some(line) = line else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match CommandMessage::decode(line.as_bytes()) {
            Ok(command) => command,
            Err(e) => {
                println!("{} {}", "⚠️  not a command:".yellow(), e);
                continue;
            }
        };

        match session.channel().send(&command).await {
            Ok(()) => println!("{} {}", "➡️ ".green(), command.kind()),
            Err(e) if session.status().negotiation == NegotiationState::Closed => {
                bail!("Session ended: {}", e)
            }
            Err(e) => println!("{} {}", "⚠️  not sent:".yellow(), e),
        }
    }
}
