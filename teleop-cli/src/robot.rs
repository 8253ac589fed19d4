use anyhow::Result;
use async_trait::async_trait;
use colored::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use teleop_bridge::{
    BridgeConfig, CommandTranslator, FileIdentitySource, GoalResult, JoystickNormalizer,
    PointCloudBridge, RobotCommandSink, SessionConfig, SessionRegistry, SignalingClient,
    SignalingEvent, WebRtcTransportFactory, load_identity, retry_until, serve_room,
};
use teleop_core::{
    BinCommand, ClickCommand, ConveyorCommand, Header, JoystickCommand, PointCloud, PointField,
    RecorderCommand, Role, RoomId, Stamp,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Points per side of the synthetic grid cloud.
const SYNTHETIC_CLOUD_SIDE: u32 = 64;

/// Sink for robots without a driver attached: every command is logged.
struct LoggingSink {
    point_clouds: Mutex<Option<mpsc::Receiver<PointCloud>>>,
}

impl LoggingSink {
    fn new(point_clouds: Option<mpsc::Receiver<PointCloud>>) -> Self {
        Self {
            point_clouds: Mutex::new(point_clouds),
        }
    }
}

#[async_trait]
impl RobotCommandSink for LoggingSink {
    async fn publish_joystick(&self, command: JoystickCommand) -> Result<()> {
        info!(
            "joystick axes={:?} buttons={:?}",
            command.axes, command.buttons
        );
        Ok(())
    }

    async fn publish_point(&self, command: ClickCommand) -> Result<()> {
        info!(
            "click on {} at ({}, {}, {})",
            command.video_id, command.coordinates.x, command.coordinates.y, command.coordinates.z
        );
        Ok(())
    }

    async fn publish_bin(&self, command: BinCommand) -> Result<()> {
        info!("move to bin {}", command.bin_id);
        Ok(())
    }

    async fn control_recorder(&self, command: RecorderCommand) -> Result<()> {
        info!("recorder {:?}", command.command);
        Ok(())
    }

    async fn invoke_conveyor_goal(&self, command: ConveyorCommand) -> Result<GoalResult> {
        info!("conveyor goal {:?}", command.command);
        Ok(GoalResult { success: true })
    }

    fn take_point_clouds(&self) -> Option<mpsc::Receiver<PointCloud>> {
        self.point_clouds.lock().ok()?.take()
    }
}

pub async fn run(
    config: BridgeConfig,
    synthetic_cloud_hz: Option<u32>,
    cancel: CancellationToken,
) -> Result<()> {
    let source = FileIdentitySource::new(&config.identity_file);
    println!(
        "{} {}",
        "🔎 Waiting for robot identity in".cyan(),
        config.identity_file.display()
    );
    let identity = load_identity(&source, &config.identity_policy(), &cancel).await?;
    println!("{} {}", "🤖 Robot identity:".green().bold(), identity);

    let registry = SessionRegistry::new(Arc::new(WebRtcTransportFactory::new(
        config.transport_config(),
    )));
    let clouds = synthetic_cloud_hz.map(|hz| synthetic_clouds(hz, cancel.clone()));
    let sink = Arc::new(LoggingSink::new(clouds));
    let cloud_task =
        PointCloudBridge::spawn_for(registry.clone(), identity.clone(), &config, sink.as_ref());
    let translator = Arc::new(CommandTranslator::new(
        JoystickNormalizer::new(config.joystick.clone()),
        sink,
    ));

    while !cancel.is_cancelled() {
        let Some((client, events)) = connect(&config, &identity, &cancel).await else {
            break;
        };

        tokio::select! {
            _ = serve_room(
                registry.clone(),
                SessionConfig::new(identity.clone(), Role::Robot),
                Arc::new(client.clone()),
                events,
                translator.clone(),
                config.reconnect.clone(),
            ) => {
                warn!("Lost signaling relay, reconnecting");
            }
            _ = cancel.cancelled() => {}
        }
        client.close();
    }

    registry.stop_all().await;
    if let Some(task) = cloud_task {
        task.abort();
    }
    println!("{}", "Robot bridge stopped".yellow());
    Ok(())
}

async fn connect(
    config: &BridgeConfig,
    identity: &RoomId,
    cancel: &CancellationToken,
) -> Option<(SignalingClient, mpsc::UnboundedReceiver<SignalingEvent>)> {
    retry_until(
        &config.reconnect,
        cancel,
        &config.signaling_url,
        |_| SignalingClient::connect(&config.signaling_url, identity.clone(), Role::Robot),
    )
    .await
    .ok()
}

/// Publishes a rippling XYZ grid at `hz`, for trying an operator console
/// without a depth sensor. Clouds the bridge has not picked up yet are
/// skipped.
fn synthetic_clouds(hz: u32, cancel: CancellationToken) -> mpsc::Receiver<PointCloud> {
    let (tx, rx) = mpsc::channel(2);
    let period = Duration::from_secs_f64(1.0 / f64::from(hz.max(1)));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        let mut phase = 0.0f32;

        while !tx.is_closed() {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = cancel.cancelled() => break,
            }
            let _ = tx.try_send(grid_cloud(SYNTHETIC_CLOUD_SIDE, phase));
            phase += 0.1;
        }
    });

    rx
}

fn grid_cloud(side: u32, phase: f32) -> PointCloud {
    // sensor_msgs/PointField FLOAT32
    const FLOAT32: u8 = 7;
    const POINT_STEP: u32 = 12;

    let fields = ["x", "y", "z"]
        .into_iter()
        .zip(0u32..)
        .map(|(name, index)| PointField {
            name: name.to_owned(),
            offset: index * 4,
            datatype: FLOAT32,
            count: 1,
        })
        .collect();

    let mut data = Vec::with_capacity((side * side * POINT_STEP) as usize);
    for row in 0..side {
        for col in 0..side {
            let x = col as f32 * 0.05;
            let y = row as f32 * 0.05;
            let z = 0.1 * (x * 4.0 + phase).sin() * (y * 4.0).cos();
            for value in [x, y, z] {
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
    }

    PointCloud {
        header: Header {
            stamp: Stamp::now(),
            frame_id: "base_link".to_owned(),
        },
        height: side,
        width: side,
        fields,
        is_bigendian: false,
        point_step: POINT_STEP,
        row_step: side * POINT_STEP,
        data,
        is_dense: true,
    }
}
