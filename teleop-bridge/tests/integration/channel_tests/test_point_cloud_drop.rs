use std::sync::Arc;

use teleop_bridge::{
    BridgeConfig, ChannelError, ChannelState, NegotiationState, PointCloudBridge,
    PointCloudSampler, RobotCommandSink,
};
use teleop_core::{ControlEnvelope, PointCloud, Role, RoomId};
use tokio::sync::mpsc;

use crate::integration::{ROBOT_ID, TestBridge, init_tracing};
use crate::utils::{
    EVENT_TIMEOUT_MS, RecordingSink, TRANSPORT_TIMEOUT_MS, TestChannelHandler, within,
    wait_for_state,
};

fn cloud(points: u32) -> PointCloud {
    PointCloud {
        height: 1,
        width: points,
        point_step: 4,
        row_step: points * 4,
        data: vec![7; points as usize * 4],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_samples_dropped_while_channel_closed() {
    init_tracing();

    let bridge = TestBridge::new();
    let mut clouds = PointCloudBridge::new(
        bridge.registry.clone(),
        RoomId::from(ROBOT_ID),
        PointCloudSampler::new(10),
    );

    // No session at all.
    assert!(matches!(
        clouds.forward(&cloud(4)).await,
        Err(ChannelError::NotConnected)
    ));

    let handle = bridge
        .start(Role::Robot, Arc::new(TestChannelHandler::new()))
        .await;
    handle.signal(ControlEnvelope::SessionAck).await.unwrap();
    let probe = bridge
        .factory
        .wait_for_transport(1, TRANSPORT_TIMEOUT_MS)
        .await;
    wait_for_state(&handle, NegotiationState::AwaitingRemote).await;

    // Negotiating, channel not open yet.
    assert!(matches!(
        clouds.forward(&cloud(4)).await,
        Err(ChannelError::NotOpen)
    ));

    handle
        .signal(ControlEnvelope::Answer {
            sdp: "remote-answer".to_string(),
        })
        .await
        .unwrap();
    wait_for_state(&handle, NegotiationState::Negotiating).await;
    probe.connect().await;
    let channel = probe.open_channel().await;
    within(EVENT_TIMEOUT_MS, handle.wait_for_channel(ChannelState::Open))
        .await
        .unwrap();
    wait_for_state(&handle, NegotiationState::Connected).await;

    clouds.forward(&cloud(40)).await.expect("Sample should be sent");
    let sent = channel.sent();
    assert_eq!(sent.len(), 1);
    let value: serde_json::Value = serde_json::from_str(&sent[0]).unwrap();
    assert_eq!(value["type"], "point-cloud");
    assert_eq!(value["data"]["width"], 10);
    assert_eq!(value["data"]["height"], 1);

    probe.close_channel().await;
    within(EVENT_TIMEOUT_MS, handle.wait_for_channel(ChannelState::Closed))
        .await
        .unwrap();

    assert!(clouds.forward(&cloud(4)).await.is_err());
    assert_eq!(clouds.dropped(), 3);
    assert_eq!(channel.sent().len(), 1);
}

#[tokio::test]
async fn test_run_stops_when_source_closes() {
    init_tracing();

    let bridge = TestBridge::new();
    let clouds = PointCloudBridge::new(
        bridge.registry.clone(),
        RoomId::from(ROBOT_ID),
        PointCloudSampler::new(10),
    );

    let (tx, rx) = mpsc::channel(8);
    let task = tokio::spawn(clouds.run(rx));

    tx.send(cloud(4)).await.unwrap();
    tx.send(cloud(4)).await.unwrap();
    drop(tx);

    within(EVENT_TIMEOUT_MS, task).await.unwrap();
}

#[tokio::test]
async fn test_sink_clouds_use_configured_bound() {
    init_tracing();

    let bridge = TestBridge::new();
    let config = BridgeConfig {
        point_cloud_max_points: 8,
        ..Default::default()
    };

    assert!(
        PointCloudBridge::spawn_for(
            bridge.registry.clone(),
            RoomId::from(ROBOT_ID),
            &config,
            &RecordingSink::new(),
        )
        .is_none()
    );

    let (sink, sensor) = RecordingSink::new().with_point_clouds(4);
    let task = PointCloudBridge::spawn_for(
        bridge.registry.clone(),
        RoomId::from(ROBOT_ID),
        &config,
        &sink,
    )
    .expect("sink publishes point clouds");
    assert!(sink.take_point_clouds().is_none());

    let handle = bridge
        .start(Role::Robot, Arc::new(TestChannelHandler::new()))
        .await;
    handle.signal(ControlEnvelope::SessionAck).await.unwrap();
    let probe = bridge
        .factory
        .wait_for_transport(1, TRANSPORT_TIMEOUT_MS)
        .await;
    wait_for_state(&handle, NegotiationState::AwaitingRemote).await;
    handle
        .signal(ControlEnvelope::Answer {
            sdp: "remote-answer".to_string(),
        })
        .await
        .unwrap();
    wait_for_state(&handle, NegotiationState::Negotiating).await;
    probe.connect().await;
    let channel = probe.open_channel().await;
    within(EVENT_TIMEOUT_MS, handle.wait_for_channel(ChannelState::Open))
        .await
        .unwrap();

    sensor.send(cloud(64)).await.unwrap();
    within(EVENT_TIMEOUT_MS, async {
        while channel.sent().is_empty() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await;

    let value: serde_json::Value = serde_json::from_str(&channel.sent()[0]).unwrap();
    assert_eq!(value["type"], "point-cloud");
    assert_eq!(value["data"]["width"], 8);

    drop(sensor);
    within(EVENT_TIMEOUT_MS, task).await.unwrap();
}
