use std::sync::Arc;

use teleop_bridge::{ChannelState, CommandTranslator, JoystickNormalizer, NegotiationState};
use teleop_core::{ClickCommand, ControlEnvelope, Coordinates, Role};

use crate::integration::{TestBridge, init_tracing};
use crate::utils::{
    EVENT_TIMEOUT_MS, RecordingSink, SinkCall, TRANSPORT_TIMEOUT_MS, within, wait_for_state,
};

#[tokio::test]
async fn test_click_is_forwarded_unmodified() {
    init_tracing();

    let bridge = TestBridge::new();
    let sink = RecordingSink::new();
    let translator = CommandTranslator::new(JoystickNormalizer::default(), Arc::new(sink.clone()));
    let handle = bridge.start(Role::Robot, Arc::new(translator)).await;

    handle.initiate().await.unwrap();
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
    probe.open_channel().await;
    within(EVENT_TIMEOUT_MS, handle.wait_for_channel(ChannelState::Open))
        .await
        .unwrap();

    probe
        .deliver(r#"{"type":"click-coordinates","videoId":"cam1","coordinates":{"x":120,"y":80,"z":0}}"#)
        .await;

    assert!(sink.wait_for_calls(1, EVENT_TIMEOUT_MS).await);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert_eq!(
        sink.calls().await,
        vec![SinkCall::Point(ClickCommand {
            video_id: "cam1".to_string(),
            coordinates: Coordinates { x: 120, y: 80, z: 0 },
        })]
    );
}
