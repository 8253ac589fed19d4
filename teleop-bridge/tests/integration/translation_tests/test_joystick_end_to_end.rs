use std::sync::Arc;

use teleop_bridge::{
    ChannelState, CommandTranslator, Dispatch, JoystickNormalizer, NegotiationState,
};
use teleop_core::{CommandMessage, ControlEnvelope, JoystickFrame, Role};

use crate::integration::{TestBridge, init_tracing};
use crate::utils::{
    EVENT_TIMEOUT_MS, RecordingSink, TRANSPORT_TIMEOUT_MS, within, wait_for_state,
};

#[tokio::test]
async fn test_joystick_frame_reaches_sink_with_mapped_triggers() {
    init_tracing();

    let bridge = TestBridge::new();
    let sink = RecordingSink::new();
    let translator = CommandTranslator::new(JoystickNormalizer::default(), Arc::new(sink.clone()));
    let handle = bridge.start(Role::Robot, Arc::new(translator)).await;

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
    probe.open_channel().await;
    within(EVENT_TIMEOUT_MS, handle.wait_for_channel(ChannelState::Open))
        .await
        .unwrap();

    // Neutral frame first: must not reach the robot.
    probe
        .deliver(r#"{"axes":[0.01,-0.02,0,0,0,0,0,0],"buttons":[0,0,0,0,0,0,0,0]}"#)
        .await;
    probe
        .deliver(
            r#"{"axes":[0.2,0,0,0,0,0,0.5,0.8],"buttons":[0,0,0,0,0,0,0.5,0.8,0,0,0,0,0,0,0,0,0]}"#,
        )
        .await;

    assert!(sink.wait_for_calls(1, EVENT_TIMEOUT_MS).await);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let commands = sink.joystick_commands().await;
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].axes, [0.2, 0.0, 0.0, 0.0, 0.5, 0.8, 0.0, 0.0]);
    assert_eq!(commands[0].buttons, [0; 11]);
}

#[tokio::test]
async fn test_dead_zone_suppresses_dispatch() {
    init_tracing();

    let sink = RecordingSink::new();
    let translator = CommandTranslator::new(JoystickNormalizer::default(), Arc::new(sink.clone()));

    let neutral = CommandMessage::Joystick(JoystickFrame {
        axes: vec![0.08, -0.08, 0.0, 0.05],
        buttons: vec![0.0; 17],
    });
    assert!(matches!(translator.dispatch(neutral).await, Dispatch::Suppressed));

    let pressed = CommandMessage::Joystick(JoystickFrame {
        axes: vec![0.0; 4],
        buttons: vec![1.0],
    });
    assert!(matches!(translator.dispatch(pressed).await, Dispatch::Published));

    let commands = sink.joystick_commands().await;
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].axes.len(), 8);
    assert_eq!(commands[0].buttons[0], 1);
}

#[tokio::test]
async fn test_sink_failure_is_reported_not_raised() {
    init_tracing();

    let sink = RecordingSink::new();
    sink.fail_publishing();
    let translator = CommandTranslator::new(JoystickNormalizer::default(), Arc::new(sink.clone()));

    let frame = CommandMessage::Joystick(JoystickFrame {
        axes: vec![0.5],
        buttons: vec![],
    });
    assert!(matches!(translator.dispatch(frame).await, Dispatch::Failed(_)));
}
