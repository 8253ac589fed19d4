use std::sync::Arc;

use teleop_bridge::NegotiationState;
use teleop_core::{ControlEnvelope, Role, RoomId};

use crate::integration::{ROBOT_ID, TestBridge, init_tracing};
use crate::utils::{TRANSPORT_TIMEOUT_MS, TestChannelHandler, wait_for_state};

fn offer(sdp: &str) -> ControlEnvelope {
    ControlEnvelope::Offer {
        sdp: sdp.to_string(),
    }
}

#[tokio::test]
async fn test_new_session_supersedes_connected_one() {
    init_tracing();

    let bridge = TestBridge::new();
    let handler = Arc::new(TestChannelHandler::new());

    let first = bridge.start(Role::Workstation, handler.clone()).await;
    first.signal(offer("offer-1")).await.unwrap();
    let first_probe = bridge
        .factory
        .wait_for_transport(1, TRANSPORT_TIMEOUT_MS)
        .await;
    wait_for_state(&first, NegotiationState::Negotiating).await;
    first_probe.connect().await;
    wait_for_state(&first, NegotiationState::Connected).await;

    let second = bridge.start(Role::Workstation, handler.clone()).await;

    // The old session is fully torn down before the new one is registered.
    assert_eq!(first.status().negotiation, NegotiationState::Closed);
    assert!(first_probe.is_closed());
    assert_ne!(first.id(), second.id());

    second.signal(offer("offer-2")).await.unwrap();
    let second_probe = bridge
        .factory
        .wait_for_transport(2, TRANSPORT_TIMEOUT_MS)
        .await;
    wait_for_state(&second, NegotiationState::Negotiating).await;
    second_probe.connect().await;
    wait_for_state(&second, NegotiationState::Connected).await;

    let identity = RoomId::from(ROBOT_ID);
    assert_eq!(bridge.registry.len(), 1);
    assert_eq!(bridge.registry.get(&identity).unwrap().id(), second.id());

    let connected = [&first, &second]
        .iter()
        .filter(|handle| handle.status().negotiation == NegotiationState::Connected)
        .count();
    assert_eq!(connected, 1);

    // The old handle is inert.
    assert!(first.signal(offer("late")).await.is_err());
}

#[tokio::test]
async fn test_sessions_for_different_robots_coexist() {
    init_tracing();

    let bridge = TestBridge::new();
    let handler = Arc::new(TestChannelHandler::new());

    let first = bridge.start(Role::Workstation, handler.clone()).await;
    let other = bridge
        .registry
        .start_session(
            teleop_bridge::SessionConfig::new(RoomId::from("robot-8"), Role::Workstation),
            Arc::new(bridge.signaling.clone()),
            handler,
        )
        .await;

    assert_eq!(bridge.registry.len(), 2);
    assert_eq!(first.status().negotiation, NegotiationState::Idle);
    assert_eq!(other.status().negotiation, NegotiationState::Idle);

    bridge.registry.stop_all().await;
    assert!(bridge.registry.is_empty());
    assert_eq!(first.status().negotiation, NegotiationState::Closed);
    assert_eq!(other.status().negotiation, NegotiationState::Closed);
}
