use std::sync::Arc;
use std::time::Duration;

use teleop_bridge::{
    NegotiationState, PeerState, RetryPolicy, SessionConfig, SessionHandle, SessionRegistry,
    SignalingClient, SignalingEvent, SignalingOutput, forward_to_session, serve_room,
};
use teleop_core::{ControlEnvelope, Role, RoomId, SdpKind};
use teleop_relay::{RelayServer, RelayService};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::integration::{ROBOT_ID, init_tracing};
use crate::utils::{
    EVENT_TIMEOUT_MS, MockTransportFactory, TRANSPORT_TIMEOUT_MS, TestChannelHandler,
    TransportCall, within, wait_for_state,
};

async fn start_relay() -> (String, RelayService, CancellationToken) {
    let server = RelayServer::bind("127.0.0.1:0").await.unwrap();
    let url = server.url().unwrap();
    let service = server.service();
    let shutdown = CancellationToken::new();
    tokio::spawn(server.run_until(shutdown.clone()));
    (url, service, shutdown)
}

async fn wait_for_room_size(service: &RelayService, size: usize) {
    within(EVENT_TIMEOUT_MS, async {
        while service.room_size(&RoomId::from(ROBOT_ID)) != size {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
}

async fn next_envelope(events: &mut mpsc::UnboundedReceiver<SignalingEvent>) -> ControlEnvelope {
    match within(EVENT_TIMEOUT_MS, events.recv()).await {
        Some(SignalingEvent::Envelope(envelope)) => envelope,
        other => panic!("Expected an envelope, got {:?}", other),
    }
}

/// Joins the relay as `role` and runs a session over that connection.
async fn start_peer(
    url: &str,
    role: Role,
    factory: &MockTransportFactory,
) -> (SessionHandle, SignalingClient) {
    let (client, mut events) = SignalingClient::connect(url, RoomId::from(ROBOT_ID), role)
        .await
        .unwrap();

    let registry = SessionRegistry::new(Arc::new(factory.clone()));
    let handle = registry
        .start_session(
            SessionConfig::new(RoomId::from(ROBOT_ID), role),
            Arc::new(client.clone()),
            Arc::new(TestChannelHandler::new()),
        )
        .await;
    tokio::spawn({
        let handle = handle.clone();
        async move { forward_to_session(&mut events, &handle).await }
    });

    (handle, client)
}

/// Joins the relay as the robot and keeps a session alive on that
/// connection the way the robot process does.
async fn start_robot(
    url: &str,
    factory: &MockTransportFactory,
) -> (SessionRegistry, SignalingClient) {
    let (client, events) = SignalingClient::connect(url, RoomId::from(ROBOT_ID), Role::Robot)
        .await
        .unwrap();

    let registry = SessionRegistry::new(Arc::new(factory.clone()));
    tokio::spawn(serve_room(
        registry.clone(),
        SessionConfig::new(RoomId::from(ROBOT_ID), Role::Robot),
        Arc::new(client.clone()),
        events,
        Arc::new(TestChannelHandler::new()),
        RetryPolicy::Immediate,
    ));

    (registry, client)
}

#[tokio::test]
async fn test_clients_exchange_envelopes_through_relay() {
    init_tracing();
    let (url, _service, shutdown) = start_relay().await;

    let (robot, mut robot_events) =
        SignalingClient::connect(&url, RoomId::from(ROBOT_ID), Role::Robot)
            .await
            .unwrap();
    assert_eq!(next_envelope(&mut robot_events).await, ControlEnvelope::SessionAck);

    let (workstation, mut workstation_events) =
        SignalingClient::connect(&url, RoomId::from(ROBOT_ID), Role::Workstation)
            .await
            .unwrap();
    assert_eq!(
        next_envelope(&mut workstation_events).await,
        ControlEnvelope::SessionAck
    );
    assert_eq!(
        next_envelope(&mut robot_events).await,
        ControlEnvelope::JoinRoom {
            room_id: RoomId::from(ROBOT_ID),
            role: Role::Workstation,
        }
    );

    robot.send_offer("robot-offer".to_string()).await;
    assert_eq!(
        next_envelope(&mut workstation_events).await,
        ControlEnvelope::Offer {
            sdp: "robot-offer".to_string()
        }
    );

    workstation.send_answer("ws-answer".to_string()).await;
    assert_eq!(
        next_envelope(&mut robot_events).await,
        ControlEnvelope::Answer {
            sdp: "ws-answer".to_string()
        }
    );

    robot.close();
    assert_eq!(
        within(EVENT_TIMEOUT_MS, robot_events.recv()).await,
        Some(SignalingEvent::Closed)
    );
    assert!(robot.is_closed());
    assert!(robot.send(&ControlEnvelope::SessionAck).is_err());

    shutdown.cancel();
}

#[tokio::test]
async fn test_sessions_negotiate_over_relay() {
    init_tracing();
    let (url, _service, shutdown) = start_relay().await;

    let robot_factory = MockTransportFactory::new();
    let (robot, _robot_client) = start_peer(&url, Role::Robot, &robot_factory).await;
    wait_for_state(&robot, NegotiationState::AwaitingRemote).await;

    let workstation_factory = MockTransportFactory::new();
    let (workstation, _workstation_client) =
        start_peer(&url, Role::Workstation, &workstation_factory).await;

    wait_for_state(&workstation, NegotiationState::Negotiating).await;
    wait_for_state(&robot, NegotiationState::Negotiating).await;

    let robot_probe = robot_factory
        .wait_for_transport(1, TRANSPORT_TIMEOUT_MS)
        .await;
    let workstation_probe = workstation_factory
        .wait_for_transport(1, TRANSPORT_TIMEOUT_MS)
        .await;
    assert!(
        workstation_probe
            .calls()
            .contains(&TransportCall::SetRemote(SdpKind::Offer, "mock-offer".to_string()))
    );
    assert!(
        robot_probe
            .calls()
            .contains(&TransportCall::SetRemote(SdpKind::Answer, "mock-answer".to_string()))
    );

    robot_probe.local_candidate("candidate:robot-host").await;
    let start = std::time::Instant::now();
    while workstation_probe.applied_candidates().is_empty() {
        assert!(
            start.elapsed() < Duration::from_millis(EVENT_TIMEOUT_MS),
            "candidate never crossed the relay"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        workstation_probe.applied_candidates(),
        vec!["candidate:robot-host".to_string()]
    );

    shutdown.cancel();
}

#[tokio::test]
async fn test_lost_relay_closes_negotiating_session() {
    init_tracing();
    let (url, _service, shutdown) = start_relay().await;

    let factory = MockTransportFactory::new();
    let (robot, client) = start_peer(&url, Role::Robot, &factory).await;
    wait_for_state(&robot, NegotiationState::AwaitingRemote).await;

    client.close();
    wait_for_state(&robot, NegotiationState::Closed).await;
    assert!(factory.latest().unwrap().is_closed());

    shutdown.cancel();
}

#[tokio::test]
async fn test_second_operator_connects_after_first_session_closed() {
    init_tracing();
    let (url, service, shutdown) = start_relay().await;

    let robot_factory = MockTransportFactory::new();
    let (robot_registry, _robot_client) = start_robot(&url, &robot_factory).await;
    let first_probe = robot_factory
        .wait_for_transport(1, TRANSPORT_TIMEOUT_MS)
        .await;
    let first = robot_registry.get(&RoomId::from(ROBOT_ID)).unwrap();
    wait_for_state(&first, NegotiationState::AwaitingRemote).await;

    let first_operator_factory = MockTransportFactory::new();
    let (first_operator, first_operator_client) =
        start_peer(&url, Role::Workstation, &first_operator_factory).await;
    wait_for_state(&first_operator, NegotiationState::Negotiating).await;
    wait_for_state(&first, NegotiationState::Negotiating).await;
    first_probe.connect().await;
    wait_for_state(&first, NegotiationState::Connected).await;

    first_operator_client.close();
    wait_for_room_size(&service, 1).await;
    first_probe.set_state(PeerState::Failed).await;
    wait_for_state(&first, NegotiationState::Closed).await;

    // The robot offers again on its existing relay connection.
    robot_factory
        .wait_for_transport(2, TRANSPORT_TIMEOUT_MS)
        .await;
    let second = robot_registry.get(&RoomId::from(ROBOT_ID)).unwrap();
    wait_for_state(&second, NegotiationState::AwaitingRemote).await;

    let second_operator_factory = MockTransportFactory::new();
    let (second_operator, _second_operator_client) =
        start_peer(&url, Role::Browser, &second_operator_factory).await;
    wait_for_state(&second_operator, NegotiationState::Negotiating).await;
    wait_for_state(&second, NegotiationState::Negotiating).await;

    let second_operator_probe = second_operator_factory
        .wait_for_transport(1, TRANSPORT_TIMEOUT_MS)
        .await;
    assert!(
        second_operator_probe
            .calls()
            .contains(&TransportCall::SetRemote(SdpKind::Offer, "mock-offer".to_string()))
    );
    assert_eq!(service.room_size(&RoomId::from(ROBOT_ID)), 2);

    shutdown.cancel();
}
