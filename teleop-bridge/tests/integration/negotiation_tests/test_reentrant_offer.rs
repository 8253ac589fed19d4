use teleop_bridge::{NegotiationState, SessionInput, TransportEvent};
use teleop_core::{IceCandidate, Role};

use crate::integration::{create_test_session, init_tracing};
use crate::utils::pump_events;

#[tokio::test]
async fn test_new_offer_replaces_peer_connection() {
    init_tracing();

    let (mut session, mut events, factory, signaling) = create_test_session(Role::Workstation);

    session
        .apply(SessionInput::RemoteOffer("offer-1".to_string()))
        .await
        .unwrap();
    let first = factory.latest().unwrap();
    first.connect().await;
    pump_events(&mut session, &mut events).await;
    assert_eq!(session.state(), NegotiationState::Connected);

    session
        .apply(SessionInput::RemoteOffer("offer-2".to_string()))
        .await
        .unwrap();
    let second = factory.latest().unwrap();

    assert_eq!(factory.created(), 2);
    assert!(first.is_closed());
    assert!(!second.is_closed());
    assert_eq!(session.state(), NegotiationState::Negotiating);
    assert_eq!(signaling.answers().await.len(), 2);

    // Events from the replaced connection no longer count.
    first.connect().await;
    first
        .emit(TransportEvent::CandidateGenerated(
            first.generation,
            IceCandidate::new("stale"),
        ))
        .await;
    pump_events(&mut session, &mut events).await;
    assert_eq!(session.state(), NegotiationState::Negotiating);
    assert!(signaling.candidates().await.is_empty());

    second.connect().await;
    pump_events(&mut session, &mut events).await;
    assert_eq!(session.state(), NegotiationState::Connected);
}
