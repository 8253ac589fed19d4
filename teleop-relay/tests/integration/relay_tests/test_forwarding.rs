use teleop_core::{ControlEnvelope, IceCandidate, Role, RoomId};

use crate::integration::{TestRelay, init_tracing};
use crate::utils::WsPeer;

#[tokio::test]
async fn test_offer_answer_and_candidates_are_forwarded() {
    init_tracing();
    let relay = TestRelay::start().await;

    let mut robot = WsPeer::join(&relay.url, "robot-3", Role::Robot).await;
    let mut operator = WsPeer::join(&relay.url, "robot-3", Role::Workstation).await;
    assert_eq!(
        robot.recv().await,
        ControlEnvelope::JoinRoom {
            room_id: RoomId::from("robot-3"),
            role: Role::Workstation,
        }
    );

    robot
        .send(&ControlEnvelope::Offer {
            sdp: "offer-sdp".into(),
        })
        .await;
    assert_eq!(
        operator.recv().await,
        ControlEnvelope::Offer {
            sdp: "offer-sdp".into()
        }
    );

    operator
        .send(&ControlEnvelope::Answer {
            sdp: "answer-sdp".into(),
        })
        .await;
    operator
        .send(&ControlEnvelope::IceCandidate {
            candidate: IceCandidate::new("candidate:op"),
        })
        .await;

    assert_eq!(
        robot.recv().await,
        ControlEnvelope::Answer {
            sdp: "answer-sdp".into()
        }
    );
    assert_eq!(
        robot.recv().await,
        ControlEnvelope::IceCandidate {
            candidate: IceCandidate::new("candidate:op")
        }
    );

    // Nothing echoes back to the sender.
    assert_eq!(operator.try_recv(100).await, None);
}

#[tokio::test]
async fn test_late_joiner_receives_pending_offer() {
    init_tracing();
    let relay = TestRelay::start().await;

    let mut robot = WsPeer::join(&relay.url, "robot-4", Role::Robot).await;
    robot
        .send(&ControlEnvelope::Offer {
            sdp: "early-offer".into(),
        })
        .await;
    robot
        .send(&ControlEnvelope::IceCandidate {
            candidate: IceCandidate::new("candidate:robot"),
        })
        .await;
    // Let the relay record both before anyone else joins.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let mut operator = WsPeer::join(&relay.url, "robot-4", Role::Browser).await;
    assert_eq!(
        operator.recv().await,
        ControlEnvelope::Offer {
            sdp: "early-offer".into()
        }
    );
    assert_eq!(
        operator.recv().await,
        ControlEnvelope::IceCandidate {
            candidate: IceCandidate::new("candidate:robot")
        }
    );
}

#[tokio::test]
async fn test_session_ok_alias_is_not_forwarded() {
    init_tracing();
    let relay = TestRelay::start().await;

    let mut robot = WsPeer::join(&relay.url, "robot-5", Role::Robot).await;
    let mut operator = WsPeer::join(&relay.url, "robot-5", Role::Workstation).await;

    robot.send_raw(r#"{"type":"SESSION_OK"}"#).await;
    robot.send_raw(r#"{"type":"teleport","to":"mars"}"#).await;
    robot
        .send(&ControlEnvelope::Offer {
            sdp: "after-noise".into(),
        })
        .await;

    assert_eq!(
        operator.recv().await,
        ControlEnvelope::Offer {
            sdp: "after-noise".into()
        }
    );
}
