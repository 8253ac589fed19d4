use async_trait::async_trait;
use teleop_core::IceCandidate;

/// The part of the signaling transport a session talks back through.
///
/// Delivery failures are the implementation's to log; a session never waits
/// on the relay to make progress.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send_offer(&self, sdp: String);

    async fn send_answer(&self, sdp: String);

    /// Sends a locally discovered candidate as soon as it is known.
    async fn send_ice(&self, candidate: IceCandidate);
}
