use std::mem;
use teleop_core::IceCandidate;

/// Remote candidates that arrived before the remote description was applied,
/// kept in arrival order.
#[derive(Debug, Default)]
pub struct CandidateQueue {
    pending: Vec<IceCandidate>,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: IceCandidate) {
        self.pending.push(candidate);
    }

    /// Takes every queued candidate, oldest first. The queue is empty
    /// afterwards, so each candidate is handed out once.
    pub fn drain(&mut self) -> Vec<IceCandidate> {
        mem::take(&mut self.pending)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
