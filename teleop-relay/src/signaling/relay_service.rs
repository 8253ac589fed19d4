use axum::extract::ws::Message;
use dashmap::DashMap;
use std::sync::Arc;
use teleop_core::{ControlEnvelope, IceCandidate, Role, RoomId};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// One websocket connection, identified for the lifetime of the socket.
pub type ConnectionId = Uuid;

struct Member {
    id: ConnectionId,
    role: Role,
    tx: mpsc::UnboundedSender<Message>,
}

/// The latest offer made in a room and the candidates its author sent
/// after it. Replayed to members that join later.
struct PendingOffer {
    author: ConnectionId,
    sdp: String,
    candidates: Vec<IceCandidate>,
}

#[derive(Default)]
struct RoomState {
    members: Vec<Member>,
    offer: Option<PendingOffer>,
}

impl RoomState {
    fn send_to_others(&self, from: ConnectionId, envelope: &ControlEnvelope) {
        for member in self.members.iter().filter(|m| m.id != from) {
            send_envelope(&member.tx, envelope);
        }
    }
}

struct RelayInner {
    rooms: DashMap<RoomId, RoomState>,
    connections: DashMap<ConnectionId, RoomId>,
}

/// Room bookkeeping shared by every websocket handler.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl Default for RelayService {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RelayInner {
                rooms: DashMap::new(),
                connections: DashMap::new(),
            }),
        }
    }

    /// Number of connections currently joined to `room_id`.
    pub fn room_size(&self, room_id: &RoomId) -> usize {
        self.inner
            .rooms
            .get(room_id)
            .map(|room| room.members.len())
            .unwrap_or(0)
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }

    /// Adds `id` to `room_id`, acknowledges the join and replays a pending
    /// offer from another member. Members already in the room receive the
    /// joiner's `join-room`, so an initiator whose session ended can offer
    /// again. A connection joining a second room leaves the first.
    pub fn join(
        &self,
        id: ConnectionId,
        room_id: RoomId,
        role: Role,
        tx: mpsc::UnboundedSender<Message>,
    ) {
        if let Some(previous) = self.inner.connections.get(&id).map(|r| r.clone()) {
            if previous == room_id {
                debug!("Connection {} re-joined room {}", id, room_id);
                send_envelope(&tx, &ControlEnvelope::SessionAck);
                return;
            }
            self.leave(id);
        }

        let mut room = self.inner.rooms.entry(room_id.clone()).or_default();

        send_envelope(&tx, &ControlEnvelope::SessionAck);
        if let Some(offer) = room.offer.as_ref().filter(|offer| offer.author != id) {
            debug!(
                "Replaying offer and {} candidates in room {} to {}",
                offer.candidates.len(),
                room_id,
                id
            );
            send_envelope(
                &tx,
                &ControlEnvelope::Offer {
                    sdp: offer.sdp.clone(),
                },
            );
            for candidate in &offer.candidates {
                send_envelope(
                    &tx,
                    &ControlEnvelope::IceCandidate {
                        candidate: candidate.clone(),
                    },
                );
            }
        }

        room.send_to_others(
            id,
            &ControlEnvelope::JoinRoom {
                room_id: room_id.clone(),
                role,
            },
        );
        room.members.push(Member { id, role, tx });
        info!(
            "{} {} joined room {} ({} members)",
            role,
            id,
            room_id,
            room.members.len()
        );
        drop(room);

        self.inner.connections.insert(id, room_id);
    }

    /// Forwards a negotiation envelope from `from` to the other members of
    /// its room.
    pub fn forward(&self, from: ConnectionId, envelope: ControlEnvelope) {
        let Some(room_id) = self.inner.connections.get(&from).map(|r| r.clone()) else {
            warn!(
                "Dropping '{}' from {}: connection has not joined a room",
                envelope.kind(),
                from
            );
            return;
        };
        let Some(mut room) = self.inner.rooms.get_mut(&room_id) else {
            return;
        };

        match &envelope {
            ControlEnvelope::Offer { sdp } => {
                room.offer = Some(PendingOffer {
                    author: from,
                    sdp: sdp.clone(),
                    candidates: Vec::new(),
                });
            }
            ControlEnvelope::IceCandidate { candidate } => {
                if let Some(offer) = room.offer.as_mut().filter(|offer| offer.author == from) {
                    offer.candidates.push(candidate.clone());
                }
            }
            ControlEnvelope::Answer { .. } => {
                // Answered offers are not replayed.
                room.offer = None;
            }
            ControlEnvelope::JoinRoom { .. } | ControlEnvelope::SessionAck => {
                warn!("'{}' from {} is not forwarded", envelope.kind(), from);
                return;
            }
        }

        debug!(
            "Forwarding '{}' from {} in room {}",
            envelope.kind(),
            from,
            room_id
        );
        room.send_to_others(from, &envelope);
    }

    /// Removes `id` from its room. Empty rooms are dropped.
    pub fn leave(&self, id: ConnectionId) {
        let Some((_, room_id)) = self.inner.connections.remove(&id) else {
            return;
        };

        let empty = match self.inner.rooms.get_mut(&room_id) {
            Some(mut room) => {
                room.members.retain(|m| m.id != id);
                if room.offer.as_ref().is_some_and(|offer| offer.author == id) {
                    room.offer = None;
                }
                if let Some(member) = room.members.first() {
                    debug!("Room {} still has {} ({})", room_id, member.id, member.role);
                }
                room.members.is_empty()
            }
            None => false,
        };

        if empty {
            self.inner
                .rooms
                .remove_if(&room_id, |_, room| room.members.is_empty());
        }
        info!("Connection {} left room {}", id, room_id);
    }
}

fn send_envelope(tx: &mpsc::UnboundedSender<Message>, envelope: &ControlEnvelope) {
    match serde_json::to_string(envelope) {
        Ok(json) => {
            if tx.send(Message::Text(json.into())).is_err() {
                debug!("Dropping '{}' for a closed connection", envelope.kind());
            }
        }
        Err(e) => error!("Failed to serialize '{}': {}", envelope.kind(), e),
    }
}
