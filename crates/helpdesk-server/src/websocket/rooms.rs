//! Room Registry: live membership of each case's chat room and fan-out.
//!
//! Rooms live in a [`DashMap`], so membership changes and broadcasts lock
//! only the shard holding that case. A broadcast serializes the frame once
//! and enqueues it with `try_send` while holding the shard's read guard:
//! the member set it delivers to is a consistent snapshot, and a member
//! removed by a concurrent `leave` is never sent to afterwards. Nothing
//! here awaits, touches storage, or checks permissions.
//!
//! Each room also owns a sequencer: a per-case async mutex, separate from
//! the map's shard locks. Sessions hold it while persisting and
//! broadcasting a write, which makes persistence order and delivery order
//! the same for every member. It is the only lock held across store I/O,
//! and it only orders writes within its own case; shard locks are never
//! held across an `.await`, so joins, leaves and broadcasts elsewhere (and
//! in the same room) never wait on the store.
//!
//! A room outlives its last member while anyone still holds its sequencer.
//! A session waiting to join therefore always joins the room whose
//! sequencer it is waiting on.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use helpdesk_core::{CaseId, ConnectionId};
use metrics::counter;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::connection::ClientConnection;
use super::protocol::OutboundFrame;

/// Serializes writes within one room.
pub type Sequencer = Arc<Mutex<()>>;

#[derive(Default)]
struct Room {
    members: HashMap<ConnectionId, Arc<ClientConnection>>,
    sequencer: Sequencer,
}

/// Process-wide map of case ID → live connections.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<CaseId, Room>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The room's sequencer, creating the room if needed. The room stays
    /// in the map while the returned handle is alive; once it is dropped,
    /// an empty room is removed by the next [`leave`](Self::leave) for that
    /// case.
    pub fn sequencer(&self, case_id: CaseId) -> Sequencer {
        self.rooms.entry(case_id).or_default().sequencer.clone()
    }

    /// Add `connection` to the case's room.
    pub fn join(&self, case_id: CaseId, connection: Arc<ClientConnection>) {
        let mut room = self.rooms.entry(case_id).or_default();
        let members = {
            let _ = room.members.insert(connection.id.clone(), connection);
            room.members.len()
        };
        debug!(case_id, members, "joined room");
    }

    /// Remove a connection. The room disappears once it is empty and no
    /// one else holds its sequencer. Returns whether the connection was a
    /// member.
    pub fn leave(&self, case_id: CaseId, connection_id: &ConnectionId) -> bool {
        match self.rooms.entry(case_id) {
            Entry::Occupied(mut room) => {
                let removed = room.get_mut().members.remove(connection_id).is_some();
                // Handles are only cloned under this shard's lock, so the
                // count cannot grow while we hold the entry.
                let idle = Arc::strong_count(&room.get().sequencer) == 1;
                if room.get().members.is_empty() && idle {
                    let _ = room.remove();
                    debug!(case_id, "room closed");
                }
                removed
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Send `frame` to every writable member except `exclude`. Returns the
    /// number of members the frame was queued for.
    pub fn broadcast(
        &self,
        case_id: CaseId,
        frame: &OutboundFrame,
        exclude: Option<&ConnectionId>,
    ) -> usize {
        let encoded = match frame.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(case_id, error = %e, "failed to serialize frame");
                return 0;
            }
        };

        let Some(room) = self.rooms.get(&case_id) else {
            return 0;
        };
        let mut delivered = 0;
        for (id, member) in &room.members {
            if exclude == Some(id) || !member.is_writable() {
                continue;
            }
            if member.send(encoded.clone()) {
                delivered += 1;
            } else {
                counter!("ws_broadcast_drops_total").increment(1);
                warn!(case_id, connection_id = %id, "member queue full, frame dropped");
            }
        }
        delivered
    }

    /// Members of one room.
    pub fn member_count(&self, case_id: CaseId) -> usize {
        self.rooms.get(&case_id).map_or(0, |room| room.members.len())
    }

    /// Rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.rooms.iter().filter(|room| !room.members.is_empty()).count()
    }

    /// Members across all rooms.
    pub fn connection_count(&self) -> usize {
        self.rooms.iter().map(|room| room.members.len()).sum()
    }
}
