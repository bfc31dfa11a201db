//! One participant's live chat connection, as seen by the room registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use helpdesk_core::{CaseId, ConnectionId, Identity};
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// A connected client. The socket writer task owns the receiving end of
/// `tx`; everything else talks to the client through [`send`](Self::send).
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Authenticated participant.
    pub identity: Identity,
    /// The case this connection is scoped to.
    pub case_id: CaseId,
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    is_alive: AtomicBool,
    last_pong: Mutex<Instant>,
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a connection that writes into `tx`.
    pub fn new(identity: Identity, case_id: CaseId, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id: ConnectionId::new(),
            identity,
            case_id,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Queue a serialized frame.
    ///
    /// Returns `false` if the queue is full or the writer is gone; a full
    /// queue also bumps the drop counter.
    pub fn send(&self, frame: Arc<String>) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the writer side still exists.
    pub fn is_writable(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Frames dropped because the queue was full.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Record client activity (pong or any frame).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Time since the last recorded activity.
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Read and reset the alive flag. `true` if the client was heard from
    /// since the previous check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use helpdesk_core::Role;

    pub(crate) fn connection(
        user_id: i64,
        role: Role,
        buffer: usize,
    ) -> (Arc<ClientConnection>, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Arc::new(ClientConnection::new(Identity::new(user_id, role), 1, tx)), rx)
    }

    #[tokio::test]
    async fn send_queues_frames_in_order() {
        let (conn, mut rx) = connection(1, Role::User, 8);
        for i in 0..3 {
            assert!(conn.send(Arc::new(format!("frame_{i}"))));
        }
        for i in 0..3 {
            assert_eq!(*rx.recv().await.unwrap(), format!("frame_{i}"));
        }
    }

    #[test]
    fn full_queue_counts_a_drop() {
        let (conn, _rx) = connection(1, Role::User, 1);
        assert!(conn.send(Arc::new("a".into())));
        assert!(!conn.send(Arc::new("b".into())));
        assert_eq!(conn.drop_count(), 1);
        assert!(conn.is_writable());
    }

    #[test]
    fn closed_writer_is_not_writable() {
        let (conn, rx) = connection(1, Role::User, 4);
        drop(rx);
        assert!(!conn.is_writable());
        assert!(!conn.send(Arc::new("a".into())));
        assert_eq!(conn.drop_count(), 0);
    }

    #[test]
    fn alive_flag_resets_on_check() {
        let (conn, _rx) = connection(1, Role::User, 4);
        assert!(conn.check_alive());
        assert!(!conn.check_alive());
        conn.mark_alive();
        assert!(conn.check_alive());
        assert!(conn.last_pong_elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn ids_are_unique() {
        let (a, _ra) = connection(1, Role::User, 1);
        let (b, _rb) = connection(1, Role::User, 1);
        assert_ne!(a.id, b.id);
    }
}
