//! Connection Session: the authorization gate and protocol handler for one
//! participant's connection to one case.
//!
//! ```text
//! Connecting ──authorize──▶ Authorized ──activate──▶ Active ──close──▶ Closed
//!      └──────────────(rejected)─────────────────────────────────────▶ Closed
//! ```
//!
//! The session knows nothing about sockets. It reads the store, updates the
//! [`RoomRegistry`], and queues frames on its [`ClientConnection`]; the
//! socket driver in [`handler`](super::handler) moves bytes. `close` runs at
//! most once whichever path gets there first, and `Drop` calls it, so room
//! membership is released on every exit path.
//!
//! Writes (persisting or deleting a message) and the join-plus-history step
//! run under the room's sequencer. The case status is checked again by the
//! store inside the insert itself, so a resolution that lands while a
//! sender waits on the sequencer turns the send into a conflict.

use std::sync::Arc;

use helpdesk_core::{Case, CaseError, CaseId, Identity, MessageId};
use helpdesk_store::{CaseStore, NewMessage};
use metrics::counter;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::protocol::{InboundFrame, OutboundFrame};
use super::rooms::{RoomRegistry, Sequencer};

/// Where a session is in its lifecycle.
#[derive(Debug)]
pub enum SessionState {
    /// Identity known, case access not yet checked.
    Connecting,
    /// Access granted; not yet in the room.
    Authorized {
        /// The case as it was when access was checked.
        case: Case,
    },
    /// In the room and processing frames.
    Active {
        /// The room's write sequencer.
        sequencer: Sequencer,
    },
    /// Terminal.
    Closed,
}

impl SessionState {
    fn name(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Authorized { .. } => "authorized",
            Self::Active { .. } => "active",
            Self::Closed => "closed",
        }
    }
}

/// One participant in one case room.
pub struct ChatSession {
    state: SessionState,
    connection: Arc<ClientConnection>,
    rooms: Arc<RoomRegistry>,
    store: Arc<dyn CaseStore>,
    max_message_chars: usize,
}

impl ChatSession {
    /// A session in `Connecting` for `connection`.
    pub fn new(
        connection: Arc<ClientConnection>,
        rooms: Arc<RoomRegistry>,
        store: Arc<dyn CaseStore>,
        max_message_chars: usize,
    ) -> Self {
        Self {
            state: SessionState::Connecting,
            connection,
            rooms,
            store,
            max_message_chars,
        }
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The connection this session drives.
    pub fn connection(&self) -> &Arc<ClientConnection> {
        &self.connection
    }

    fn case_id(&self) -> CaseId {
        self.connection.case_id
    }

    fn identity(&self) -> Identity {
        self.connection.identity
    }

    fn illegal(&self, operation: &str) -> CaseError {
        CaseError::Internal(format!(
            "cannot {operation} a session that is {}",
            self.state.name()
        ))
    }

    /// `Connecting → Authorized`. The case must exist, be unresolved, and
    /// admit the caller (owner, assigned agent, or any lead agent). On
    /// failure the session goes straight to `Closed` without touching the
    /// room.
    #[instrument(skip_all, fields(case_id = self.case_id(), user_id = self.identity().user_id))]
    pub async fn authorize(&mut self) -> Result<(), CaseError> {
        if !matches!(self.state, SessionState::Connecting) {
            return Err(self.illegal("authorize"));
        }
        match self.check_access().await {
            Ok(case) => {
                self.state = SessionState::Authorized { case };
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, "connection rejected");
                self.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    async fn check_access(&self) -> Result<Case, CaseError> {
        let case_id = self.case_id();
        let who = self.identity();
        let case = self
            .store
            .get_case(case_id)
            .await?
            .ok_or_else(|| CaseError::case_not_found(case_id))?;
        if case.is_resolved() {
            return Err(CaseError::Conflict(format!("case {case_id} is already resolved")));
        }
        if !case.grants_room_access(&who) {
            return Err(CaseError::Forbidden(format!(
                "no access to case {case_id}"
            )));
        }
        Ok(case)
    }

    /// `Authorized → Active`: join the room, send the transcript to this
    /// participant only, then announce the arrival to everyone else.
    ///
    /// Joining and reading the transcript happen under the room sequencer,
    /// so every message is either in the history or arrives as a broadcast,
    /// never both and never neither.
    #[instrument(skip_all, fields(case_id = self.case_id(), user_id = self.identity().user_id))]
    pub async fn activate(&mut self) -> Result<(), CaseError> {
        if !matches!(self.state, SessionState::Authorized { .. }) {
            return Err(self.illegal("activate"));
        }
        let case_id = self.case_id();
        let who = self.identity();

        let sequencer = self.rooms.sequencer(case_id);
        let loaded = {
            let _order = sequencer.lock().await;
            self.rooms.join(case_id, self.connection.clone());
            self.store
                .list_messages(case_id)
                .await
                .map(|messages| self.reply(&OutboundFrame::History { messages }))
        };
        if let Err(e) = loaded {
            drop(sequencer);
            let _ = self.rooms.leave(case_id, &self.connection.id);
            self.state = SessionState::Closed;
            return Err(e.into());
        }
        self.state = SessionState::Active { sequencer };

        let _ = self.rooms.broadcast(
            case_id,
            &OutboundFrame::UserJoined {
                user_id: who.user_id,
                role: who.role,
            },
            Some(&self.connection.id),
        );
        info!(connection_id = %self.connection.id, "joined case room");
        Ok(())
    }

    /// Handle one inbound text frame. Any rejection is also sent to this
    /// participant as an `error` frame; nothing is broadcast for it.
    pub async fn handle_text(&mut self, text: &str) -> Result<(), CaseError> {
        let SessionState::Active { sequencer } = &self.state else {
            return Err(self.illegal("process frames for"));
        };
        let sequencer = sequencer.clone();
        self.connection.mark_alive();

        let result = match InboundFrame::parse(text) {
            Ok(frame) => self.handle_frame(frame, &sequencer).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            if e.is_expected() {
                debug!(case_id = self.case_id(), error = %e, "frame rejected");
            } else {
                warn!(case_id = self.case_id(), error = %e, "frame failed");
            }
            self.reply(&OutboundFrame::error(e));
        }
        result
    }

    async fn handle_frame(&self, frame: InboundFrame, sequencer: &Sequencer) -> Result<(), CaseError> {
        match frame {
            InboundFrame::Message { content } => self.send_message(content, sequencer).await,
            InboundFrame::DeleteMessage { message_id } => {
                self.delete_message(message_id, sequencer).await
            }
            InboundFrame::Typing => {
                self.typing(true);
                Ok(())
            }
            InboundFrame::StopTyping => {
                self.typing(false);
                Ok(())
            }
        }
    }

    async fn send_message(&self, content: String, sequencer: &Sequencer) -> Result<(), CaseError> {
        if content.trim().is_empty() {
            return Err(CaseError::Validation("message content cannot be empty".into()));
        }
        let chars = content.chars().count();
        if chars > self.max_message_chars {
            return Err(CaseError::Validation(format!(
                "message is {chars} characters, the limit is {}",
                self.max_message_chars
            )));
        }

        let case_id = self.case_id();
        let who = self.identity();
        let case = self
            .store
            .get_case(case_id)
            .await?
            .ok_or_else(|| CaseError::case_not_found(case_id))?;
        if case.is_resolved() {
            return Err(CaseError::Conflict(format!("case {case_id} is already resolved")));
        }
        if !case.grants_write_access(&who) {
            return Err(CaseError::Forbidden(format!(
                "only the owner or the assigned agent can write in case {case_id}"
            )));
        }

        let _order = sequencer.lock().await;
        let message = self
            .store
            .create_message(NewMessage {
                case_id,
                sender_id: who.user_id,
                sender_role: who.role.sender_role(),
                content,
            })
            .await?;
        counter!("chat_messages_total").increment(1);
        debug!(case_id, message_id = message.id, "message persisted");
        let _ = self
            .rooms
            .broadcast(case_id, &OutboundFrame::Message { message }, None);
        Ok(())
    }

    async fn delete_message(&self, message_id: MessageId, sequencer: &Sequencer) -> Result<(), CaseError> {
        let case_id = self.case_id();
        let message = self
            .store
            .get_message(message_id)
            .await?
            .filter(|m| m.case_id == case_id)
            .ok_or_else(|| {
                CaseError::NotFound(format!("message {message_id} not found in case {case_id}"))
            })?;
        if message.sender_id != self.identity().user_id {
            return Err(CaseError::Forbidden(format!(
                "message {message_id} was written by someone else"
            )));
        }

        let _order = sequencer.lock().await;
        self.store.delete_message(message_id).await?;
        debug!(case_id, message_id, "message deleted");
        let _ = self
            .rooms
            .broadcast(case_id, &OutboundFrame::MessageDeleted { message_id }, None);
        Ok(())
    }

    fn typing(&self, is_typing: bool) {
        let who = self.identity();
        let _ = self.rooms.broadcast(
            self.case_id(),
            &OutboundFrame::Typing {
                user_id: who.user_id,
                role: who.role,
                is_typing,
            },
            Some(&self.connection.id),
        );
    }

    /// Send an `error` frame for a failure that happened outside frame
    /// handling, such as an undecodable binary frame.
    pub fn report_error(&self, err: &CaseError) {
        self.reply(&OutboundFrame::error(err));
    }

    fn reply(&self, frame: &OutboundFrame) {
        match frame.encode() {
            Ok(encoded) => {
                if !self.connection.send(encoded) {
                    debug!(connection_id = %self.connection.id, "reply not queued");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize reply"),
        }
    }

    /// Move to `Closed`, leaving the room and announcing the departure if
    /// the session was active. Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        let case_id = self.case_id();
        match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Active { sequencer } => {
                // Our handle would keep an empty room alive.
                drop(sequencer);
                let _ = self.rooms.leave(case_id, &self.connection.id);
                let who = self.identity();
                let _ = self.rooms.broadcast(
                    case_id,
                    &OutboundFrame::UserLeft {
                        user_id: who.user_id,
                        role: who.role,
                    },
                    None,
                );
                info!(case_id, connection_id = %self.connection.id, "left case room");
                true
            }
            // A cancelled activation may have joined already.
            SessionState::Authorized { .. } => {
                let _ = self.rooms.leave(case_id, &self.connection.id);
                true
            }
            SessionState::Connecting => true,
            SessionState::Closed => false,
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use helpdesk_core::{CaseStatus, Category, ResolutionAnalysis, ResolvedBy, Role, Sentiment};
    use helpdesk_store::{CaseTransition, SqliteCaseStore};
    use serde_json::Value;
    use tokio::sync::mpsc;

    const OWNER: i64 = 10;
    const AGENT: i64 = 20;
    const LEAD: i64 = 30;
    const LIMIT: usize = 50;

    struct Harness {
        store: Arc<SqliteCaseStore>,
        rooms: Arc<RoomRegistry>,
    }

    struct Participant {
        session: ChatSession,
        rx: mpsc::Receiver<Arc<String>>,
    }

    impl Participant {
        fn frames(&mut self) -> Vec<Value> {
            let mut out = Vec::new();
            while let Ok(frame) = self.rx.try_recv() {
                out.push(serde_json::from_str(&frame).unwrap());
            }
            out
        }

        async fn send(&mut self, frame: Value) -> Result<(), CaseError> {
            self.session.handle_text(&frame.to_string()).await
        }
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: Arc::new(SqliteCaseStore::in_memory().unwrap()),
                rooms: Arc::new(RoomRegistry::new()),
            }
        }

        async fn open_case(&self) -> Case {
            self.store.create_case(OWNER, Category::Bug, 3).await.unwrap()
        }

        async fn assign(&self, case: &Case, agent: i64) {
            self.store
                .update_case_status(case.id, CaseTransition::Assign { agent_id: agent })
                .await
                .unwrap();
        }

        fn participant(&self, case_id: CaseId, user_id: i64, role: Role) -> Participant {
            let (tx, rx) = mpsc::channel(64);
            let connection = Arc::new(ClientConnection::new(Identity::new(user_id, role), case_id, tx));
            let session = ChatSession::new(connection, self.rooms.clone(), self.store.clone(), LIMIT);
            Participant { session, rx }
        }

        async fn join(&self, case_id: CaseId, user_id: i64, role: Role) -> Participant {
            let mut p = self.participant(case_id, user_id, role);
            p.session.authorize().await.unwrap();
            p.session.activate().await.unwrap();
            p
        }
    }

    fn types(frames: &[Value]) -> Vec<&str> {
        frames.iter().map(|f| f["type"].as_str().unwrap()).collect()
    }

    #[tokio::test]
    async fn join_delivers_history_then_announces() {
        let h = Harness::new();
        let case = h.open_case().await;
        h.assign(&case, AGENT).await;

        let mut owner = h.join(case.id, OWNER, Role::User).await;
        owner
            .send(serde_json::json!({"type": "message", "content": "it still doesn't work"}))
            .await
            .unwrap();
        let frames = owner.frames();
        assert_eq!(types(&frames), ["history", "message"]);
        assert_eq!(frames[0]["messages"].as_array().unwrap().len(), 0);

        let mut agent = h.join(case.id, AGENT, Role::Agent).await;
        let agent_frames = agent.frames();
        assert_eq!(types(&agent_frames), ["history"]);
        assert_eq!(agent_frames[0]["messages"][0]["content"], "it still doesn't work");

        let owner_frames = owner.frames();
        assert_eq!(types(&owner_frames), ["userJoined"]);
        assert_eq!(owner_frames[0]["userId"], AGENT);
        assert_eq!(owner_frames[0]["role"], "AGENT");
        assert_eq!(h.rooms.member_count(case.id), 2);
    }

    #[tokio::test]
    async fn rejections_close_without_joining() {
        let h = Harness::new();
        let case = h.open_case().await;

        let mut missing = h.participant(999, OWNER, Role::User);
        assert_matches!(missing.session.authorize().await, Err(CaseError::NotFound(_)));
        assert_matches!(missing.session.state(), SessionState::Closed);

        let mut stranger = h.participant(case.id, 11, Role::User);
        assert_matches!(stranger.session.authorize().await, Err(CaseError::Forbidden(_)));

        let mut unassigned = h.participant(case.id, AGENT, Role::Agent);
        assert_matches!(unassigned.session.authorize().await, Err(CaseError::Forbidden(_)));

        // A user whose id matches the assignee is still not the agent.
        h.assign(&case, AGENT).await;
        let mut impostor = h.participant(case.id, AGENT, Role::User);
        assert_matches!(impostor.session.authorize().await, Err(CaseError::Forbidden(_)));

        h.store
            .create_analysis_result(
                case.id,
                ResolutionAnalysis {
                    classification: "c".into(),
                    summary: "s".into(),
                    sentiment: Sentiment::Neutral,
                },
            )
            .await
            .unwrap();
        h.store
            .update_case_status(case.id, CaseTransition::Resolve { by: ResolvedBy::User })
            .await
            .unwrap();
        let mut late = h.participant(case.id, OWNER, Role::User);
        assert_matches!(late.session.authorize().await, Err(CaseError::Conflict(_)));

        assert_eq!(h.rooms.connection_count(), 0);
        assert!(missing.frames().is_empty());
    }

    #[tokio::test]
    async fn transitions_out_of_order_are_rejected() {
        let h = Harness::new();
        let case = h.open_case().await;
        let mut p = h.participant(case.id, OWNER, Role::User);

        assert_matches!(p.session.activate().await, Err(CaseError::Internal(_)));
        assert_matches!(
            p.session.handle_text(r#"{"type":"typing"}"#).await,
            Err(CaseError::Internal(_))
        );
        p.session.authorize().await.unwrap();
        assert_matches!(p.session.authorize().await, Err(CaseError::Internal(_)));
        p.session.activate().await.unwrap();
        assert_matches!(p.session.state(), SessionState::Active { .. });
    }

    #[tokio::test]
    async fn message_reaches_whole_room_including_sender() {
        let h = Harness::new();
        let case = h.open_case().await;
        h.assign(&case, AGENT).await;
        let mut owner = h.join(case.id, OWNER, Role::User).await;
        let mut agent = h.join(case.id, AGENT, Role::Agent).await;
        owner.frames();
        agent.frames();

        agent
            .send(serde_json::json!({"type": "message", "content": "on it"}))
            .await
            .unwrap();
        for frames in [owner.frames(), agent.frames()] {
            assert_eq!(types(&frames), ["message"]);
            assert_eq!(frames[0]["message"]["senderRole"], "AGENT");
            assert_eq!(frames[0]["message"]["senderId"], AGENT);
        }
        assert_eq!(h.store.list_messages(case.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_content_is_reported_to_sender_only() {
        let h = Harness::new();
        let case = h.open_case().await;
        let mut owner = h.join(case.id, OWNER, Role::User).await;
        let mut lead = h.join(case.id, LEAD, Role::LeadAgent).await;
        owner.frames();
        lead.frames();

        let too_long = "x".repeat(LIMIT + 1);
        for content in ["", "   \n\t", too_long.as_str()] {
            let sent = owner
                .send(serde_json::json!({"type": "message", "content": content}))
                .await;
            assert_matches!(sent, Err(CaseError::Validation(_)));
        }
        let frames = owner.frames();
        assert_eq!(types(&frames), ["error", "error", "error"]);
        assert!(frames.iter().all(|f| f["code"] == "VALIDATION_ERROR"));
        assert!(lead.frames().is_empty());

        // Exactly at the limit, counted in characters not bytes.
        owner
            .send(serde_json::json!({"type": "message", "content": "é".repeat(LIMIT)}))
            .await
            .unwrap();
        assert_eq!(h.store.list_messages(case.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_frame_keeps_session_open() {
        let h = Harness::new();
        let case = h.open_case().await;
        let mut owner = h.join(case.id, OWNER, Role::User).await;
        owner.frames();

        assert_matches!(owner.session.handle_text("{nope").await, Err(CaseError::Validation(_)));
        assert_eq!(owner.frames()[0]["code"], "VALIDATION_ERROR");
        assert_matches!(owner.session.state(), SessionState::Active { .. });
        owner
            .send(serde_json::json!({"type": "message", "content": "still here"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn message_after_resolution_is_a_conflict() {
        let h = Harness::new();
        let case = h.open_case().await;
        let mut owner = h.join(case.id, OWNER, Role::User).await;
        owner.frames();

        h.store
            .create_analysis_result(
                case.id,
                ResolutionAnalysis {
                    classification: "c".into(),
                    summary: "s".into(),
                    sentiment: Sentiment::Positive,
                },
            )
            .await
            .unwrap();
        h.store
            .update_case_status(case.id, CaseTransition::Resolve { by: ResolvedBy::User })
            .await
            .unwrap();

        let sent = owner
            .send(serde_json::json!({"type": "message", "content": "one more thing"}))
            .await;
        assert_matches!(sent, Err(CaseError::Conflict(_)));
        assert_eq!(owner.frames()[0]["code"], "CONFLICT");
        assert!(h.store.list_messages(case.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unassigned_lead_observes_but_cannot_write() {
        let h = Harness::new();
        let case = h.open_case().await;
        let mut owner = h.join(case.id, OWNER, Role::User).await;
        let mut lead = h.join(case.id, LEAD, Role::LeadAgent).await;
        owner.frames();
        lead.frames();

        lead.send(serde_json::json!({"type": "typing"})).await.unwrap();
        assert_eq!(types(&owner.frames()), ["typing"]);

        let sent = lead
            .send(serde_json::json!({"type": "message", "content": "hello"}))
            .await;
        assert_matches!(sent, Err(CaseError::Forbidden(_)));
        assert!(owner.frames().is_empty());

        owner
            .send(serde_json::json!({"type": "message", "content": "hi"}))
            .await
            .unwrap();
        assert_eq!(types(&lead.frames()), ["error", "message"]);
    }

    #[tokio::test]
    async fn typing_excludes_sender() {
        let h = Harness::new();
        let case = h.open_case().await;
        h.assign(&case, AGENT).await;
        let mut owner = h.join(case.id, OWNER, Role::User).await;
        let mut agent = h.join(case.id, AGENT, Role::Agent).await;
        owner.frames();
        agent.frames();

        owner.send(serde_json::json!({"type": "typing"})).await.unwrap();
        owner.send(serde_json::json!({"type": "stopTyping"})).await.unwrap();
        assert!(owner.frames().is_empty());
        let frames = agent.frames();
        assert_eq!(types(&frames), ["typing", "typing"]);
        assert_eq!(frames[0]["isTyping"], true);
        assert_eq!(frames[1]["isTyping"], false);
        assert_eq!(frames[1]["userId"], OWNER);
        assert!(h.store.list_messages(case.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_rules() {
        let h = Harness::new();
        let case = h.open_case().await;
        let other_case = h.store.create_case(OWNER, Category::Other, 1).await.unwrap();
        h.assign(&case, AGENT).await;
        let mut owner = h.join(case.id, OWNER, Role::User).await;
        let mut agent = h.join(case.id, AGENT, Role::Agent).await;

        owner
            .send(serde_json::json!({"type": "message", "content": "mine"}))
            .await
            .unwrap();
        let mine = h.store.list_messages(case.id).await.unwrap()[0].id;
        let elsewhere = h
            .store
            .create_message(NewMessage {
                case_id: other_case.id,
                sender_id: OWNER,
                sender_role: helpdesk_core::SenderRole::User,
                content: "other case".into(),
            })
            .await
            .unwrap();
        owner.frames();
        agent.frames();

        let by_agent = agent
            .send(serde_json::json!({"type": "deleteMessage", "messageId": mine}))
            .await;
        assert_matches!(by_agent, Err(CaseError::Forbidden(_)));

        let cross_case = owner
            .send(serde_json::json!({"type": "deleteMessage", "messageId": elsewhere.id}))
            .await;
        assert_matches!(cross_case, Err(CaseError::NotFound(_)));

        let missing = owner
            .send(serde_json::json!({"type": "deleteMessage", "messageId": 4242}))
            .await;
        assert_matches!(missing, Err(CaseError::NotFound(_)));

        owner
            .send(serde_json::json!({"type": "deleteMessage", "messageId": mine}))
            .await
            .unwrap();
        assert_eq!(types(&agent.frames()), ["error", "messageDeleted"]);
        let owner_frames = owner.frames();
        assert_eq!(types(&owner_frames), ["error", "error", "messageDeleted"]);
        assert_eq!(owner_frames[2]["messageId"], mine);
        assert!(h.store.list_messages(case.id).await.unwrap().is_empty());
        assert!(h.store.get_message(elsewhere.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn close_runs_once() {
        let h = Harness::new();
        let case = h.open_case().await;
        h.assign(&case, AGENT).await;
        let mut owner = h.join(case.id, OWNER, Role::User).await;
        let mut agent = h.join(case.id, AGENT, Role::Agent).await;
        owner.frames();

        assert!(agent.session.close());
        assert!(!agent.session.close());
        drop(agent.session);

        let frames = owner.frames();
        assert_eq!(types(&frames), ["userLeft"]);
        assert_eq!(frames[0]["userId"], AGENT);
        assert_eq!(h.rooms.member_count(case.id), 1);
    }

    #[tokio::test]
    async fn drop_releases_membership() {
        let h = Harness::new();
        let case = h.open_case().await;
        let mut watcher = h.join(case.id, LEAD, Role::LeadAgent).await;
        watcher.frames();
        {
            let _owner = h.join(case.id, OWNER, Role::User).await;
            assert_eq!(h.rooms.member_count(case.id), 2);
        }
        assert_eq!(h.rooms.member_count(case.id), 1);
        assert_eq!(types(&watcher.frames()), ["userJoined", "userLeft"]);

        drop(watcher);
        assert_eq!(h.rooms.room_count(), 0);
    }

    #[tokio::test]
    async fn frames_after_close_are_rejected() {
        let h = Harness::new();
        let case = h.open_case().await;
        let mut owner = h.join(case.id, OWNER, Role::User).await;
        owner.session.close();
        owner.frames();

        let sent = owner
            .send(serde_json::json!({"type": "message", "content": "ghost"}))
            .await;
        assert_matches!(sent, Err(CaseError::Internal(_)));
        assert!(owner.frames().is_empty());
        assert!(h.store.list_messages(case.id).await.unwrap().is_empty());
    }

    async fn resolve_in_store(h: &Harness, case_id: CaseId) {
        h.store
            .create_analysis_result(
                case_id,
                ResolutionAnalysis {
                    classification: "c".into(),
                    summary: "s".into(),
                    sentiment: Sentiment::Neutral,
                },
            )
            .await
            .unwrap();
        h.store
            .update_case_status(case_id, CaseTransition::Resolve { by: ResolvedBy::User })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn resolution_while_waiting_to_write_is_a_conflict() {
        let h = Harness::new();
        let case = h.open_case().await;
        let mut owner = h.join(case.id, OWNER, Role::User).await;
        owner.frames();

        let writing = h.rooms.sequencer(case.id).lock_owned().await;
        let pending = tokio::spawn(async move {
            let sent = owner
                .send(serde_json::json!({"type": "message", "content": "one more thing"}))
                .await;
            (owner, sent)
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        resolve_in_store(&h, case.id).await;
        drop(writing);

        let (mut owner, sent) = pending.await.unwrap();
        assert_matches!(sent, Err(CaseError::Conflict(_)));
        assert_eq!(types(&owner.frames()), ["error"]);
        assert!(h.store.list_messages(case.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn joiner_waiting_on_the_room_shares_its_sequencer() {
        let h = Harness::new();
        let case = h.open_case().await;
        h.assign(&case, AGENT).await;
        let owner = h.join(case.id, OWNER, Role::User).await;

        let writing = h.rooms.sequencer(case.id).lock_owned().await;
        let mut agent = h.participant(case.id, AGENT, Role::Agent);
        agent.session.authorize().await.unwrap();
        let pending = tokio::spawn(async move {
            agent.session.activate().await.unwrap();
            agent
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // The only member leaves while the agent is still queued.
        drop(owner);
        drop(writing);
        let agent = pending.await.unwrap();
        let lead = h.join(case.id, LEAD, Role::LeadAgent).await;

        let (SessionState::Active { sequencer: first }, SessionState::Active { sequencer: second }) =
            (agent.session.state(), lead.session.state())
        else {
            panic!("both sessions should be active");
        };
        assert!(Arc::ptr_eq(first, second));
        assert!(Arc::ptr_eq(first, &h.rooms.sequencer(case.id)));
        assert_eq!(h.rooms.member_count(case.id), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_senders_see_persisted_order() {
        let h = Harness::new();
        let case = h.open_case().await;
        h.assign(&case, AGENT).await;
        let mut watcher = h.join(case.id, LEAD, Role::LeadAgent).await;
        watcher.frames();

        let mut tasks = Vec::new();
        for (user_id, role) in [(OWNER, Role::User), (AGENT, Role::Agent)] {
            let mut p = h.join(case.id, user_id, role).await;
            tasks.push(tokio::spawn(async move {
                for i in 0..10 {
                    p.send(serde_json::json!({"type": "message", "content": format!("{user_id}-{i}")}))
                        .await
                        .unwrap();
                }
                p
            }));
        }
        let mut finished = Vec::new();
        for task in tasks {
            finished.push(task.await.unwrap());
        }

        let broadcast_ids: Vec<i64> = watcher
            .frames()
            .iter()
            .filter(|f| f["type"] == "message")
            .map(|f| f["message"]["id"].as_i64().unwrap())
            .collect();
        let stored = h.store.list_messages(case.id).await.unwrap();
        let stored_ids: Vec<i64> = stored.iter().map(|m| m.id).collect();
        assert_eq!(broadcast_ids, stored_ids);
        assert!(stored.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        assert_eq!(stored.len(), 20);

        let case = h.store.get_case(case.id).await.unwrap().unwrap();
        assert_eq!(case.status, CaseStatus::InProgress);
    }
}
