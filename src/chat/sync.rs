//! Chat state owned by the sync loop
//!
//! `ChatSync` is a plain state machine: it never touches the socket or the
//! clock itself. Every input returns the events to emit, and time is passed
//! in, so the loop in `driver` stays a thin `select!` over IO.
//!
//! Per open conversation: `Idle -> Loading -> Ready`. Selecting a peer enters
//! `Loading` and arms a deadline; a history snapshot for that peer moves to
//! `Ready`, and a missed deadline drops back to `Idle` with a notice.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::models::{ChatMessage, ChatUser};
use crate::realtime::{ClientEvent, ServerEvent};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready,
}

/// Operator-facing notifications raised by state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    HistoryTimeout { peer: String },
    NoConversation,
    Offline,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::HistoryTimeout { peer } => write!(
                f,
                "Could not load the conversation with {}; select it again to retry",
                peer
            ),
            Notice::NoConversation => write!(f, "Select a conversation before sending"),
            Notice::Offline => write!(f, "Not connected; message was not sent"),
        }
    }
}

/// Snapshot handed to the UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatView {
    pub users: Vec<ChatUser>,
    pub selected: Option<String>,
    pub phase: Phase,
    pub messages: Vec<ChatMessage>,
}

pub struct ChatSync {
    operator_role: String,
    history_timeout: Duration,
    users: Vec<ChatUser>,
    selected: Option<String>,
    phase: Phase,
    deadline: Option<Instant>,
    messages: Vec<ChatMessage>,
    /// Peers marked read locally whose zero the server has not confirmed yet.
    pending_read: HashSet<String>,
    notices: Vec<Notice>,
}

impl ChatSync {
    pub fn new(operator_role: &str, history_timeout: Duration) -> Self {
        Self {
            operator_role: operator_role.to_string(),
            history_timeout,
            users: Vec::new(),
            selected: None,
            phase: Phase::Idle,
            deadline: None,
            messages: Vec::new(),
            pending_read: HashSet::new(),
            notices: Vec::new(),
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[cfg(test)]
    pub fn users(&self) -> &[ChatUser] {
        &self.users
    }

    #[cfg(test)]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// When the pending history wait expires, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn view(&self) -> ChatView {
        ChatView {
            users: self.users.clone(),
            selected: self.selected.clone(),
            phase: self.phase,
            messages: self.messages.clone(),
        }
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Open the conversation with `peer`.
    ///
    /// Always re-arms the wait, replacing any earlier one. Unread messages
    /// are acknowledged right away and the local counter zeroed.
    pub fn select(&mut self, peer: &str, now: Instant) -> Vec<ClientEvent> {
        let peer = peer.trim();
        if peer.is_empty() {
            return Vec::new();
        }
        if self.selected.as_deref() != Some(peer) {
            self.messages.clear();
        }
        self.selected = Some(peer.to_string());

        let mut out = self.load(peer, now);
        out.extend(self.acknowledge(peer));
        out
    }

    pub fn deselect(&mut self) {
        self.selected = None;
        self.phase = Phase::Idle;
        self.deadline = None;
        self.messages.clear();
    }

    /// Re-request the open conversation after a reconnect.
    pub fn resume(&mut self, now: Instant) -> Vec<ClientEvent> {
        match self.selected.clone() {
            Some(peer) => self.load(&peer, now),
            None => Vec::new(),
        }
    }

    fn load(&mut self, peer: &str, now: Instant) -> Vec<ClientEvent> {
        self.phase = Phase::Loading;
        self.deadline = Some(now + self.history_timeout);
        vec![
            ClientEvent::JoinConversation {
                user_id: peer.to_string(),
            },
            ClientEvent::GetConversation {
                user_id: peer.to_string(),
            },
        ]
    }

    fn acknowledge(&mut self, peer: &str) -> Option<ClientEvent> {
        let user = self.users.iter_mut().find(|u| u.id == peer)?;
        if user.unread_count == 0 {
            return None;
        }
        user.unread_count = 0;
        self.pending_read.insert(peer.to_string());
        Some(ClientEvent::MarkRead {
            user_id: peer.to_string(),
        })
    }

    /// Give up on a history wait that has passed its deadline.
    ///
    /// Returns whether anything changed.
    pub fn check_timeout(&mut self, now: Instant) -> bool {
        match (self.phase, self.deadline) {
            (Phase::Loading, Some(deadline)) if now >= deadline => {
                let peer = self.selected.take().unwrap_or_default();
                tracing::warn!("No history for {} within {:?}", peer, self.history_timeout);
                self.phase = Phase::Idle;
                self.deadline = None;
                self.messages.clear();
                self.notices.push(Notice::HistoryTimeout { peer });
                true
            }
            _ => false,
        }
    }

    pub fn poll_users(&self) -> ClientEvent {
        ClientEvent::GetUsers
    }

    pub fn poll_history(&self) -> Option<ClientEvent> {
        self.selected
            .as_ref()
            .map(|peer| ClientEvent::GetConversation {
                user_id: peer.clone(),
            })
    }

    /// Build a `send_message` for the open conversation.
    ///
    /// Nothing is appended locally; the server's echo is what shows up.
    pub fn send(&mut self, content: &str) -> Option<ClientEvent> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        match self.selected.as_ref() {
            Some(peer) => Some(ClientEvent::SendMessage {
                receiver_id: peer.clone(),
                content: content.to_string(),
            }),
            None => {
                self.notices.push(Notice::NoConversation);
                None
            }
        }
    }

    pub fn on_event(&mut self, event: ServerEvent) -> Vec<ClientEvent> {
        match event {
            ServerEvent::UsersList(users) => {
                self.replace_users(users);
                Vec::new()
            }
            ServerEvent::UserStatus { user_id, online } => {
                if let Some(user) = self.users.iter_mut().find(|u| u.id == user_id) {
                    user.online = online;
                }
                Vec::new()
            }
            ServerEvent::NewMessage(message) => self.on_message(message),
            ServerEvent::ConversationHistory { user_id, messages } => {
                self.on_history(&user_id, messages);
                Vec::new()
            }
        }
    }

    fn replace_users(&mut self, mut users: Vec<ChatUser>) {
        for user in &mut users {
            if !self.pending_read.contains(&user.id) {
                continue;
            }
            if user.unread_count == 0 {
                self.pending_read.remove(&user.id);
            } else {
                user.unread_count = 0;
            }
        }
        self.users = users;
    }

    fn on_message(&mut self, message: ChatMessage) -> Vec<ClientEvent> {
        let from_operator = message.is_from_operator(&self.operator_role);
        let belongs_here = self.selected.as_deref().is_some_and(|open| {
            message.involves(open) || (from_operator && message.receiver_id.is_none())
        });

        let is_new = !self.messages.iter().any(|m| m.is_same_delivery(&message));
        let peer = message.counterpart(&self.operator_role).map(str::to_string);
        let viewing = peer.is_some() && peer.as_deref() == self.selected.as_deref();

        let mut out = Vec::new();
        if let Some(peer) = peer {
            let bump = !from_operator && !viewing;
            self.touch_summary(&peer, &message, bump);
            if viewing && !from_operator && is_new {
                self.pending_read.insert(peer.clone());
                out.push(ClientEvent::MarkRead { user_id: peer });
            }
        }

        if belongs_here && is_new {
            self.messages.push(message);
        }
        out
    }

    fn touch_summary(&mut self, peer: &str, message: &ChatMessage, bump: bool) {
        if bump {
            self.pending_read.remove(peer);
        }
        match self.users.iter_mut().find(|u| u.id == peer) {
            Some(user) => {
                user.last_message = Some(message.content.clone());
                if bump {
                    user.unread_count = user.unread_count.saturating_add(1);
                }
            }
            None => {
                let mut user = ChatUser::from_message(peer, message);
                if bump {
                    user.unread_count = 1;
                }
                self.users.insert(0, user);
            }
        }
    }

    fn on_history(&mut self, peer: &str, snapshot: Vec<ChatMessage>) {
        if self.selected.as_deref() != Some(peer) {
            tracing::debug!("Dropping stale history for {}", peer);
            return;
        }

        let mut merged: Vec<ChatMessage> = Vec::with_capacity(snapshot.len());
        for message in snapshot.into_iter().chain(self.messages.drain(..)) {
            if !merged.iter().any(|m| m.is_same_delivery(&message)) {
                merged.push(message);
            }
        }

        self.messages = merged;
        self.phase = Phase::Ready;
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OPERATOR_ROLE;

    const WAIT: Duration = Duration::from_secs(10);

    fn user(id: &str, unread: u32) -> ChatUser {
        ChatUser {
            id: id.to_string(),
            name: None,
            online: true,
            unread_count: unread,
            last_message: None,
        }
    }

    fn from_customer(sender: &str, content: &str, ts: &str) -> ChatMessage {
        ChatMessage {
            id: None,
            sender_id: sender.to_string(),
            receiver_id: Some("op1".to_string()),
            content: content.to_string(),
            timestamp: ts.to_string(),
            read: false,
            role: Some("user".to_string()),
        }
    }

    fn from_operator(receiver: Option<&str>, content: &str, ts: &str) -> ChatMessage {
        ChatMessage {
            id: None,
            sender_id: "op1".to_string(),
            receiver_id: receiver.map(String::from),
            content: content.to_string(),
            timestamp: ts.to_string(),
            read: false,
            role: Some("admin".to_string()),
        }
    }

    fn with_users(users: Vec<ChatUser>) -> ChatSync {
        let mut sync = ChatSync::new(OPERATOR_ROLE, WAIT);
        sync.on_event(ServerEvent::UsersList(users));
        sync
    }

    fn ready(sync: &mut ChatSync, peer: &str, now: Instant) {
        sync.select(peer, now);
        sync.on_event(ServerEvent::ConversationHistory {
            user_id: peer.to_string(),
            messages: Vec::new(),
        });
        assert_eq!(sync.phase(), Phase::Ready);
    }

    #[test]
    fn test_select_acknowledges_unread() {
        let mut sync = with_users(vec![user("u1", 3), user("u2", 0)]);
        let out = sync.select("u1", Instant::now());

        assert_eq!(
            out,
            vec![
                ClientEvent::JoinConversation { user_id: "u1".into() },
                ClientEvent::GetConversation { user_id: "u1".into() },
                ClientEvent::MarkRead { user_id: "u1".into() },
            ]
        );
        assert_eq!(sync.users()[0].unread_count, 0);
        assert_eq!(sync.phase(), Phase::Loading);

        let out = sync.select("u2", Instant::now());
        assert!(!out.iter().any(|e| matches!(e, ClientEvent::MarkRead { .. })));
    }

    #[test]
    fn test_missing_history_times_out_to_idle() {
        let mut sync = with_users(vec![user("u1", 0)]);
        let t0 = Instant::now();
        sync.select("u1", t0);

        assert!(!sync.check_timeout(t0 + Duration::from_secs(9)));
        assert_eq!(sync.phase(), Phase::Loading);

        assert!(sync.check_timeout(t0 + WAIT));
        assert_eq!(sync.phase(), Phase::Idle);
        assert_eq!(sync.selected(), None);
        assert_eq!(sync.deadline(), None);
        assert_eq!(
            sync.take_notices(),
            vec![Notice::HistoryTimeout { peer: "u1".into() }]
        );
    }

    #[test]
    fn test_reselect_replaces_wait_and_drops_stale_history() {
        let mut sync = with_users(vec![user("u1", 0), user("u2", 0)]);
        let t0 = Instant::now();
        sync.select("u1", t0);
        sync.select("u2", t0 + Duration::from_secs(8));

        assert!(!sync.check_timeout(t0 + Duration::from_secs(11)));
        assert_eq!(sync.deadline(), Some(t0 + Duration::from_secs(18)));

        sync.on_event(ServerEvent::ConversationHistory {
            user_id: "u1".into(),
            messages: vec![from_customer("u1", "cũ", "2026-10-19T07:00:00Z")],
        });
        assert_eq!(sync.phase(), Phase::Loading);
        assert!(sync.messages().is_empty());
    }

    #[test]
    fn test_duplicate_push_is_not_appended_twice() {
        let mut sync = with_users(vec![user("u1", 0)]);
        ready(&mut sync, "u1", Instant::now());

        let msg = from_customer("u1", "Xe đến chưa?", "2026-10-19T08:00:00.000Z");
        let first = sync.on_event(ServerEvent::NewMessage(msg.clone()));
        let second = sync.on_event(ServerEvent::NewMessage(msg));

        assert_eq!(sync.messages().len(), 1);
        assert_eq!(first, vec![ClientEvent::MarkRead { user_id: "u1".into() }]);
        assert!(second.is_empty());
        assert_eq!(sync.users()[0].unread_count, 0);
    }

    #[test]
    fn test_push_with_new_id_but_same_content_is_deduplicated() {
        let mut sync = with_users(vec![user("u1", 0)]);
        let mut stored = from_customer("u1", "Còn ghế không?", "2026-10-19T08:00:00.000Z");
        stored.id = Some("m1".into());
        sync.select("u1", Instant::now());
        sync.on_event(ServerEvent::ConversationHistory {
            user_id: "u1".into(),
            messages: vec![stored.clone()],
        });

        let mut pushed = stored;
        pushed.id = Some("m2".into());
        let out = sync.on_event(ServerEvent::NewMessage(pushed));

        assert_eq!(sync.messages().len(), 1);
        assert_eq!(sync.messages()[0].id.as_deref(), Some("m1"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_other_peer_message_bumps_unread_only() {
        let mut sync = with_users(vec![user("u1", 0), user("u2", 1)]);
        ready(&mut sync, "u1", Instant::now());

        sync.on_event(ServerEvent::NewMessage(from_customer(
            "u2",
            "Tôi muốn hủy vé",
            "2026-10-19T08:05:00.000Z",
        )));

        assert!(sync.messages().is_empty());
        let u2 = sync.users().iter().find(|u| u.id == "u2").unwrap();
        assert_eq!(u2.unread_count, 2);
        assert_eq!(u2.last_message.as_deref(), Some("Tôi muốn hủy vé"));
    }

    #[test]
    fn test_operator_messages_merge_rule() {
        let mut sync = with_users(vec![user("u1", 0), user("u2", 0)]);
        ready(&mut sync, "u1", Instant::now());

        sync.on_event(ServerEvent::NewMessage(from_operator(
            Some("u1"),
            "Xe sẽ đến lúc 9h",
            "2026-10-19T08:10:00.000Z",
        )));
        sync.on_event(ServerEvent::NewMessage(from_operator(
            None,
            "Thông báo chung",
            "2026-10-19T08:11:00.000Z",
        )));
        sync.on_event(ServerEvent::NewMessage(from_operator(
            Some("u2"),
            "Cho người khác",
            "2026-10-19T08:12:00.000Z",
        )));

        let contents: Vec<&str> = sync.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["Xe sẽ đến lúc 9h", "Thông báo chung"]);
        let u2 = sync.users().iter().find(|u| u.id == "u2").unwrap();
        assert_eq!(u2.unread_count, 0);
        assert_eq!(u2.last_message.as_deref(), Some("Cho người khác"));
    }

    #[test]
    fn test_message_from_unknown_peer_adds_summary() {
        let mut sync = with_users(vec![user("u1", 0)]);
        sync.on_event(ServerEvent::NewMessage(from_customer(
            "u9",
            "Xin chào",
            "2026-10-19T08:00:00.000Z",
        )));

        assert_eq!(sync.users()[0].id, "u9");
        assert_eq!(sync.users()[0].unread_count, 1);
        assert_eq!(sync.users().len(), 2);
    }

    #[test]
    fn test_history_keeps_pushed_messages_missing_from_snapshot() {
        let mut sync = with_users(vec![user("u1", 0)]);
        sync.select("u1", Instant::now());

        let early = from_customer("u1", "một", "2026-10-19T08:00:00.000Z");
        let pushed = from_customer("u1", "hai", "2026-10-19T08:00:05.000Z");
        sync.on_event(ServerEvent::NewMessage(early.clone()));
        sync.on_event(ServerEvent::NewMessage(pushed));

        sync.on_event(ServerEvent::ConversationHistory {
            user_id: "u1".into(),
            messages: vec![early.clone(), early],
        });

        assert_eq!(sync.phase(), Phase::Ready);
        assert_eq!(sync.deadline(), None);
        let contents: Vec<&str> = sync.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["một", "hai"]);
    }

    #[test]
    fn test_read_hold_survives_stale_user_list() {
        let mut sync = with_users(vec![user("u1", 4)]);
        sync.select("u1", Instant::now());
        sync.deselect();

        sync.on_event(ServerEvent::UsersList(vec![user("u1", 4)]));
        assert_eq!(sync.users()[0].unread_count, 0);

        sync.on_event(ServerEvent::UsersList(vec![user("u1", 0)]));
        sync.on_event(ServerEvent::UsersList(vec![user("u1", 2)]));
        assert_eq!(sync.users()[0].unread_count, 2);
    }

    #[test]
    fn test_new_message_releases_read_hold() {
        let mut sync = with_users(vec![user("u1", 4)]);
        sync.select("u1", Instant::now());
        sync.deselect();

        sync.on_event(ServerEvent::NewMessage(from_customer(
            "u1",
            "còn đó không?",
            "2026-10-19T09:00:00.000Z",
        )));
        assert_eq!(sync.users()[0].unread_count, 1);

        sync.on_event(ServerEvent::UsersList(vec![user("u1", 5)]));
        assert_eq!(sync.users()[0].unread_count, 5);
    }

    #[test]
    fn test_send_requires_open_conversation() {
        let mut sync = with_users(vec![user("u1", 0)]);
        assert_eq!(sync.send("chào"), None);
        assert_eq!(sync.take_notices(), vec![Notice::NoConversation]);

        ready(&mut sync, "u1", Instant::now());
        assert_eq!(sync.send("   "), None);
        assert_eq!(
            sync.send(" Vé đã được đổi "),
            Some(ClientEvent::SendMessage {
                receiver_id: "u1".into(),
                content: "Vé đã được đổi".into(),
            })
        );
        assert!(sync.messages().is_empty());
    }

    #[test]
    fn test_resume_reloads_open_conversation() {
        let mut sync = with_users(vec![user("u1", 0)]);
        let t0 = Instant::now();
        assert!(sync.resume(t0).is_empty());

        ready(&mut sync, "u1", t0);
        let out = sync.resume(t0);
        assert_eq!(out.len(), 2);
        assert_eq!(sync.phase(), Phase::Loading);
        assert_eq!(sync.deadline(), Some(t0 + WAIT));
        assert_eq!(sync.poll_history(), Some(ClientEvent::GetConversation { user_id: "u1".into() }));
    }

    #[test]
    fn test_user_status_updates_presence() {
        let mut sync = with_users(vec![user("u1", 0)]);
        sync.on_event(ServerEvent::UserStatus {
            user_id: "u1".into(),
            online: false,
        });
        assert!(!sync.users()[0].online);
    }
}
