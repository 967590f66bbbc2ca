//! Chat models: conversation messages and the per-user summary list.

use serde::{Deserialize, Serialize};

/// Sender role carried by messages the operator side writes.
pub const OPERATOR_ROLE: &str = "admin";

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Server-assigned identifier, when the backend provides one.
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub sender_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    pub content: String,
    pub timestamp: String,
    #[serde(default, alias = "isRead")]
    pub read: bool,
    /// Role of the sender ("admin" for operators, "user" for customers).
    #[serde(default)]
    pub role: Option<String>,
}

/// Content-based identity used when no server id is available.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub content: String,
    pub timestamp: String,
    pub sender_id: String,
}

impl ChatMessage {
    pub fn key(&self) -> MessageKey {
        MessageKey {
            content: self.content.clone(),
            timestamp: self.timestamp.clone(),
            sender_id: self.sender_id.clone(),
        }
    }

    /// Two messages are the same delivery if their server ids match or
    /// their content, timestamp and sender match.
    pub fn is_same_delivery(&self, other: &ChatMessage) -> bool {
        let same_id = self.id.is_some() && self.id == other.id;
        same_id || self.key() == other.key()
    }

    pub fn is_from_operator(&self, operator_role: &str) -> bool {
        self.role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(operator_role))
    }

    /// Whether `peer` is the sender or the receiver.
    pub fn involves(&self, peer: &str) -> bool {
        self.sender_id == peer || self.receiver_id.as_deref() == Some(peer)
    }

    /// The customer side of the message: the receiver when an operator
    /// wrote it, the sender otherwise.
    pub fn counterpart(&self, operator_role: &str) -> Option<&str> {
        if self.is_from_operator(operator_role) {
            self.receiver_id.as_deref()
        } else {
            Some(self.sender_id.as_str())
        }
    }
}

/// Summary row for a user with a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatUser {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, alias = "fullName")]
    pub name: Option<String>,
    #[serde(default, alias = "isOnline")]
    pub online: bool,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub last_message: Option<String>,
}

impl ChatUser {
    /// Summary for a peer first seen through a pushed message.
    pub fn from_message(peer: &str, message: &ChatMessage) -> Self {
        Self {
            id: peer.to_string(),
            name: None,
            online: true,
            unread_count: 0,
            last_message: Some(message.content.clone()),
        }
    }

    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: Option<&str>, sender: &str, content: &str, ts: &str) -> ChatMessage {
        ChatMessage {
            id: id.map(String::from),
            sender_id: sender.to_string(),
            receiver_id: None,
            content: content.to_string(),
            timestamp: ts.to_string(),
            read: false,
            role: Some("user".to_string()),
        }
    }

    #[test]
    fn test_same_delivery_by_key() {
        let a = msg(None, "u1", "xin chào", "2026-10-19T08:00:00.000Z");
        let b = msg(None, "u1", "xin chào", "2026-10-19T08:00:00.000Z");
        let c = msg(None, "u1", "xin chào", "2026-10-19T08:00:01.000Z");
        assert!(a.is_same_delivery(&b));
        assert!(!a.is_same_delivery(&c));
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_same_delivery_by_id_or_key() {
        let a = msg(Some("m1"), "u1", "ok", "2026-10-19T08:00:00Z");
        // Re-delivered under a new id: still the same message.
        let b = msg(Some("m2"), "u1", "ok", "2026-10-19T08:00:00Z");
        let c = msg(None, "u1", "ok", "2026-10-19T08:00:00Z");
        // Same id, edited text.
        let d = msg(Some("m1"), "u1", "ok!", "2026-10-19T08:00:00Z");
        let e = msg(Some("m3"), "u1", "ok", "2026-10-19T08:00:05Z");
        assert!(a.is_same_delivery(&b));
        assert!(a.is_same_delivery(&c));
        assert!(a.is_same_delivery(&d));
        assert!(!a.is_same_delivery(&e));
        assert!(!c.is_same_delivery(&e));
    }

    #[test]
    fn test_counterpart() {
        let mut m = msg(None, "u1", "hi", "t");
        assert_eq!(m.counterpart(OPERATOR_ROLE), Some("u1"));

        m.role = Some("ADMIN".to_string());
        m.sender_id = "op".to_string();
        m.receiver_id = Some("u2".to_string());
        assert!(m.is_from_operator(OPERATOR_ROLE));
        assert_eq!(m.counterpart(OPERATOR_ROLE), Some("u2"));
        assert!(m.involves("u2"));
    }

    #[test]
    fn test_chat_user_deserialize() {
        let user: ChatUser = serde_json::from_value(serde_json::json!({
            "_id": "u7",
            "fullName": "Nguyễn Văn A",
            "isOnline": true,
            "unreadCount": 3,
            "lastMessage": "Cho tôi hỏi giờ xe chạy"
        }))
        .unwrap();
        assert_eq!(user.id, "u7");
        assert!(user.online);
        assert_eq!(user.unread_count, 3);
        assert_eq!(user.display_name(), "Nguyễn Văn A");
    }
}
