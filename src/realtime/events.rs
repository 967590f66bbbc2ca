//! Typed chat events carried over the socket.

use serde::Deserialize;
use serde_json::{json, Value};

use super::frame;
use crate::models::{ChatMessage, ChatUser};

/// Events the operator console emits.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    GetUsers,
    GetConversation { user_id: String },
    SendMessage { receiver_id: String, content: String },
    MarkRead { user_id: String },
    JoinConversation { user_id: String },
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::GetUsers => "get_users",
            ClientEvent::GetConversation { .. } => "get_conversation",
            ClientEvent::SendMessage { .. } => "send_message",
            ClientEvent::MarkRead { .. } => "mark_read",
            ClientEvent::JoinConversation { .. } => "join_conversation",
        }
    }

    pub fn payload(&self) -> Option<Value> {
        match self {
            ClientEvent::GetUsers => None,
            ClientEvent::GetConversation { user_id }
            | ClientEvent::MarkRead { user_id }
            | ClientEvent::JoinConversation { user_id } => Some(json!({ "userId": user_id })),
            ClientEvent::SendMessage {
                receiver_id,
                content,
            } => Some(json!({ "receiverId": receiver_id, "content": content })),
        }
    }

    pub fn encode(&self) -> String {
        frame::encode_event(self.name(), self.payload().as_ref())
    }
}

/// Events pushed by the chat server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    UsersList(Vec<ChatUser>),
    UserStatus { user_id: String, online: bool },
    NewMessage(ChatMessage),
    ConversationHistory {
        user_id: String,
        messages: Vec<ChatMessage>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UsersPayload {
    Bare(Vec<ChatUser>),
    Wrapped { users: Vec<ChatUser> },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusPayload {
    user_id: String,
    #[serde(alias = "isOnline")]
    online: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryPayload {
    user_id: String,
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

impl ServerEvent {
    /// Decode a named event. Unknown event names yield `Ok(None)`.
    pub fn decode(name: &str, data: Value) -> serde_json::Result<Option<Self>> {
        let event = match name {
            "users_list" => match serde_json::from_value(data)? {
                UsersPayload::Bare(users) | UsersPayload::Wrapped { users } => {
                    ServerEvent::UsersList(users)
                }
            },
            "user_status" => {
                let status: StatusPayload = serde_json::from_value(data)?;
                ServerEvent::UserStatus {
                    user_id: status.user_id,
                    online: status.online,
                }
            }
            "new_message" => ServerEvent::NewMessage(serde_json::from_value(data)?),
            "conversation_history" => {
                let history: HistoryPayload = serde_json::from_value(data)?;
                ServerEvent::ConversationHistory {
                    user_id: history.user_id,
                    messages: history.messages,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}
