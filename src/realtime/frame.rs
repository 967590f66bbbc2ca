//! Engine.IO v4 / Socket.IO v4 text framing
//!
//! Every websocket text message is one Engine.IO packet: a single digit type
//! followed by the payload. Type `4` carries a Socket.IO packet, which in turn
//! starts with its own type digit, an optional `/namespace,` and an optional
//! numeric ack id before the JSON body.
//!
//! ```text
//! 0{"sid":"..","pingInterval":25000,"pingTimeout":20000}   open
//! 2                                                        ping (reply 3)
//! 40{"token":".."}                                         connect
//! 42["new_message",{..}]                                   event
//! 44{"message":"jwt expired"}                              connect error
//! ```

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Engine.IO open payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Noop,
    /// Namespace connect acknowledged; carries the server's payload if any.
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, data: Value },
    Ack,
    ConnectError(Value),
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,
    #[error("unknown Engine.IO packet type {0:?}")]
    UnknownEngineType(char),
    #[error("unknown Socket.IO packet type {0:?}")]
    UnknownPacketType(char),
    #[error("binary Socket.IO packets are not supported")]
    Binary,
    #[error("event packet is not a [name, ...] array")]
    MalformedEvent,
    #[error("invalid frame payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Split off the leading ASCII type digit.
fn split_type(text: &str) -> Result<(char, &str), FrameError> {
    match text.as_bytes().first() {
        None => Err(FrameError::Empty),
        Some(b) if b.is_ascii() => Ok((*b as char, &text[1..])),
        Some(_) => Err(FrameError::UnknownEngineType(
            text.chars().next().unwrap_or('?'),
        )),
    }
}

pub fn parse(text: &str) -> Result<Frame, FrameError> {
    let (kind, rest) = split_type(text)?;
    match kind {
        '0' => Ok(Frame::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping),
        '3' => Ok(Frame::Pong),
        '4' => parse_packet(rest),
        '6' => Ok(Frame::Noop),
        other => Err(FrameError::UnknownEngineType(other)),
    }
}

fn parse_packet(text: &str) -> Result<Frame, FrameError> {
    let (kind, rest) = split_type(text).map_err(|e| match e {
        FrameError::UnknownEngineType(c) => FrameError::UnknownPacketType(c),
        other => other,
    })?;

    let body = strip_namespace(rest);
    let body = body.trim_start_matches(|c: char| c.is_ascii_digit());

    match kind {
        '0' if body.is_empty() => Ok(Frame::Connect(None)),
        '0' => Ok(Frame::Connect(Some(serde_json::from_str(body)?))),
        '1' => Ok(Frame::Disconnect),
        '2' => parse_event(body),
        '3' => Ok(Frame::Ack),
        '4' if body.is_empty() => Ok(Frame::ConnectError(Value::Null)),
        '4' => Ok(Frame::ConnectError(serde_json::from_str(body)?)),
        '5' | '6' => Err(FrameError::Binary),
        other => Err(FrameError::UnknownPacketType(other)),
    }
}

/// Drop a `/namespace,` prefix. A bare namespace with no body yields "".
fn strip_namespace(text: &str) -> &str {
    if !text.starts_with('/') {
        return text;
    }
    match text.find(',') {
        Some(pos) => &text[pos + 1..],
        None => "",
    }
}

fn parse_event(body: &str) -> Result<Frame, FrameError> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Array(items) = value else {
        return Err(FrameError::MalformedEvent);
    };
    let mut items = items.into_iter();
    let name = match items.next() {
        Some(Value::String(name)) => name,
        _ => return Err(FrameError::MalformedEvent),
    };
    let data = items.next().unwrap_or(Value::Null);
    Ok(Frame::Event { name, data })
}

/// `42["name",data]`, or `42["name"]` when there is no payload.
pub fn encode_event(name: &str, data: Option<&Value>) -> String {
    let mut items = vec![Value::String(name.to_string())];
    if let Some(data) = data {
        items.push(data.clone());
    }
    format!("42{}", Value::Array(items))
}

/// Namespace connect for the default namespace, with optional auth payload.
pub fn encode_connect(auth: Option<&Value>) -> String {
    match auth {
        Some(auth) => format!("40{}", auth),
        None => "40".to_string(),
    }
}

pub const PONG: &str = "3";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_open() {
        let frame =
            parse(r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#)
                .unwrap();
        assert_eq!(
            frame,
            Frame::Open(Handshake {
                sid: "abc".into(),
                ping_interval: 25000,
                ping_timeout: 20000,
            })
        );
    }

    #[test]
    fn test_parse_control_frames() {
        assert_eq!(parse("2").unwrap(), Frame::Ping);
        assert_eq!(parse("3").unwrap(), Frame::Pong);
        assert_eq!(parse("1").unwrap(), Frame::Close);
        assert_eq!(parse("41").unwrap(), Frame::Disconnect);
    }

    #[test]
    fn test_parse_connect() {
        assert_eq!(parse("40").unwrap(), Frame::Connect(None));
        assert_eq!(
            parse(r#"40{"sid":"x1"}"#).unwrap(),
            Frame::Connect(Some(json!({ "sid": "x1" })))
        );
    }

    #[test]
    fn test_parse_event_with_namespace_and_ack() {
        let frame = parse(r#"42/chat,17["new_message",{"content":"chào"}]"#).unwrap();
        assert_eq!(
            frame,
            Frame::Event {
                name: "new_message".into(),
                data: json!({ "content": "chào" }),
            }
        );
    }

    #[test]
    fn test_parse_event_without_data() {
        assert_eq!(
            parse(r#"42["get_users"]"#).unwrap(),
            Frame::Event {
                name: "get_users".into(),
                data: Value::Null,
            }
        );
    }

    #[test]
    fn test_parse_connect_error() {
        assert_eq!(
            parse(r#"44{"message":"jwt expired"}"#).unwrap(),
            Frame::ConnectError(json!({ "message": "jwt expired" }))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse(""), Err(FrameError::Empty)));
        assert!(matches!(parse("9"), Err(FrameError::UnknownEngineType('9'))));
        assert!(matches!(parse("4x"), Err(FrameError::UnknownPacketType('x'))));
        assert!(matches!(parse(r#"42{"a":1}"#), Err(FrameError::MalformedEvent)));
        assert!(matches!(parse(r#"451-["up",{}]"#), Err(FrameError::Binary)));
        assert!(matches!(parse("ở"), Err(FrameError::UnknownEngineType('ở'))));
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode_event("get_users", None), r#"42["get_users"]"#);
        assert_eq!(
            encode_event("mark_read", Some(&json!({ "userId": "u1" }))),
            r#"42["mark_read",{"userId":"u1"}]"#
        );
        assert_eq!(encode_connect(None), "40");
        assert_eq!(
            encode_connect(Some(&json!({ "token": "t" }))),
            r#"40{"token":"t"}"#
        );
    }
}
