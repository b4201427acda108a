//! Phoenix v1 JSON frames spoken by the realtime service.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::event::{ChangeEvent, ChangeFilter};
use crate::error::Result;

pub const PHOENIX_TOPIC: &str = "phoenix";

const EVENT_JOIN: &str = "phx_join";
const EVENT_LEAVE: &str = "phx_leave";
const EVENT_REPLY: &str = "phx_reply";
const EVENT_ERROR: &str = "phx_error";
const EVENT_CLOSE: &str = "phx_close";
const EVENT_HEARTBEAT: &str = "heartbeat";
const EVENT_ACCESS_TOKEN: &str = "access_token";
const EVENT_POSTGRES_CHANGES: &str = "postgres_changes";
const EVENT_SYSTEM: &str = "system";

/// Wire frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
    #[serde(default)]
    pub join_ref: Option<String>,
}

impl PhoenixMessage {
    /// Subscribe `topic` to the row changes selected by `filter`.
    pub fn join(
        topic: &str,
        filter: &ChangeFilter,
        access_token: Option<&str>,
        msg_ref: String,
    ) -> Self {
        let mut change = json!({
            "event": filter.event_name(),
            "schema": filter.schema,
            "table": filter.table,
        });
        if let Some(row_filter) = &filter.filter {
            change["filter"] = Value::String(row_filter.clone());
        }

        let mut payload = json!({
            "config": {
                "broadcast": { "self": false, "ack": false },
                "presence": { "key": "" },
                "postgres_changes": [change],
                "private": false,
            },
        });
        if let Some(token) = access_token {
            payload["access_token"] = Value::String(token.to_string());
        }

        Self {
            topic: topic.to_string(),
            event: EVENT_JOIN.to_string(),
            payload,
            join_ref: Some(msg_ref.clone()),
            msg_ref: Some(msg_ref),
        }
    }

    pub fn leave(topic: &str, msg_ref: String) -> Self {
        Self {
            topic: topic.to_string(),
            event: EVENT_LEAVE.to_string(),
            payload: json!({}),
            msg_ref: Some(msg_ref),
            join_ref: None,
        }
    }

    pub fn heartbeat(msg_ref: String) -> Self {
        Self {
            topic: PHOENIX_TOPIC.to_string(),
            event: EVENT_HEARTBEAT.to_string(),
            payload: json!({}),
            msg_ref: Some(msg_ref),
            join_ref: None,
        }
    }

    /// Push a refreshed JWT to an already joined channel.
    pub fn access_token(topic: &str, token: &str, msg_ref: String) -> Self {
        Self {
            topic: topic.to_string(),
            event: EVENT_ACCESS_TOKEN.to_string(),
            payload: json!({ "access_token": token }),
            msg_ref: Some(msg_ref),
            join_ref: None,
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Change {
        topic: String,
        event: ChangeEvent,
    },
    Reply {
        topic: String,
        msg_ref: Option<String>,
        ok: bool,
        response: Value,
    },
    ChannelError {
        topic: String,
    },
    ChannelClosed {
        topic: String,
    },
    System {
        topic: String,
        ok: bool,
        message: String,
    },
    Other {
        topic: String,
        event: String,
    },
}

#[derive(Debug, Deserialize)]
struct ChangePayload {
    data: ChangeEvent,
}

/// Parse one text frame.
pub fn decode(text: &str) -> Result<InboundFrame> {
    let message: PhoenixMessage = serde_json::from_str(text)?;
    let PhoenixMessage {
        topic,
        event,
        payload,
        msg_ref,
        ..
    } = message;

    let frame = match event.as_str() {
        EVENT_POSTGRES_CHANGES => {
            let ChangePayload { data } = serde_json::from_value(payload)?;
            InboundFrame::Change { topic, event: data }
        }
        EVENT_REPLY => InboundFrame::Reply {
            topic,
            msg_ref,
            ok: status_ok(&payload),
            response: payload.get("response").cloned().unwrap_or(Value::Null),
        },
        EVENT_ERROR => InboundFrame::ChannelError { topic },
        EVENT_CLOSE => InboundFrame::ChannelClosed { topic },
        EVENT_SYSTEM => InboundFrame::System {
            topic,
            ok: status_ok(&payload),
            message: payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        _ => InboundFrame::Other { topic, event },
    };
    Ok(frame)
}

fn status_ok(payload: &Value) -> bool {
    payload.get("status").and_then(Value::as_str) == Some("ok")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::ChangeKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn join_frame_carries_postgres_changes_config() {
        let filter = ChangeFilter::table("comments")
            .on(ChangeKind::Insert)
            .eq("post_id", "p-1");
        let frame = PhoenixMessage::join(&filter.topic(), &filter, Some("jwt"), "3".to_string());
        let encoded: Value = serde_json::from_str(&frame.encode().unwrap()).unwrap();

        assert_eq!(encoded["event"], "phx_join");
        assert_eq!(encoded["ref"], "3");
        assert_eq!(encoded["join_ref"], "3");
        assert_eq!(encoded["payload"]["access_token"], "jwt");
        assert_eq!(
            encoded["payload"]["config"]["postgres_changes"],
            json!([{
                "event": "INSERT",
                "schema": "public",
                "table": "comments",
                "filter": "post_id=eq.p-1",
            }])
        );
    }

    #[test]
    fn heartbeat_uses_phoenix_topic() {
        let encoded = PhoenixMessage::heartbeat("9".to_string()).encode().unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["topic"], "phoenix");
        assert_eq!(value["event"], "heartbeat");
    }

    #[test]
    fn decodes_postgres_change() {
        let raw = r#"{
            "topic": "realtime:public:messages:*:conversation_id=eq.7",
            "event": "postgres_changes",
            "ref": null,
            "payload": {
                "data": {
                    "schema": "public",
                    "table": "messages",
                    "commit_timestamp": "2025-03-01T10:15:30.123Z",
                    "type": "INSERT",
                    "columns": [],
                    "errors": null,
                    "record": {"id": "m-1", "content": "hello"}
                },
                "ids": [12345]
            }
        }"#;

        let InboundFrame::Change { topic, event } = decode(raw).unwrap() else {
            panic!("expected a change frame");
        };
        assert_eq!(topic, "realtime:public:messages:*:conversation_id=eq.7");
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.record["content"], "hello");
        assert!(event.old_record.is_null());
        assert!(event.commit_timestamp.is_some());
    }

    #[test]
    fn decodes_replies_and_system_frames() {
        let reply = r#"{"topic":"phoenix","event":"phx_reply","ref":"4","payload":{"status":"ok","response":{}}}"#;
        assert_eq!(
            decode(reply).unwrap(),
            InboundFrame::Reply {
                topic: "phoenix".to_string(),
                msg_ref: Some("4".to_string()),
                ok: true,
                response: json!({}),
            }
        );

        let system = r#"{"topic":"realtime:x","event":"system","ref":null,"payload":{"status":"error","message":"bad filter","extension":"postgres_changes"}}"#;
        assert_eq!(
            decode(system).unwrap(),
            InboundFrame::System {
                topic: "realtime:x".to_string(),
                ok: false,
                message: "bad filter".to_string(),
            }
        );

        let presence = r#"{"topic":"realtime:x","event":"presence_state","payload":{}}"#;
        assert!(matches!(decode(presence).unwrap(), InboundFrame::Other { .. }));
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(decode("not json").is_err());
    }
}
