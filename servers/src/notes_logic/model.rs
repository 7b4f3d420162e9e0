use lib_notes::{BroadcastEvent, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name a client sends to submit a note over the WebSocket.
pub const ADD_EVENT: &str = "add";
/// Event name of replies describing a rejected submission.
pub const ERROR_EVENT: &str = "error";

/// Inbound WebSocket frame: `{"event": "add", "data": "<text>"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientMessage {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Outbound WebSocket frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerMessage {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServerMessage {
    pub fn from_event(event: &BroadcastEvent) -> Self {
        Self {
            event: event.event.clone(),
            data: Some(event.data.clone()),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            event: ERROR_EVENT.to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}
