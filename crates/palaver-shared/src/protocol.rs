//! Event names and payloads carried over the push channel.

use serde::{Deserialize, Serialize};

use crate::models::Message;
use crate::types::UserId;

/// Server -> client: a new message was delivered.
pub const EVENT_NEW_MESSAGE: &str = "new-message";

/// Client -> server: the local user started typing to a partner.
pub const EVENT_TYPING: &str = "typing";

/// Client -> server: the local user stopped typing.
pub const EVENT_STOP_TYPING: &str = "stop-typing";

/// Payload of a `new-message` push event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewMessagePayload {
    pub sender_id: UserId,
    pub message: Message,
}

/// Payload of an outbound `typing` / `stop-typing` signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub receiver_id: UserId,
}
