use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{PollCode, Role};

/// Chat line of a poll. Append-only, independent of questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: uuid::Uuid,
    pub poll_code: PollCode,
    pub sender_name: String,
    pub sender_id: String,
    pub sender_role: Role,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewChatMessage {
    pub sender_name: String,
    pub sender_id: String,
    pub sender_role: Role,
    pub message: String,
}

impl ChatMessage {
    pub fn new(poll_code: PollCode, new_message: NewChatMessage) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            poll_code,
            sender_name: new_message.sender_name,
            sender_id: new_message.sender_id,
            sender_role: new_message.sender_role,
            message: new_message.message,
            timestamp: Utc::now(),
        }
    }
}
