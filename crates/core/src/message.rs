//! Message domain types.
//!
//! Messages are the replay transcript the reasoning loop hands back to the
//! model: the user's input, accumulated thoughts, and action/result pairs,
//! rebuilt from memory each time a tool call completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// The end user (also carries tool results back to the model)
    User,
    /// The model
    Assistant,
}

/// A single message in a model-facing transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content (empty for pure tool-call messages)
    pub content: String,

    /// Serialized action, when this assistant message requests a tool call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<String>,

    /// If this message carries a tool result, the action ID it answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_call: None,
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create an assistant message requesting a tool call.
    pub fn action_call(serialized_action: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Assistant, "");
        msg.tool_call = Some(serialized_action.into());
        msg
    }

    /// Create a message carrying a tool result back to the model.
    pub fn action_result(action_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::User, content);
        msg.tool_call_id = Some(action_id.into());
        msg
    }
}
