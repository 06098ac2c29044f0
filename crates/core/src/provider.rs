//! Provider trait — the abstraction over streaming model backends.
//!
//! A Provider knows how to send a think request to a model and stream back
//! chunks: text fragments plus, eventually, a stop reason and possibly a
//! tool-call request. The reasoning loop consumes this stream without
//! knowing which backend is behind it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::Message;

/// A tool definition sent to the model so it knows what it can call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

/// A think request: either a bare prompt or a full message transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkRequest {
    /// Single-shot prompt (used when `messages` is empty)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Message transcript (takes precedence over `prompt` when non-empty)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,

    /// System prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Tools the model may request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

impl ThinkRequest {
    /// Build a request from a bare prompt.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            messages: Vec::new(),
            system: None,
            tools: Vec::new(),
        }
    }

    /// Build a request from a message transcript.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            prompt: None,
            messages,
            system: None,
            tools: Vec::new(),
        }
    }
}

/// Why the model stopped producing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model requests a tool invocation
    ToolUse,
    /// The model produced its final answer
    EndTurn,
}

/// A tool-call request embedded in a think chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Unique ID for this call
    pub id: String,

    /// Name of the requested tool
    pub name: String,

    /// Structured parameters
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

/// A single chunk in a think stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkChunk {
    /// Text fragment (may be empty on pure control chunks)
    #[serde(default)]
    pub text: String,

    /// Set on the chunk that ends the stream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,

    /// Present when `stop_reason` is `ToolUse`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCallRequest>,
}

impl ThinkChunk {
    /// A plain text fragment.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stop_reason: None,
            tool_call: None,
        }
    }

    /// A final-answer chunk.
    pub fn end_turn(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stop_reason: Some(StopReason::EndTurn),
            tool_call: None,
        }
    }

    /// A tool-call chunk.
    pub fn tool_use(text: impl Into<String>, call: ToolCallRequest) -> Self {
        Self {
            text: text.into(),
            stop_reason: Some(StopReason::ToolUse),
            tool_call: Some(call),
        }
    }
}

/// The core Provider trait.
///
/// Every model backend implements this. `think` returns a channel receiver;
/// awaiting each chunk is a suspension point, which is what lets the step
/// executor cancel an in-flight step by dropping the future that reads it.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider.
    fn name(&self) -> &str;

    /// Send a think request and stream back chunks.
    async fn think(
        &self,
        request: ThinkRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<ThinkChunk, ProviderError>>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn think_request_from_prompt() {
        let req = ThinkRequest::from_prompt("review this diff");
        assert_eq!(req.prompt.as_deref(), Some("review this diff"));
        assert!(req.messages.is_empty());
    }

    #[test]
    fn chunk_constructors_set_stop_reason() {
        assert!(ThinkChunk::text("partial").stop_reason.is_none());
        assert_eq!(
            ThinkChunk::end_turn("done").stop_reason,
            Some(StopReason::EndTurn)
        );

        let call = ToolCallRequest {
            id: "call_1".into(),
            name: "search".into(),
            parameters: serde_json::Map::new(),
        };
        let chunk = ThinkChunk::tool_use("using search", call);
        assert_eq!(chunk.stop_reason, Some(StopReason::ToolUse));
        assert_eq!(chunk.tool_call.unwrap().name, "search");
    }

    #[test]
    fn tool_definition_serialization() {
        let tool = ToolDefinition {
            name: "get_diff".into(),
            description: "Fetch the current working diff".into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string" }
                }
            }),
        };
        let json = serde_json::to_string(&tool).unwrap();
        assert!(json.contains("get_diff"));
        assert!(json.contains("path"));
    }
}
