//! Transport abstraction — the request/response seam to a tool provider.
//!
//! A transport carries four request kinds: the `initialize` handshake,
//! tool listing, tool invocation, and prompt-template rendering. Every
//! response is a normalized content list, so callers never see a
//! provider's raw wire format.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use falconer_core::error::SessionError;

/// Parameters for launching a tool-provider process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchParams {
    /// Command to execute
    pub command: String,

    /// Command arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables (merged over the inherited environment)
    #[serde(default)]
    pub env: Vec<(String, String)>,
}

impl LaunchParams {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: Vec::new(),
        }
    }
}

/// A request sent over a provider transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportRequest {
    /// Protocol handshake; must be the first request on a session
    Initialize,
    /// List the tools this provider exposes
    ListTools,
    /// Invoke a tool by name
    CallTool {
        name: String,
        #[serde(default)]
        arguments: serde_json::Map<String, Value>,
    },
    /// Render a prompt template by name
    GetPrompt {
        name: String,
        #[serde(default)]
        variables: serde_json::Map<String, Value>,
    },
}

/// One piece of normalized response content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
    Structured { value: Value },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }

    pub fn structured(value: Value) -> Self {
        Content::Structured { value }
    }

    /// The text of this content item, if it is (or carries) text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text { text } => Some(text),
            Content::Structured { value } => value.as_str(),
        }
    }
}

/// A normalized transport response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportResponse {
    /// Response content items
    #[serde(default)]
    pub content: Vec<Content>,

    /// Whether the provider reported the request as failed
    #[serde(default)]
    pub is_error: bool,
}

impl TransportResponse {
    /// A successful response with the given content.
    pub fn ok(content: Vec<Content>) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    /// A provider-reported failure.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(message)],
            is_error: true,
        }
    }

    /// The first text content item, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|c| c.as_text())
    }
}

/// A live request/response channel to one tool provider.
///
/// `open` activates the channel after launch (starting the I/O pump);
/// `close` releases it. Both are separate from construction so the session
/// manager can stack-track every acquired resource.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Activate the transport. Called once by the session manager after
    /// launch; a failure here must leave the transport closeable.
    async fn open(&self) -> Result<(), SessionError>;

    /// Send a request and await the response.
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, SessionError>;

    /// Release the transport's resources.
    async fn close(&self) -> Result<(), SessionError>;
}

/// Launches transports for providers.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Launch a transport for the given provider.
    ///
    /// On `Err` the factory must not leave any resource acquired; once it
    /// returns `Ok`, releasing the transport is the caller's job.
    async fn launch(
        &self,
        provider_id: &str,
        params: &LaunchParams,
    ) -> Result<std::sync::Arc<dyn Transport>, SessionError>;
}
