//! Protocol sessions over a transport.
//!
//! A session is created by the manager after the transport is up; its
//! `initialize` handshake must succeed before it is handed to callers.
//! All round-trips return normalized content.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use falconer_core::error::SessionError;

use crate::transport::{Content, Transport, TransportRequest, TransportResponse};

/// A tool descriptor reported by a provider's `list_tools`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteToolSpec {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// The tool's parameter schema
    #[serde(default)]
    pub input_schema: Value,
}

/// A negotiated protocol session with one tool provider.
pub struct Session {
    provider_id: String,
    transport: Arc<dyn Transport>,
    closed: AtomicBool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("provider_id", &self.provider_id)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub(crate) fn new(provider_id: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            provider_id: provider_id.into(),
            transport,
            closed: AtomicBool::new(false),
        }
    }

    /// The provider this session belongs to.
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Mark the session closed. Further requests fail with
    /// [`SessionError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Perform the `initialize` handshake. Must be called (once) before any
    /// other request; the manager does this in `create_session`.
    pub(crate) async fn initialize(&self) -> Result<(), SessionError> {
        let response = self.round_trip(TransportRequest::Initialize).await?;
        if response.is_error {
            return Err(SessionError::HandshakeFailed {
                provider_id: self.provider_id.clone(),
                reason: response
                    .first_text()
                    .unwrap_or("provider rejected initialize")
                    .to_string(),
            });
        }
        debug!(provider_id = %self.provider_id, "session initialized");
        Ok(())
    }

    /// List the tools this provider exposes.
    pub async fn list_tools(&self) -> Result<Vec<RemoteToolSpec>, SessionError> {
        let response = self.round_trip(TransportRequest::ListTools).await?;
        if response.is_error {
            return Err(SessionError::RequestFailed(format!(
                "list_tools failed for provider {}",
                self.provider_id
            )));
        }

        let mut specs = Vec::new();
        for content in &response.content {
            if let Content::Structured { value } = content {
                match serde_json::from_value::<RemoteToolSpec>(value.clone()) {
                    Ok(spec) => specs.push(spec),
                    Err(e) => {
                        return Err(SessionError::RequestFailed(format!(
                            "malformed tool descriptor from provider {}: {e}",
                            self.provider_id
                        )));
                    }
                }
            }
        }
        Ok(specs)
    }

    /// Call a tool by name.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Map<String, Value>,
    ) -> Result<TransportResponse, SessionError> {
        self.round_trip(TransportRequest::CallTool {
            name: name.to_string(),
            arguments,
        })
        .await
    }

    /// Render a prompt template by name.
    pub async fn get_prompt(
        &self,
        name: &str,
        variables: serde_json::Map<String, Value>,
    ) -> Result<TransportResponse, SessionError> {
        self.round_trip(TransportRequest::GetPrompt {
            name: name.to_string(),
            variables,
        })
        .await
    }

    async fn round_trip(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed(self.provider_id.clone()));
        }
        self.transport.request(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Answers every request with a scripted response.
    struct ScriptedTransport {
        response: TransportResponse,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn open(&self) -> Result<(), SessionError> {
            Ok(())
        }
        async fn request(
            &self,
            _request: TransportRequest,
        ) -> Result<TransportResponse, SessionError> {
            Ok(self.response.clone())
        }
        async fn close(&self) -> Result<(), SessionError> {
            Ok(())
        }
    }

    fn session_with(response: TransportResponse) -> Session {
        Session::new("test_provider", Arc::new(ScriptedTransport { response }))
    }

    #[tokio::test]
    async fn initialize_succeeds_on_ok_response() {
        let session = session_with(TransportResponse::ok(vec![]));
        assert!(session.initialize().await.is_ok());
    }

    #[tokio::test]
    async fn initialize_fails_on_error_response() {
        let session = session_with(TransportResponse::error("unsupported version"));
        let err = session.initialize().await.unwrap_err();
        assert!(err.to_string().contains("unsupported version"));
    }

    #[tokio::test]
    async fn list_tools_parses_structured_descriptors() {
        let session = session_with(TransportResponse::ok(vec![Content::structured(
            serde_json::json!({
                "name": "get_diff",
                "description": "Fetch the working diff",
                "input_schema": { "type": "object", "properties": {} }
            }),
        )]));

        let specs = session.list_tools().await.unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "get_diff");
    }

    #[tokio::test]
    async fn get_prompt_returns_rendered_content() {
        let session = session_with(TransportResponse::ok(vec![Content::text(
            "Review the following diff against these standards",
        )]));

        let mut variables = serde_json::Map::new();
        variables.insert("standard".into(), serde_json::json!("no unwrap"));
        let response = session.get_prompt("review_prompt", variables).await.unwrap();

        assert!(!response.is_error);
        assert_eq!(
            response.first_text(),
            Some("Review the following diff against these standards")
        );
    }

    #[tokio::test]
    async fn closed_session_rejects_requests() {
        let session = session_with(TransportResponse::ok(vec![]));
        session.close();
        let err = session
            .call_tool("anything", serde_json::Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Closed(_)));
    }
}
