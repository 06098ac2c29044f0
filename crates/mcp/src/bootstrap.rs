//! Wiring remote provider tools into the agent's registry.
//!
//! For each configured provider: connect, create a session, list the
//! remote tools, and register a [`SessionTool`] wrapper for each one. A
//! provider that fails to come up is logged and skipped — partial tool
//! availability must not abort agent startup.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use falconer_core::error::ToolError;
use falconer_core::tool::{Tool, ToolRegistry};

use crate::manager::SessionManager;
use crate::session::{RemoteToolSpec, Session};
use crate::transport::LaunchParams;

/// Launch configuration for one tool provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderLaunchConfig {
    /// Provider ID (unique per connection)
    pub id: String,

    /// Command to run
    pub command: String,

    /// Arguments; `${VAR}` references are substituted from the environment
    #[serde(default)]
    pub args: Vec<String>,
}

/// Substitute `${VAR}` references from the process environment.
///
/// Unknown variables are left untouched, so a provider can also receive
/// literal `${...}` text.
pub fn substitute_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        match tail.find('}') {
            Some(end) => {
                let var = &tail[..end];
                match std::env::var(var) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => {
                        out.push_str("${");
                        out.push_str(var);
                        out.push('}');
                    }
                }
                rest = &tail[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Resolve a command to an executable path: keep absolute/existing paths,
/// otherwise search `PATH`. Unresolvable commands are returned as-is and
/// left for the transport launch to report.
pub fn resolve_command(command: &str) -> String {
    let direct = Path::new(command);
    if direct.is_file() {
        return command.to_string();
    }

    if let Ok(path) = std::env::var("PATH") {
        for dir in std::env::split_paths(&path) {
            let candidate = dir.join(command);
            if candidate.is_file() {
                return candidate.to_string_lossy().into_owned();
            }
        }
    }

    command.to_string()
}

/// A remote tool exposed through a provider session.
///
/// Implements the core [`Tool`] trait so session-backed tools and local
/// tools are indistinguishable to the registry and the reasoning loop.
pub struct SessionTool {
    name: String,
    description: String,
    schema: Value,
    session: Arc<Session>,
}

impl SessionTool {
    pub fn new(spec: RemoteToolSpec, session: Arc<Session>) -> Self {
        Self {
            name: spec.name,
            description: spec.description,
            schema: spec.input_schema,
            session,
        }
    }
}

#[async_trait]
impl Tool for SessionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, params: serde_json::Map<String, Value>) -> Result<Value, ToolError> {
        let response = self
            .session
            .call_tool(&self.name, params)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name.clone(),
                reason: e.to_string(),
            })?;

        if response.is_error {
            return Err(ToolError::ExecutionFailed {
                tool_name: self.name.clone(),
                reason: response
                    .first_text()
                    .unwrap_or("provider reported an error")
                    .to_string(),
            });
        }

        match response.first_text() {
            Some(text) => Ok(Value::String(text.to_string())),
            None => Ok(response
                .content
                .first()
                .map(|c| match c {
                    crate::transport::Content::Structured { value } => value.clone(),
                    crate::transport::Content::Text { text } => Value::String(text.clone()),
                })
                .unwrap_or(Value::Null)),
        }
    }
}

/// Connect every configured provider, create its session, and register its
/// tools. Returns the number of tools accepted into the registry.
///
/// Per-provider failures (launch, handshake, listing) are logged and the
/// provider is skipped.
pub async fn bootstrap(
    manager: &SessionManager,
    configs: &[ProviderLaunchConfig],
    registry: &mut ToolRegistry,
) -> usize {
    let mut registered = 0;

    for config in configs {
        let command = resolve_command(&config.command);
        let args: Vec<String> = config.args.iter().map(|a| substitute_env_vars(a)).collect();
        let params = LaunchParams::new(command, args);

        if let Err(e) = manager.connect(&config.id, &params).await {
            warn!(provider_id = %config.id, error = %e, "skipping provider: connect failed");
            continue;
        }

        let session = match manager.create_session(&config.id).await {
            Ok(session) => session,
            Err(e) => {
                warn!(provider_id = %config.id, error = %e, "skipping provider: session failed");
                continue;
            }
        };

        let specs = match session.list_tools().await {
            Ok(specs) => specs,
            Err(e) => {
                warn!(provider_id = %config.id, error = %e, "skipping provider: list_tools failed");
                continue;
            }
        };

        for spec in specs {
            let tool = SessionTool::new(spec, session.clone());
            if registry.register(Arc::new(tool)) {
                registered += 1;
            }
        }

        info!(provider_id = %config.id, "provider tools registered");
    }

    registered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{
        Content, Transport, TransportFactory, TransportRequest, TransportResponse,
    };
    use falconer_core::error::SessionError;
    use falconer_core::tool::{Action, ToolInvoker};

    #[test]
    fn substitutes_known_vars() {
        // Set an env var unique to this test.
        unsafe { std::env::set_var("FALCONER_TEST_ROOT", "/opt/falconer") };
        assert_eq!(
            substitute_env_vars("${FALCONER_TEST_ROOT}/servers/main.py"),
            "/opt/falconer/servers/main.py"
        );
    }

    #[test]
    fn leaves_unknown_vars_untouched() {
        assert_eq!(
            substitute_env_vars("--path=${NO_SUCH_VAR_HERE}"),
            "--path=${NO_SUCH_VAR_HERE}"
        );
    }

    #[test]
    fn leaves_unterminated_reference_untouched() {
        assert_eq!(substitute_env_vars("broken ${TAIL"), "broken ${TAIL");
    }

    /// A provider exposing two tools, one with a `$ref` schema.
    struct ToolServerTransport;

    #[async_trait]
    impl Transport for ToolServerTransport {
        async fn open(&self) -> Result<(), SessionError> {
            Ok(())
        }

        async fn request(
            &self,
            request: TransportRequest,
        ) -> Result<TransportResponse, SessionError> {
            match request {
                TransportRequest::Initialize => Ok(TransportResponse::ok(vec![])),
                TransportRequest::ListTools => Ok(TransportResponse::ok(vec![
                    Content::structured(serde_json::json!({
                        "name": "get_diff",
                        "description": "Fetch the working diff",
                        "input_schema": { "type": "object", "properties": {} }
                    })),
                    Content::structured(serde_json::json!({
                        "name": "ref_tool",
                        "description": "Uses a $ref schema",
                        "input_schema": {
                            "type": "object",
                            "properties": { "x": { "$ref": "#/defs/x" } }
                        }
                    })),
                ])),
                TransportRequest::CallTool { name, .. } => Ok(TransportResponse::ok(vec![
                    Content::text(format!("{name} output")),
                ])),
                TransportRequest::GetPrompt { .. } => Ok(TransportResponse::ok(vec![])),
            }
        }

        async fn close(&self) -> Result<(), SessionError> {
            Ok(())
        }
    }

    struct ToolServerFactory;

    #[async_trait]
    impl TransportFactory for ToolServerFactory {
        async fn launch(
            &self,
            _provider_id: &str,
            _params: &LaunchParams,
        ) -> Result<Arc<dyn Transport>, SessionError> {
            Ok(Arc::new(ToolServerTransport))
        }
    }

    #[tokio::test]
    async fn bootstrap_registers_valid_tools_only() {
        let manager = SessionManager::new(Arc::new(ToolServerFactory));
        let mut registry = ToolRegistry::new();

        let configs = vec![ProviderLaunchConfig {
            id: "code_review".into(),
            command: "review-server".into(),
            args: vec![],
        }];

        let count = bootstrap(&manager, &configs, &mut registry).await;

        // ref_tool is excluded by schema validation.
        assert_eq!(count, 1);
        assert!(registry.get("get_diff").is_some());
        assert!(registry.get("ref_tool").is_none());
    }

    #[tokio::test]
    async fn session_tool_invokes_through_the_session() {
        let manager = SessionManager::new(Arc::new(ToolServerFactory));
        let mut registry = ToolRegistry::new();
        let configs = vec![ProviderLaunchConfig {
            id: "code_review".into(),
            command: "review-server".into(),
            args: vec![],
        }];
        bootstrap(&manager, &configs, &mut registry).await;

        let invoker = ToolInvoker::new(Arc::new(registry));
        let result = invoker
            .invoke(&Action {
                id: "act_1".into(),
                name: "get_diff".into(),
                parameters: serde_json::Map::new(),
                description: "get_diff".into(),
                priority: 0,
            })
            .await;

        assert!(result.success);
        assert_eq!(result.result.unwrap(), Value::String("get_diff output".into()));
    }

    /// A factory that always fails to launch.
    struct BrokenFactory;

    #[async_trait]
    impl TransportFactory for BrokenFactory {
        async fn launch(
            &self,
            provider_id: &str,
            _params: &LaunchParams,
        ) -> Result<Arc<dyn Transport>, SessionError> {
            Err(SessionError::ConnectFailed {
                provider_id: provider_id.to_string(),
                reason: "binary not found".into(),
            })
        }
    }

    #[tokio::test]
    async fn bootstrap_skips_failing_providers() {
        let manager = SessionManager::new(Arc::new(BrokenFactory));
        let mut registry = ToolRegistry::new();
        let configs = vec![ProviderLaunchConfig {
            id: "broken".into(),
            command: "missing".into(),
            args: vec![],
        }];

        let count = bootstrap(&manager, &configs, &mut registry).await;
        assert_eq!(count, 0);
        assert!(registry.is_empty());
    }
}
