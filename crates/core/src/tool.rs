//! Tool trait, registry, and invoker — the tool-call protocol.
//!
//! Tools are what let the agent act: fetch a diff, query a knowledge base,
//! post a comment. The registry validates and indexes tool descriptors; the
//! invoker dispatches a single [`Action`] and normalizes the outcome into an
//! [`ActionResult`] — it never raises, because one failed tool must not
//! abort the reasoning loop.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// A single tool invocation request, immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Call ID (matches the model's tool-call id)
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Structured parameters
    #[serde(default)]
    pub parameters: serde_json::Map<String, Value>,

    /// Human-readable description of the call
    pub description: String,

    /// Scheduling hint; unused by the invoker itself
    #[serde(default)]
    pub priority: i32,
}

/// The outcome of a tool invocation.
///
/// Exactly one of `result` / `error` is meaningful, gated by `success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// Whether the invocation succeeded
    pub success: bool,

    /// The tool's output, on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// The failure description, on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    /// A successful result.
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// A failed result.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// The core Tool trait.
///
/// Each tool implements this and is registered in the [`ToolRegistry`].
/// Local tools and session-backed remote tools share the same signature:
/// structured parameters in, value or error out.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool.
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given parameters.
    async fn execute(&self, params: serde_json::Map<String, Value>) -> Result<Value, ToolError>;

    /// Convert this tool into a definition for the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Whether a parameter schema is self-contained: no `$ref` indirection at
/// any depth, checked through nested maps and sequences.
fn schema_is_self_contained(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            if map.contains_key("$ref") {
                return false;
            }
            map.values().all(schema_is_self_contained)
        }
        Value::Array(items) => items.iter().all(schema_is_self_contained),
        _ => true,
    }
}

/// A registry of available tools, keyed by name.
///
/// Registration validates the parameter schema once; a schema carrying a
/// `$ref` fails validation and the tool is excluded from the active set.
/// Exclusion is a logged policy outcome, not an error — partial tool
/// availability must not abort agent startup.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Returns whether the tool was accepted.
    ///
    /// Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> bool {
        let schema = tool.parameters_schema();
        if !schema_is_self_contained(&schema) {
            warn!(
                tool = tool.name(),
                "tool schema contains a $ref, excluding from active set"
            );
            return false;
        }
        debug!(tool = tool.name(), "registered tool");
        self.tools.insert(tool.name().to_string(), tool);
        true
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Get all tool definitions (for sending to the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Dispatches a single action through the registry.
///
/// `invoke` never returns an error: an unknown tool or a failing handler
/// becomes a failed [`ActionResult`] the reasoning loop can fold back into
/// its transcript and keep going.
pub struct ToolInvoker {
    registry: Arc<ToolRegistry>,
}

impl ToolInvoker {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this invoker dispatches through.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Invoke a tool by the action's name and wrap the outcome.
    pub async fn invoke(&self, action: &Action) -> ActionResult {
        let Some(tool) = self.registry.get(&action.name) else {
            return ActionResult::failure(format!("unknown tool: {}", action.name));
        };

        match tool.execute(action.parameters.clone()).await {
            Ok(value) => ActionResult::ok(value),
            Err(e) => {
                warn!(tool = %action.name, error = %e, "tool invocation failed");
                ActionResult::failure(e.to_string())
            }
        }
    }
}
