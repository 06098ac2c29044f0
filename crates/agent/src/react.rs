//! ReAct reasoning strategy — Think → Act → Observe.
//!
//! Each step drives one streamed think call. A final-answer chunk ends the
//! run; a tool-call chunk invokes the tool, folds the observation into
//! memory, and hands the executor a rebuilt transcript as the next step's
//! context — so each tool call consumes exactly one outer step.
//!
//! Reasoning failures are conversational, not fatal: an error from the
//! think stream becomes a finished thought carrying the error text.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use falconer_core::error::EngineError;
use falconer_core::message::Message;
use falconer_core::provider::{Provider, StopReason, ThinkRequest, ToolCallRequest};
use falconer_core::step::{StepContext, StepResult};
use falconer_core::tool::{Action, ToolInvoker, ToolRegistry};
use falconer_memory::{MemoryStore, RecallQuery};

use crate::executor::StepStrategy;

/// Accumulated think output for one step. Ephemeral: only the derived
/// memory entries survive the step.
#[derive(Debug, Clone, Default)]
pub struct Thought {
    /// Accumulated reasoning text
    pub text: String,

    /// Requested tool call, when the model wants to act
    pub next_action: Option<ToolCallRequest>,

    /// Whether this thought ends the task
    pub finished: bool,
}

/// The ReAct strategy: streaming think, tool dispatch, memory replay.
pub struct ReactStrategy {
    provider: Arc<dyn Provider>,
    invoker: ToolInvoker,
    memory: Arc<MemoryStore>,
    system_prompt: Option<String>,
    tool_definitions: Vec<falconer_core::provider::ToolDefinition>,
}

impl ReactStrategy {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<ToolRegistry>,
        memory: Arc<MemoryStore>,
    ) -> Self {
        let tool_definitions = registry.definitions();
        Self {
            provider,
            invoker: ToolInvoker::new(registry),
            memory,
            system_prompt: None,
            tool_definitions,
        }
    }

    /// Set the system prompt sent with every think request.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    fn build_request(&self, context: StepContext) -> ThinkRequest {
        let mut request = match context {
            StepContext::Text(text) => ThinkRequest::from_prompt(text),
            StepContext::Messages(messages) => ThinkRequest::from_messages(messages),
        };
        request.system = self.system_prompt.clone();
        request.tools = self.tool_definitions.clone();
        request
    }

    fn build_action(call: ToolCallRequest) -> Action {
        let description = call.name.clone();
        Action {
            id: call.id,
            name: call.name,
            parameters: call.parameters,
            description,
            priority: 0,
        }
    }

    fn step_metadata(step: u32) -> serde_json::Map<String, serde_json::Value> {
        let mut metadata = serde_json::Map::new();
        metadata.insert("step".into(), json!(step));
        metadata
    }

    /// Rebuild the model-facing transcript from this task's memory:
    /// user input → thoughts → action/result pairs, in insertion order.
    async fn replay_messages(&self, step: u32) -> Vec<Message> {
        let history = self
            .memory
            .recall(RecallQuery::last(step as usize + 1))
            .await;

        let mut messages = Vec::new();
        for entry in history {
            match entry.kind.as_str() {
                "user" => {
                    messages.push(Message::user(entry.payload.as_str().unwrap_or_default()));
                }
                "thought" => {
                    messages.push(Message::assistant(
                        entry.payload.as_str().unwrap_or_default(),
                    ));
                }
                "action" => {
                    let action = &entry.payload["action"];
                    let result = &entry.payload["result"];
                    let action_id = action["id"].as_str().unwrap_or_default().to_string();
                    messages.push(Message::action_call(action.to_string()));
                    messages.push(Message::action_result(action_id, result.to_string()));
                }
                other => {
                    debug!(kind = other, "skipping non-transcript memory entry");
                }
            }
        }
        messages
    }
}

#[async_trait]
impl StepStrategy for ReactStrategy {
    async fn step(
        &mut self,
        step: u32,
        context: StepContext,
        results: mpsc::Sender<StepResult>,
    ) -> Result<(), EngineError> {
        let request = self.build_request(context);

        let mut stream = match self.provider.think(request).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "think request failed");
                let _ = results
                    .send(StepResult::finished(format!("thinking failed: {e}")))
                    .await;
                return Ok(());
            }
        };

        let mut thought = Thought::default();

        while let Some(item) = stream.recv().await {
            let chunk = match item {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!(error = %e, "think stream failed");
                    let _ = results
                        .send(StepResult::finished(format!("thinking failed: {e}")))
                        .await;
                    return Ok(());
                }
            };

            thought.text.push_str(&chunk.text);

            match chunk.stop_reason {
                Some(StopReason::EndTurn) => {
                    thought.finished = true;
                    self.memory
                        .remember(json!(thought.text), "thought", Self::step_metadata(step))
                        .await;
                    let _ = results.send(StepResult::finished(chunk.text)).await;
                    return Ok(());
                }
                Some(StopReason::ToolUse) => {
                    thought.next_action = chunk.tool_call;
                    let Some(call) = thought.next_action.clone() else {
                        warn!("tool_use chunk carried no tool call");
                        let _ = results
                            .send(StepResult::finished(
                                "thinking failed: tool_use chunk carried no tool call",
                            ))
                            .await;
                        return Ok(());
                    };

                    let action = Self::build_action(call);
                    debug!(tool = %action.name, step, "invoking tool");
                    let result = self.invoker.invoke(&action).await;

                    self.memory
                        .remember(
                            json!({
                                "thought": thought.text,
                                "action": action,
                                "result": result,
                            }),
                            "action",
                            Self::step_metadata(step),
                        )
                        .await;

                    let replay = self.replay_messages(step).await;
                    let _ = results
                        .send(StepResult::with_next_context(
                            format!("\n[action] {}\n", action.name),
                            StepContext::Messages(replay),
                        ))
                        .await;
                    return Ok(());
                }
                None => {
                    if !chunk.text.is_empty() {
                        let _ = results.send(StepResult::chunk(chunk.text)).await;
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedProvider, tool_call};
    use falconer_core::error::{ProviderError, ToolError};
    use falconer_core::provider::ThinkChunk;
    use falconer_core::tool::Tool;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            json!({ "type": "object", "properties": { "text": { "type": "string" } } })
        }
        async fn execute(
            &self,
            params: serde_json::Map<String, serde_json::Value>,
        ) -> Result<serde_json::Value, ToolError> {
            let text = params.get("text").and_then(|v| v.as_str()).unwrap_or("");
            Ok(json!(text))
        }
    }

    fn registry_with_echo() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        Arc::new(registry)
    }

    async fn run_step(strategy: &mut ReactStrategy, step: u32, context: StepContext) -> Vec<StepResult> {
        let (tx, mut rx) = mpsc::channel(32);
        strategy.step(step, context, tx).await.unwrap();
        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results
    }

    #[tokio::test]
    async fn end_turn_finishes_and_persists_thought() {
        let memory = Arc::new(MemoryStore::new(100));
        let provider = Arc::new(ScriptedProvider::single_answer("hi"));
        let mut strategy = ReactStrategy::new(provider, registry_with_echo(), memory.clone());

        let results = run_step(&mut strategy, 1, "hello".into()).await;

        assert_eq!(results.len(), 1);
        assert!(results[0].finished);
        assert_eq!(results[0].output.as_deref(), Some("hi"));

        let thoughts = memory.recall(RecallQuery::kind("thought")).await;
        assert_eq!(thoughts.len(), 1);
        assert_eq!(thoughts[0].payload, json!("hi"));
        assert_eq!(thoughts[0].metadata.get("step"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn partial_chunks_stream_before_the_answer() {
        let memory = Arc::new(MemoryStore::new(100));
        let provider = Arc::new(ScriptedProvider::sequence(vec![vec![
            Ok(ThinkChunk::text("thinking ")),
            Ok(ThinkChunk::text("out loud... ")),
            Ok(ThinkChunk::end_turn("done")),
        ]]));
        let mut strategy = ReactStrategy::new(provider, registry_with_echo(), memory.clone());

        let results = run_step(&mut strategy, 1, "hello".into()).await;

        let outputs: Vec<_> = results.iter().filter_map(|r| r.output.as_deref()).collect();
        assert_eq!(outputs, vec!["thinking ", "out loud... ", "done"]);
        assert!(results.last().unwrap().finished);

        // The persisted thought is the full accumulation.
        let thoughts = memory.recall(RecallQuery::kind("thought")).await;
        assert_eq!(thoughts[0].payload, json!("thinking out loud... done"));
    }

    #[tokio::test]
    async fn tool_call_rewires_context_with_replay() {
        let memory = Arc::new(MemoryStore::new(100));
        memory
            .remember(json!("say hi"), "user", serde_json::Map::new())
            .await;

        let provider = Arc::new(ScriptedProvider::tool_then_answer(
            tool_call("echo", json!({"text": "hi"})),
            "I should echo",
            "echoed",
        ));
        let mut strategy = ReactStrategy::new(provider, registry_with_echo(), memory.clone());

        let results = run_step(&mut strategy, 1, "say hi".into()).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].output.as_deref(), Some("\n[action] echo\n"));
        assert!(!results[0].finished);

        // The next context replays user → action call → action result.
        let Some(StepContext::Messages(ref messages)) = results[0].next_context else {
            panic!("expected a messages context");
        };
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "say hi");
        assert!(messages[1].tool_call.as_deref().unwrap().contains("echo"));
        assert_eq!(messages[2].tool_call_id.as_deref(), Some("call_echo"));
        assert!(messages[2].content.contains("\"success\":true"));

        // One combined action entry was persisted.
        let actions = memory.recall(RecallQuery::kind("action")).await;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].payload["result"]["success"], json!(true));
        assert_eq!(actions[0].payload["thought"], json!("I should echo"));
    }

    #[tokio::test]
    async fn unknown_tool_is_a_recoverable_failure() {
        let memory = Arc::new(MemoryStore::new(100));
        let provider = Arc::new(ScriptedProvider::sequence(vec![vec![Ok(
            ThinkChunk::tool_use("trying foo", tool_call("foo", json!({}))),
        )]]));
        let mut strategy = ReactStrategy::new(provider, registry_with_echo(), memory.clone());

        let results = run_step(&mut strategy, 1, "use foo".into()).await;

        // The step continues (not finished) with the failure folded into memory.
        assert!(!results[0].finished);
        let actions = memory.recall(RecallQuery::kind("action")).await;
        assert_eq!(actions[0].payload["result"]["success"], json!(false));
        assert_eq!(
            actions[0].payload["result"]["error"],
            json!("unknown tool: foo")
        );
    }

    #[tokio::test]
    async fn think_stream_error_becomes_a_finished_thought() {
        let memory = Arc::new(MemoryStore::new(100));
        let provider = Arc::new(ScriptedProvider::sequence(vec![vec![
            Ok(ThinkChunk::text("partial")),
            Err(ProviderError::StreamInterrupted("connection reset".into())),
        ]]));
        let mut strategy = ReactStrategy::new(provider, registry_with_echo(), memory);

        let results = run_step(&mut strategy, 1, "hello".into()).await;

        let last = results.last().unwrap();
        assert!(last.finished);
        assert!(last.output.as_deref().unwrap().contains("thinking failed"));
        assert!(last.output.as_deref().unwrap().contains("connection reset"));
    }
}
