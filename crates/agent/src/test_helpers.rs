//! Shared test helpers for the reasoning-loop tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use falconer_core::error::ProviderError;
use falconer_core::provider::{Provider, ThinkChunk, ThinkRequest, ToolCallRequest};

type Script = Vec<Result<ThinkChunk, ProviderError>>;

/// A mock provider that streams scripted think chunks.
///
/// Each call to `think` consumes the next script in the queue; in
/// repeating mode the single script is served forever. Panics if a
/// sequential provider runs out of scripts.
pub struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    repeating: Option<Script>,
    calls: Mutex<usize>,
}

impl ScriptedProvider {
    pub fn sequence(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            repeating: None,
            calls: Mutex::new(0),
        }
    }

    /// Serve the same script on every think call.
    pub fn repeating(script: Script) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            repeating: Some(script),
            calls: Mutex::new(0),
        }
    }

    /// A provider that immediately answers with a final chunk.
    pub fn single_answer(text: &str) -> Self {
        Self::sequence(vec![vec![Ok(ThinkChunk::end_turn(text))]])
    }

    /// A provider that requests one tool call, then answers.
    pub fn tool_then_answer(call: ToolCallRequest, thought: &str, answer: &str) -> Self {
        Self::sequence(vec![
            vec![Ok(ThinkChunk::tool_use(thought, call))],
            vec![Ok(ThinkChunk::end_turn(answer))],
        ])
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn think(
        &self,
        _request: ThinkRequest,
    ) -> Result<mpsc::Receiver<Result<ThinkChunk, ProviderError>>, ProviderError> {
        *self.calls.lock().unwrap() += 1;

        let script = match &self.repeating {
            Some(script) => script.clone(),
            None => self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .expect("ScriptedProvider: no more scripts"),
        };

        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            for chunk in script {
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

/// Helper to build a tool-call request.
pub fn tool_call(name: &str, parameters: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest {
        id: format!("call_{name}"),
        name: name.to_string(),
        parameters: parameters
            .as_object()
            .cloned()
            .unwrap_or_default(),
    }
}
