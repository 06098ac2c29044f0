//! The composed agent.
//!
//! One struct holding a step executor, a memory store, and a pluggable
//! reasoning strategy. Specialized behaviors (session bootstrap, review
//! flows) are strategy implementations or callers, not subclasses.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::info;

use falconer_core::error::EngineError;
use falconer_core::state::AgentState;
use falconer_core::step::{RunOutcome, StepContext};
use falconer_memory::MemoryStore;

use crate::executor::{OutputSink, StepExecutor, StepStrategy};

/// An agent: executor + memory + strategy, explicitly constructed and
/// passed its dependencies by the entry point.
pub struct Agent {
    executor: StepExecutor,
    memory: Arc<MemoryStore>,
    strategy: Box<dyn StepStrategy>,
}

impl Agent {
    pub fn new(strategy: Box<dyn StepStrategy>, memory: Arc<MemoryStore>) -> Self {
        Self {
            executor: StepExecutor::new(10, Duration::from_secs(30)),
            memory,
            strategy,
        }
    }

    /// Set the maximum number of steps per run.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.executor = StepExecutor::new(max_steps, self.executor.timeout());
        self
    }

    /// Set the per-step deadline.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.executor = StepExecutor::new(self.executor.max_steps(), timeout);
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AgentState {
        self.executor.state()
    }

    /// The memory store backing this agent.
    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    /// Run the agent on an input, streaming text chunks into the sink.
    ///
    /// The run ends with either the task-complete marker or the step-limit
    /// guidance block; fatal failures return `Err` and leave the agent in
    /// the `Error` state.
    pub async fn run(
        &mut self,
        input: &str,
        output: &OutputSink,
    ) -> Result<RunOutcome, EngineError> {
        info!(state = %self.state(), "agent run starting");
        self.memory
            .remember(json!(input), "user", serde_json::Map::new())
            .await;
        self.executor
            .execute(
                self.strategy.as_mut(),
                StepContext::Text(input.to_string()),
                output,
            )
            .await
    }

    /// Shut the agent down: terminal `Stopped` state plus memory cleanup.
    pub async fn stop(&mut self) {
        self.executor.stop();
        self.memory.clear().await;
        info!("agent stopped");
    }
}
