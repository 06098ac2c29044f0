//! The step executor — a bounded state machine around the reasoning loop.
//!
//! Streaming emission, a hard per-step deadline, and a step ceiling
//! together bound both latency and runaway-loop risk without requiring the
//! agent's reasoning to be trustworthy. The executor validates every
//! result a step emits and forwards its output immediately; it never
//! buffers a step's stream.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use falconer_core::error::EngineError;
use falconer_core::state::AgentState;
use falconer_core::step::{RunOutcome, StepContext, StepResult};

/// The caller-facing stream of output text chunks.
pub type OutputSink = mpsc::UnboundedSender<String>;

/// One bounded unit of reasoning work.
///
/// A strategy emits [`StepResult`]s through the channel as it works; the
/// executor drains and validates them concurrently. Returning rewires
/// nothing by itself — control flow is carried entirely by the emitted
/// results (`finished`, `next_context`).
#[async_trait]
pub trait StepStrategy: Send {
    async fn step(
        &mut self,
        step: u32,
        context: StepContext,
        results: mpsc::Sender<StepResult>,
    ) -> Result<(), EngineError>;
}

fn step_limit_guidance(max_steps: u32) -> String {
    format!(
        "\n[error] task exceeded the maximum step limit ({max_steps} steps); consider:\n\
         1. splitting the problem into smaller parts\n\
         2. giving more explicit instructions\n\
         3. raising max_steps if the task genuinely needs more room\n"
    )
}

enum StepDisposition {
    Finished,
    Continue { next_context: Option<StepContext> },
}

/// Drives the bounded step loop: Ready → Running → {Error, Stopped}.
///
/// Fatal failures (invalid state, step timeout, contract violation, or any
/// error a strategy returns) move the executor to `Error` and propagate;
/// it is not usable again without reconstruction. Step-limit exhaustion is
/// a normal outcome, reported through the output stream.
pub struct StepExecutor {
    max_steps: u32,
    step_timeout: Duration,
    step_count: u32,
    state: AgentState,
}

impl StepExecutor {
    pub fn new(max_steps: u32, step_timeout: Duration) -> Self {
        Self {
            max_steps,
            step_timeout,
            step_count: 0,
            state: AgentState::Ready,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AgentState {
        self.state
    }

    /// The configured step ceiling.
    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// The configured per-step deadline.
    pub fn timeout(&self) -> Duration {
        self.step_timeout
    }

    /// Current step counter (0 outside a run and after any normal exit).
    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    /// Move to the terminal `Stopped` state.
    pub fn stop(&mut self) {
        self.state = AgentState::Stopped;
    }

    /// Run the step loop to completion, streaming output chunks into the
    /// sink as each step emits them.
    pub async fn execute(
        &mut self,
        strategy: &mut dyn StepStrategy,
        context: StepContext,
        output: &OutputSink,
    ) -> Result<RunOutcome, EngineError> {
        if !self.state.can_run() {
            return Err(EngineError::InvalidState {
                state: self.state.to_string(),
            });
        }
        if self.state == AgentState::Ready {
            self.state = AgentState::Running;
        }

        match self.run_loop(strategy, context, output).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.state = AgentState::Error;
                error!(error = %e, "run failed");
                Err(e)
            }
        }
    }

    async fn run_loop(
        &mut self,
        strategy: &mut dyn StepStrategy,
        mut context: StepContext,
        output: &OutputSink,
    ) -> Result<RunOutcome, EngineError> {
        self.step_count = 0;

        while self.step_count < self.max_steps {
            self.step_count += 1;
            debug!(step = self.step_count, "executing step");

            let step = self.step_count;
            let drive = drive_step(strategy, step, context.clone(), output);
            let disposition = tokio::time::timeout(self.step_timeout, drive)
                .await
                .map_err(|_| EngineError::StepTimeout {
                    step,
                    timeout_secs: self.step_timeout.as_secs_f64(),
                })??;

            match disposition {
                StepDisposition::Finished => {
                    self.step_count = 0;
                    return Ok(RunOutcome::Completed);
                }
                StepDisposition::Continue { next_context } => {
                    if let Some(next) = next_context {
                        context = next;
                    }
                }
            }
        }

        warn!(max_steps = self.max_steps, "step budget exhausted");
        let _ = output.send(step_limit_guidance(self.max_steps));
        self.step_count = 0;
        Ok(RunOutcome::StepLimit)
    }
}

/// Run one step, draining its result stream concurrently.
///
/// Dropping this future (on deadline expiry, or on a `finished` result)
/// cancels the strategy's in-flight work.
async fn drive_step(
    strategy: &mut dyn StepStrategy,
    step: u32,
    context: StepContext,
    output: &OutputSink,
) -> Result<StepDisposition, EngineError> {
    let (results_tx, mut results_rx) = mpsc::channel::<StepResult>(32);
    let step_fut = strategy.step(step, context, results_tx);
    tokio::pin!(step_fut);

    let mut step_done = false;
    let mut next_context: Option<StepContext> = None;

    loop {
        tokio::select! {
            r = &mut step_fut, if !step_done => {
                r?;
                step_done = true;
            }
            item = results_rx.recv() => {
                let Some(result) = item else {
                    // Strategy dropped its sender; the step is over.
                    break;
                };

                let Some(text) = result.output else {
                    return Err(EngineError::ContractViolation(
                        "step result is missing its output field".into(),
                    ));
                };
                let _ = output.send(text);

                if result.finished {
                    match result.final_answer {
                        Some(answer) => {
                            let _ = output.send(format!("\n=== task complete ===\n{answer}\n"));
                        }
                        None => {
                            let _ = output.send("\n=== task complete ===\n".to_string());
                        }
                    }
                    return Ok(StepDisposition::Finished);
                }

                if result.next_context.is_some() {
                    next_context = result.next_context;
                }
            }
        }
    }

    Ok(StepDisposition::Continue { next_context })
}
