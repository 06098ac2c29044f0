//! Step-loop value types.
//!
//! A step is one bounded iteration of the outer execution loop: one
//! think-or-act unit of work. The step strategy emits [`StepResult`]s as it
//! works; the executor validates and streams them.

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// The context fed into a step: the raw input on the first step, a rebuilt
/// message transcript after a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StepContext {
    Text(String),
    Messages(Vec<Message>),
}

impl From<&str> for StepContext {
    fn from(s: &str) -> Self {
        StepContext::Text(s.to_string())
    }
}

/// One structured result emitted by a step.
///
/// `output` is the primary field: `None` is a contract violation that
/// aborts the run. `finished` marks the only non-error terminal path;
/// `next_context` replaces the context for the following step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Text to stream to the caller
    pub output: Option<String>,

    /// Replacement context for the next step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_context: Option<StepContext>,

    /// Whether the task is complete
    #[serde(default)]
    pub finished: bool,

    /// Optional final answer, emitted after the completion marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
}

impl StepResult {
    /// A streamed partial output.
    pub fn chunk(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            next_context: None,
            finished: false,
            final_answer: None,
        }
    }

    /// A completion result.
    pub fn finished(output: impl Into<String>) -> Self {
        Self {
            output: Some(output.into()),
            next_context: None,
            finished: true,
            final_answer: None,
        }
    }

    /// An output that also rewires the context for the next step.
    pub fn with_next_context(output: impl Into<String>, context: StepContext) -> Self {
        Self {
            output: Some(output.into()),
            next_context: Some(context),
            finished: false,
            final_answer: None,
        }
    }
}

/// How a run ended, when it did not end in a fatal error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// A step signaled completion
    Completed,
    /// The step budget was exhausted — a normal, user-visible outcome
    StepLimit,
}
