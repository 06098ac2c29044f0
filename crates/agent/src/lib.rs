//! The Falconer execution engine — the bounded Think → Act → Observe loop.
//!
//! 1. **Receive** an input and remember it
//! 2. **Think**: stream the model's reasoning for this step
//! 3. **Act**: if a tool call is requested, dispatch it and fold the
//!    observation back into memory
//! 4. **Observe**: replay the task's memory as the next step's context
//! 5. Repeat under a per-step deadline until the model signals completion
//!    or the step budget runs out
//!
//! The executor owns the bounds (states, deadlines, step ceiling); the
//! reasoning strategy owns the semantics of a single step.

pub mod agent;
pub mod executor;
pub mod react;

#[cfg(test)]
mod test_helpers;

pub use agent::Agent;
pub use executor::{OutputSink, StepExecutor, StepStrategy};
pub use react::{ReactStrategy, Thought};
