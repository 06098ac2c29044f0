//! # Falconer Core
//!
//! Domain types, traits, and error definitions for the Falconer agent
//! execution engine. This crate has **zero framework dependencies** — it
//! defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod message;
pub mod provider;
pub mod state;
pub mod step;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{EngineError, ProviderError, SessionError, ToolError};
pub use message::{Message, Role};
pub use provider::{
    Provider, StopReason, ThinkChunk, ThinkRequest, ToolCallRequest, ToolDefinition,
};
pub use state::AgentState;
pub use step::{RunOutcome, StepContext, StepResult};
pub use tool::{Action, ActionResult, Tool, ToolInvoker, ToolRegistry};
