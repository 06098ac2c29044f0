//! Error types for the Falconer domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.
//!
//! Errors here are the *fatal* lane only: violations of the engine's own
//! invariants propagate as `Err`. Expected failure modes — a tool handler
//! that fails, a batch unit that errors — travel as recoverable values
//! (`ActionResult`, batch failure placeholders) and never abort a run.

use thiserror::Error;

/// Fatal failures of the step-execution engine.
///
/// Any of these moves the agent to [`AgentState::Error`] and ends the run;
/// the executor is not usable again without reconstruction.
///
/// [`AgentState::Error`]: crate::state::AgentState::Error
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("invalid agent state: {state} (expected ready or running)")]
    InvalidState { state: String },

    #[error("step {step} exceeded its deadline of {timeout_secs}s")]
    StepTimeout { step: u32, timeout_secs: f64 },

    #[error("step contract violation: {0}")]
    ContractViolation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors raised by tool handlers.
///
/// The [`ToolInvoker`] catches every variant and converts it into a failed
/// `ActionResult`, so these never cross the reasoning loop's boundary.
///
/// [`ToolInvoker`]: crate::tool::ToolInvoker
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// Errors from tool-provider connections and sessions.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to connect to provider {provider_id}: {reason}")]
    ConnectFailed { provider_id: String, reason: String },

    #[error("no connection found for provider {0}")]
    NoConnection(String),

    #[error("handshake failed for provider {provider_id}: {reason}")]
    HandshakeFailed { provider_id: String, reason: String },

    #[error("session request failed: {0}")]
    RequestFailed(String),

    #[error("session closed: {0}")]
    Closed(String),
}

/// Errors from the model provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),
}
