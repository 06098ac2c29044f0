//! Agent lifecycle state.

use serde::{Deserialize, Serialize};

/// Runtime state of an agent (and its step executor).
///
/// Created in `Ready`; moves to `Running` on the first run; to `Error` on
/// any unrecovered failure; to `Stopped` on explicit shutdown. `Error` and
/// `Stopped` are terminal — an agent in either state must be reconstructed
/// before it can run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    /// Initialized, ready to accept work
    Ready,
    /// Currently executing a run
    Running,
    /// An unrecovered failure occurred
    Error,
    /// Explicitly shut down
    Stopped,
}

impl AgentState {
    /// Whether this state permits starting (or continuing) a run.
    pub fn can_run(&self) -> bool {
        matches!(self, AgentState::Ready | AgentState::Running)
    }

    /// Terminal states cannot transition anywhere else.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Error | AgentState::Stopped)
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentState::Ready => "ready",
            AgentState::Running => "running",
            AgentState::Error => "error",
            AgentState::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}
