//! Multiplexed tool-provider sessions for Falconer.
//!
//! A tool provider is an external process or service exposing callable
//! tools and prompt templates over a request/response transport. This
//! crate owns the connection lifecycle: launching transports, negotiating
//! protocol sessions, releasing resources in reverse acquisition order,
//! and wiring remote tools into the agent's registry.

pub mod bootstrap;
pub mod manager;
pub mod session;
pub mod transport;

pub use bootstrap::{ProviderLaunchConfig, SessionTool, bootstrap, substitute_env_vars};
pub use manager::{ResourceStack, ScopedResource, SessionManager};
pub use session::{RemoteToolSpec, Session};
pub use transport::{
    Content, LaunchParams, Transport, TransportFactory, TransportRequest, TransportResponse,
};
