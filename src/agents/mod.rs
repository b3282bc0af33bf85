//! Agent records and the owner-scoped registry.

mod registry;
pub(crate) mod types;

pub use registry::{AgentPatch, AgentRegistry, SharedRegistry};
pub use types::{Agent, AgentStatus, HistoryEntry};
