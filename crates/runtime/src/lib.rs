//! The orchestrator: a small state machine that loads per-user memories,
//! invokes the reasoning step, routes to tools or termination, and loops.
//!
//! States: `LoadMemories` (initial) → `Agent` → {`Tools`, `Terminal`};
//! `Tools` always returns to `Agent`; `Terminal` is the only accepting
//! state.  One [`state::ConversationState`] is threaded through a single
//! turn and discarded afterwards — durable memory lives behind
//! `engram-memory`.

pub mod graph;
pub mod prompt;
pub mod state;

pub use graph::{MemoryGraph, Route, TurnError, route_tools};
pub use state::ConversationState;
