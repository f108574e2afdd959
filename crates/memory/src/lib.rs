//! Per-user long-term memory over an opaque vector-capable key-value backend.
//!
//! Two record kinds share one namespace:
//!
//! | Kind     | Cardinality      | Key                            | Mutation                  |
//! |----------|------------------|--------------------------------|---------------------------|
//! | `Core`   | one row per user | `user/{user_id}/core`          | full-record replace       |
//! | `Recall` | many rows per user | `user/{user_id}/recall/{uuid}` | write-once, never updated |
//!
//! Core memories are always-in-context facts; recall memories are fetched by
//! embedding similarity.  Every query is filtered by `user_id` — the store
//! never returns entries across user boundaries.

pub mod core;
pub mod error;
pub mod recall;
pub mod rest;
pub mod schema;
pub mod store;

pub use crate::core::CoreMemoryManager;
pub use error::MemoryError;
pub use recall::RecallMemoryManager;
pub use rest::{RestVectorStore, shared_rest_store};
pub use schema::{MemoryKind, MemoryRecord, core_key, recall_key};
pub use store::{InMemoryVectorStore, MemoryFilter, QueryMatch, VectorStore};
