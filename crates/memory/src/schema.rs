use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two logical record kinds sharing one physical namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    /// One record per user: the JSON-serialized ordered list of durable
    /// facts, addressed by a deterministic key.
    Core,
    /// One record per saved fact, embedding-indexed and write-once.
    Recall,
}

impl MemoryKind {
    /// Tag stored in record metadata and matched by query filters.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Recall => "recall",
        }
    }
}

/// The stored unit: one row in the vector backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub key: String,
    pub kind: MemoryKind,
    /// Owning user.  Queries never cross this boundary.
    pub user_id: String,
    /// Memory text for recall records; the JSON-serialized memory list for
    /// core records.
    pub payload: String,
    /// Embedding vector.  All-zero for core records, which are fetched by
    /// key and never by similarity.
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// Deterministic key of a user's single core memory record.
pub fn core_key(user_id: &str) -> String {
    format!("user/{user_id}/core")
}

/// Key of one recall entry: deterministic user prefix plus a fresh event id,
/// collision-resistant and unique per call.
pub fn recall_key(user_id: &str, event_id: &Uuid) -> String {
    format!("user/{user_id}/recall/{event_id}")
}
