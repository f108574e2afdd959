use thiserror::Error;

/// Errors from the memory layer.
///
/// `IndexOutOfBounds` is a validation failure the tool layer turns into a
/// conversational error result; the rest are backend/infrastructure failures
/// that become turn-level errors when raised outside a tool call.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Error: Index {index} out of bounds (have {len} core memories).")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("vector backend error: {0}")]
    Backend(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("malformed core memory payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl MemoryError {
    /// True for caller mistakes that should be fed back into the
    /// conversation rather than failing the turn.
    pub fn is_validation(&self) -> bool {
        matches!(self, MemoryError::IndexOutOfBounds { .. })
    }
}
