//! Deterministic in-process providers for tests and offline runs.

use std::collections::VecDeque;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::{ChatMessage, ChatModel, Embedder};

// ── ScriptedChatModel ─────────────────────────────────────────────────────────

/// Chat model that replays a pre-programmed sequence of assistant messages.
///
/// Each call pops the next scripted response; once the script is exhausted it
/// answers with a fixed text message so loops always terminate.  The system
/// prompts it was shown are recorded for assertions.
pub struct ScriptedChatModel {
    script: Mutex<VecDeque<ChatMessage>>,
    seen_systems: Mutex<Vec<String>>,
}

impl ScriptedChatModel {
    pub fn new(responses: Vec<ChatMessage>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            seen_systems: Mutex::new(Vec::new()),
        }
    }

    /// System prompts received so far, in call order.
    pub fn seen_systems(&self) -> Vec<String> {
        self.seen_systems.lock().unwrap().clone()
    }

    /// Number of chat invocations so far.
    pub fn calls(&self) -> usize {
        self.seen_systems.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn chat(
        &self,
        _model: &str,
        system: &str,
        _messages: &[ChatMessage],
        _tools: Option<&serde_json::Value>,
    ) -> Result<ChatMessage> {
        self.seen_systems.lock().unwrap().push(system.to_string());
        let next = self.script.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| ChatMessage::assistant("(scripted model: out of responses)")))
    }
}

// ── HashEmbedder ──────────────────────────────────────────────────────────────

/// Deterministic pseudo-embedder with real cosine geometry.
///
/// Each lowercase whitespace token is hashed into one of `dimensions`
/// buckets; the bucket counts are L2-normalized.  Texts sharing tokens get
/// higher cosine similarity, which is enough for recall round-trip tests
/// without a network provider.
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text.to_lowercase().split_whitespace() {
            let token = token.trim_matches(|c: char| !c.is_alphanumeric());
            if token.is_empty() {
                continue;
            }
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() as usize) % self.dimensions;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolCall;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn scripted_model_pops_in_order() {
        let model = ScriptedChatModel::new(vec![
            ChatMessage::assistant_tool_calls(
                "",
                vec![ToolCall {
                    id: "call_1".into(),
                    name: "search_memory".into(),
                    arguments: serde_json::json!({"query": "x"}),
                }],
            ),
            ChatMessage::assistant("done"),
        ]);
        let first = model.chat("m", "sys", &[], None).await.unwrap();
        assert!(first.has_tool_calls());
        let second = model.chat("m", "sys", &[], None).await.unwrap();
        assert_eq!(second.content, "done");
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn scripted_model_survives_exhaustion() {
        let model = ScriptedChatModel::new(vec![]);
        let msg = model.chat("m", "sys", &[], None).await.unwrap();
        assert!(!msg.has_tool_calls());
    }

    #[tokio::test]
    async fn hash_embedder_is_deterministic_and_normalized() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed("my dog spot").await.unwrap();
        let b = embedder.embed("my dog spot").await.unwrap();
        assert_eq!(a, b);
        let norm = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn shared_tokens_raise_similarity() {
        let embedder = HashEmbedder::new(64);
        let dog1 = embedder.embed("I had a dog named spot").await.unwrap();
        let dog2 = embedder.embed("tell me about my dog spot").await.unwrap();
        let cheese = embedder.embed("gruyere melts nicely").await.unwrap();
        assert!(cosine(&dog1, &dog2) > cosine(&dog1, &cheese));
    }
}
