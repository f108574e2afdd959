//! Chat and embedding provider abstractions.
//!
//! The orchestrator only ever sees the two traits here: [`ChatModel`]
//! (messages + bound tools → assistant message) and [`Embedder`]
//! (text → fixed-length vector).  [`OpenAiCompatClient`] implements both
//! against any OpenAI-compatible endpoint; the [`mock`] module provides
//! deterministic in-process implementations for tests and offline runs.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod mock;
mod openai;

pub use openai::OpenAiCompatClient;

// ── Message model ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A structured tool-call request emitted by the reasoning step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id.  Tool results must echo it back so the
    /// model can match results to requests.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// Arguments as a JSON object.
    pub arguments: serde_json::Value,
}

/// One dialogue turn.  Append-only within a turn: the orchestrator never
/// rewrites or reorders messages once pushed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    /// Tool-call requests carried by an assistant message.  Empty for all
    /// other roles.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// For `Role::Tool` messages: the id of the call this result answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Assistant message carrying tool-call requests (and optionally some
    /// preamble text the model emitted before deciding to call tools).
    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        let mut msg = Self::new(Role::Assistant, content);
        msg.tool_calls = calls;
        msg
    }

    /// Tool-role message holding one call's result, tagged with the
    /// originating call id.
    pub fn tool_result(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Tool, output);
        msg.tool_call_id = Some(call_id.into());
        msg
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

// ── Provider traits ───────────────────────────────────────────────────────────

/// The reasoning provider: full message history plus a rendered system
/// context in, one assistant message out (text and/or tool-call requests).
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// `tools` is the OpenAI-style `tools` JSON array; `None` means the
    /// model may not request tool calls for this invocation.
    async fn chat(
        &self,
        model: &str,
        system: &str,
        messages: &[ChatMessage],
        tools: Option<&serde_json::Value>,
    ) -> Result<ChatMessage>;
}

/// The embedding provider: text → fixed-length vector.  Used identically for
/// memory storage and query-time search.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Width of the vectors produced by [`Embedder::embed`].
    fn dimensions(&self) -> usize;
}

// ── Tests ────────────────────────────────────────────────────────────────────
