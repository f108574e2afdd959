//! Client for OpenAI-compatible chat and embedding endpoints.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::{ChatMessage, ChatModel, Embedder, Role, ToolCall};

/// Talks to any OpenAI-compatible API (`/chat/completions`, `/embeddings`).
///
/// Holds one [`reqwest::Client`] for its whole lifetime; clone the struct (or
/// wrap it in an `Arc`) rather than constructing a second one — the inner
/// client pools connections.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    embed_model: String,
    embed_dimensions: usize,
}

impl OpenAiCompatClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        embed_model: impl Into<String>,
        embed_dimensions: usize,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            embed_model: embed_model.into(),
            embed_dimensions,
        })
    }

    /// Read the API key from `ENGRAM_API_KEY`.  Keyless setups (local
    /// inference servers) are fine — the header is simply omitted.
    pub fn from_env(
        base_url: impl Into<String>,
        embed_model: impl Into<String>,
        embed_dimensions: usize,
    ) -> Result<Self> {
        let api_key = std::env::var("ENGRAM_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::new(base_url, api_key, embed_model, embed_dimensions)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.post(format!("{}{path}", self.base_url));
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Serialize our message model into the wire shape the API expects.
    fn wire_messages(system: &str, messages: &[ChatMessage]) -> Vec<serde_json::Value> {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        wire.push(json!({"role": "system", "content": system}));
        for msg in messages {
            match msg.role {
                Role::System => wire.push(json!({"role": "system", "content": msg.content})),
                Role::User => wire.push(json!({"role": "user", "content": msg.content})),
                Role::Assistant => {
                    let mut obj = json!({"role": "assistant", "content": msg.content});
                    if msg.has_tool_calls() {
                        obj["tool_calls"] = msg
                            .tool_calls
                            .iter()
                            .map(|call| {
                                json!({
                                    "id": call.id,
                                    "type": "function",
                                    "function": {
                                        "name": call.name,
                                        "arguments": call.arguments.to_string(),
                                    }
                                })
                            })
                            .collect();
                    }
                    wire.push(obj);
                }
                Role::Tool => wire.push(json!({
                    "role": "tool",
                    "tool_call_id": msg.tool_call_id,
                    "content": msg.content,
                })),
            }
        }
        wire
    }

    /// Pull the assistant message out of a `/chat/completions` response body.
    fn parse_chat_response(body: &serde_json::Value) -> Result<ChatMessage> {
        let message = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .ok_or_else(|| anyhow!("chat response missing choices[0].message: {body}"))?;

        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string();

        let tool_calls = message
            .get("tool_calls")
            .and_then(|t| t.as_array())
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|call| {
                        let id = call.get("id")?.as_str()?.to_string();
                        let func = call.get("function")?;
                        let name = func.get("name")?.as_str()?.to_string();
                        // Arguments arrive as a JSON-encoded string.
                        let arguments = func
                            .get("arguments")
                            .and_then(|a| a.as_str())
                            .and_then(|a| serde_json::from_str(a).ok())
                            .unwrap_or_else(|| json!({}));
                        Some(ToolCall { id, name, arguments })
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Ok(ChatMessage::assistant_tool_calls(content, tool_calls))
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatClient {
    async fn chat(
        &self,
        model: &str,
        system: &str,
        messages: &[ChatMessage],
        tools: Option<&serde_json::Value>,
    ) -> Result<ChatMessage> {
        let mut payload = json!({
            "model": model,
            "messages": Self::wire_messages(system, messages),
        });
        if let Some(tools) = tools {
            payload["tools"] = tools.clone();
        }

        let response = self
            .post("/chat/completions")
            .json(&payload)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .context("chat completion response was not JSON")?;
        if !status.is_success() {
            return Err(anyhow!("chat provider error ({status}): {body}"));
        }

        let message = Self::parse_chat_response(&body)?;
        debug!(
            model,
            tool_calls = message.tool_calls.len(),
            content_len = message.content.len(),
            "chat completion received"
        );
        Ok(message)
    }
}

#[async_trait]
impl Embedder for OpenAiCompatClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let payload = json!({
            "model": self.embed_model,
            "input": text,
        });

        let response = self
            .post("/embeddings")
            .json(&payload)
            .send()
            .await
            .context("embedding request failed")?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .context("embedding response was not JSON")?;
        if !status.is_success() {
            return Err(anyhow!("embedding provider error ({status}): {body}"));
        }

        let vector = body
            .get("data")
            .and_then(|d| d.get(0))
            .and_then(|d| d.get("embedding"))
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow!("embedding response missing data[0].embedding"))?
            .iter()
            .filter_map(|v| v.as_f64())
            .map(|v| v as f32)
            .collect::<Vec<_>>();

        if vector.len() != self.embed_dimensions {
            return Err(anyhow!(
                "embedding width mismatch: expected {}, got {}",
                self.embed_dimensions,
                vector.len()
            ));
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.embed_dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_response_with_tool_calls() {
        let body = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "search_memory",
                            "arguments": "{\"query\": \"dogs\", \"top_k\": 3}"
                        }
                    }]
                }
            }]
        });
        let msg = OpenAiCompatClient::parse_chat_response(&body).unwrap();
        assert!(msg.has_tool_calls());
        assert_eq!(msg.tool_calls[0].id, "call_abc");
        assert_eq!(msg.tool_calls[0].arguments["top_k"], 3);
    }

    #[test]
    fn parse_plain_text_response() {
        let body = json!({
            "choices": [{"message": {"content": "hello there"}}]
        });
        let msg = OpenAiCompatClient::parse_chat_response(&body).unwrap();
        assert_eq!(msg.content, "hello there");
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn parse_rejects_empty_body() {
        assert!(OpenAiCompatClient::parse_chat_response(&json!({})).is_err());
    }

    #[test]
    fn wire_messages_round_trip_tool_history() {
        let call = ToolCall {
            id: "call_1".into(),
            name: "save_recall_memory".into(),
            arguments: json!({"memory": "likes tea"}),
        };
        let messages = vec![
            ChatMessage::user("remember I like tea"),
            ChatMessage::assistant_tool_calls("", vec![call]),
            ChatMessage::tool_result("call_1", "likes tea"),
        ];
        let wire = OpenAiCompatClient::wire_messages("sys", &messages);
        assert_eq!(wire.len(), 4);
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[2]["tool_calls"][0]["function"]["name"], "save_recall_memory");
        assert_eq!(wire[3]["tool_call_id"], "call_1");
    }
}
