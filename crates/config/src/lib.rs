use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

// ── Provider config ───────────────────────────────────────────────────────────

/// Settings for the chat (reasoning) and embedding providers.
///
/// Both talk to an OpenAI-compatible endpoint.  The API key is only read from
/// the environment (`ENGRAM_API_KEY`), never from the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Chat model used by the reasoning step.  A per-turn override in
    /// [`TurnConfig::model`] takes precedence.
    pub chat_model: String,
    /// Embedding model used for recall memory storage and search.
    pub embed_model: String,
    /// Dimensionality of the embedding vectors.  Core memory records carry a
    /// zero vector of this length (they are fetched by key, never by
    /// similarity), so the store sees one consistent width.
    pub embed_dimensions: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embed_model: "text-embedding-3-small".to_string(),
            embed_dimensions: 768,
        }
    }
}

// ── Vector backend config ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Base URL of the vector backend's REST API.
    pub base_url: String,
    /// Logical partition isolating this deployment's records from others
    /// sharing the same index.
    pub namespace: String,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:6333".to_string(),
            namespace: "engram".to_string(),
        }
    }
}

// ── Memory / orchestration config ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Number of recall memories retrieved while loading memories for a turn.
    pub recall_top_k: usize,
    /// Approximate token budget for the conversation tail that seeds the
    /// recall search query.  Bounds embedding latency and cost.
    pub context_token_budget: usize,
    /// Maximum agent ⇄ tools rounds per turn.  On the final round the tool
    /// schema is withheld so the model must produce a text answer.
    pub max_tool_rounds: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            recall_top_k: 5,
            context_token_budget: 2048,
            max_tool_rounds: 8,
        }
    }
}

// ── AppConfig ─────────────────────────────────────────────────────────────────

/// Process-wide configuration: TOML file layered under environment overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub vector: VectorConfig,
    pub memory: MemoryConfig,
}

impl AppConfig {
    /// Load from a TOML file, then apply environment-variable overrides.
    /// A missing file is not an error — defaults are used.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config: AppConfig = if path.exists() {
            let raw = fs::read_to_string(path)?;
            toml::from_str(&raw)?
        } else {
            AppConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment overrides, applied after the file so operators can adjust
    /// a deployment without editing it.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("ENGRAM_LLM_BASE_URL") {
            if !url.trim().is_empty() {
                self.llm.base_url = url;
            }
        }
        if let Ok(model) = env::var("ENGRAM_CHAT_MODEL") {
            if !model.trim().is_empty() {
                self.llm.chat_model = model;
            }
        }
        if let Ok(url) = env::var("ENGRAM_VECTOR_BASE_URL") {
            if !url.trim().is_empty() {
                self.vector.base_url = url;
            }
        }
        if let Ok(ns) = env::var("ENGRAM_VECTOR_NAMESPACE") {
            if !ns.trim().is_empty() {
                self.vector.namespace = ns;
            }
        }
    }

    /// Chat model for a turn: per-turn override when present, else the
    /// configured default.
    pub fn active_model(&self, turn: &TurnConfig) -> String {
        turn.model
            .clone()
            .unwrap_or_else(|| self.llm.chat_model.clone())
    }
}

// ── TurnConfig ────────────────────────────────────────────────────────────────

/// Fatal configuration problems, raised before any I/O is attempted.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("turn config is missing a user_id")]
    MissingUserId,
    #[error("turn config is missing a thread_id")]
    MissingThreadId,
}

/// Per-turn configuration supplied by the front-end with each inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Owner of the memories touched during this turn.  Every store access is
    /// scoped to this id.
    pub user_id: String,
    /// Logical conversation thread.  The front-end is responsible for
    /// serializing turns within one thread.
    pub thread_id: String,
    /// Optional per-turn chat model override.
    #[serde(default)]
    pub model: Option<String>,
}

impl TurnConfig {
    pub fn new(user_id: impl Into<String>, thread_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            thread_id: thread_id.into(),
            model: None,
        }
    }

    /// Validate before any I/O.  An empty `user_id` would silently scope
    /// memory reads and writes to nobody, so it is fatal to the turn.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_id.trim().is_empty() {
            return Err(ConfigError::MissingUserId);
        }
        if self.thread_id.trim().is_empty() {
            return Err(ConfigError::MissingThreadId);
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.memory.recall_top_k, 5);
        assert_eq!(cfg.memory.context_token_budget, 2048);
        assert_eq!(cfg.memory.max_tool_rounds, 8);
        assert_eq!(cfg.llm.embed_dimensions, 768);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = AppConfig::load_from(dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg.vector.namespace, "engram");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engram.toml");
        fs::write(
            &path,
            r#"
[vector]
namespace = "prod-ns"

[memory]
recall_top_k = 9
"#,
        )
        .unwrap();
        let cfg = AppConfig::load_from(&path).unwrap();
        assert_eq!(cfg.vector.namespace, "prod-ns");
        assert_eq!(cfg.memory.recall_top_k, 9);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.memory.max_tool_rounds, 8);
    }

    #[test]
    fn env_chat_model_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engram.toml");
        fs::write(&path, "[llm]\nchat_model = \"from-file\"\n").unwrap();

        // No other test in this module reads ENGRAM_CHAT_MODEL, so setting
        // the process-global var cannot race a parallel assertion.
        unsafe { env::set_var("ENGRAM_CHAT_MODEL", "from-env") };
        let cfg = AppConfig::load_from(&path).unwrap();
        assert_eq!(cfg.llm.chat_model, "from-env");
        unsafe { env::remove_var("ENGRAM_CHAT_MODEL") };
    }

    // ── TurnConfig ─────────────────────────────────────────────────────────

    #[test]
    fn turn_config_requires_user_id() {
        let turn = TurnConfig::new("", "thread-1");
        assert_eq!(turn.validate(), Err(ConfigError::MissingUserId));
    }

    #[test]
    fn turn_config_requires_thread_id() {
        let turn = TurnConfig::new("user-1", "  ");
        assert_eq!(turn.validate(), Err(ConfigError::MissingThreadId));
    }

    #[test]
    fn turn_config_valid_passes() {
        let turn = TurnConfig::new("user-1", "thread-1");
        assert!(turn.validate().is_ok());
    }

    #[test]
    fn active_model_prefers_turn_override() {
        let cfg = AppConfig::default();
        let mut turn = TurnConfig::new("u", "t");
        assert_eq!(cfg.active_model(&turn), "gpt-4o-mini");
        turn.model = Some("some/other-model".to_string());
        assert_eq!(cfg.active_model(&turn), "some/other-model");
    }
}
