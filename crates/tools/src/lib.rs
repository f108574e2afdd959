//! The tool layer: a closed set of schema-typed, argument-validated actions
//! the reasoning step may invoke.
//!
//! Tools are not dispatched reflectively — [`request::ToolRequest`] is a
//! tagged enum with one strongly typed argument struct per variant, and
//! [`router::ToolRouter`] routes through a single exhaustive match.  A tool
//! failure (bad arguments, backend error) becomes a structured error result
//! fed back into the conversation, never an error out of the turn.

use serde::{Deserialize, Serialize};

pub mod request;
pub mod router;
pub mod web;

pub use request::{
    SaveRecallMemoryArgs, SearchMemoryArgs, StoreCoreMemoryArgs, ToolRequest, WebSearchArgs,
};
pub use router::{ToolOutcome, ToolRouter};

// ── Tool errors ───────────────────────────────────────────────────────────────

/// Validation failures raised while turning a tool-call request into a
/// [`request::ToolRequest`].  Always recovered locally: the display text is
/// the tool's result.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArgs { tool: &'static str, message: String },
}

// ── Tool schema metadata ──────────────────────────────────────────────────────

/// JSON-friendly type hint for a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
}

/// Describes a single parameter that a tool accepts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParam {
    pub name: String,
    pub description: String,
    pub required: bool,
    pub param_type: ParamType,
}

impl ToolParam {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
            param_type: ParamType::String,
        }
    }

    pub fn optional_int(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
            param_type: ParamType::Integer,
        }
    }
}

/// Static metadata about a tool, used by the LLM to decide which tool to call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub params: Vec<ToolParam>,
}

impl ToolSpec {
    /// Generate the OpenAI-compatible `tools` array element for this tool:
    ///
    /// ```json
    /// {"type": "function", "function": {"name": ..., "parameters": {...}}}
    /// ```
    pub fn to_openai_tool_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required: Vec<String> = Vec::new();

        for p in &self.params {
            let type_str = match p.param_type {
                ParamType::String => "string",
                ParamType::Integer => "integer",
            };
            properties.insert(
                p.name.clone(),
                serde_json::json!({
                    "type": type_str,
                    "description": p.description,
                }),
            );
            if p.required {
                required.push(p.name.clone());
            }
        }

        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": {
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }
            }
        })
    }
}

/// Build the OpenAI-compatible `tools` JSON array bound to the reasoning call.
pub fn specs_to_openai_tools(specs: &[ToolSpec]) -> serde_json::Value {
    serde_json::Value::Array(specs.iter().map(ToolSpec::to_openai_tool_schema).collect())
}

// ── Tests ────────────────────────────────────────────────────────────────────
