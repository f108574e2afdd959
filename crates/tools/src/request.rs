//! Parsing and validation of tool-call requests into the closed tool set.

use serde::Deserialize;

use crate::{ToolError, ToolParam, ToolSpec};

/// Hard cap on `top_k` — larger values only add latency and context bloat.
const MAX_TOP_K: usize = 50;
/// Hard cap on web search results.
const MAX_WEB_RESULTS: usize = 10;

fn default_top_k() -> usize {
    5
}

fn default_max_results() -> usize {
    3
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SaveRecallMemoryArgs {
    /// The memory text to persist for later semantic retrieval.
    pub memory: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchMemoryArgs {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoreCoreMemoryArgs {
    pub memory: String,
    /// When present, replaces the core memory at this position instead of
    /// prepending a new one.
    #[serde(default)]
    pub index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebSearchArgs {
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

/// The closed set of invocable tools: an enumerated tool id plus a strongly
/// typed argument struct per variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    SaveRecallMemory(SaveRecallMemoryArgs),
    SearchMemory(SearchMemoryArgs),
    StoreCoreMemory(StoreCoreMemoryArgs),
    WebSearch(WebSearchArgs),
}

impl ToolRequest {
    /// Parse a named tool call's JSON arguments into a validated request.
    pub fn parse(name: &str, arguments: &serde_json::Value) -> Result<Self, ToolError> {
        match name {
            "save_recall_memory" => {
                let args: SaveRecallMemoryArgs = deserialize("save_recall_memory", arguments)?;
                require_text("save_recall_memory", "memory", &args.memory)?;
                Ok(Self::SaveRecallMemory(args))
            }
            "search_memory" => {
                let args: SearchMemoryArgs = deserialize("search_memory", arguments)?;
                require_text("search_memory", "query", &args.query)?;
                if args.top_k == 0 || args.top_k > MAX_TOP_K {
                    return Err(ToolError::InvalidArgs {
                        tool: "search_memory",
                        message: format!("top_k must be between 1 and {MAX_TOP_K}, got {}", args.top_k),
                    });
                }
                Ok(Self::SearchMemory(args))
            }
            "store_core_memory" => {
                let args: StoreCoreMemoryArgs = deserialize("store_core_memory", arguments)?;
                require_text("store_core_memory", "memory", &args.memory)?;
                Ok(Self::StoreCoreMemory(args))
            }
            "web_search" => {
                let args: WebSearchArgs = deserialize("web_search", arguments)?;
                require_text("web_search", "query", &args.query)?;
                if args.max_results == 0 || args.max_results > MAX_WEB_RESULTS {
                    return Err(ToolError::InvalidArgs {
                        tool: "web_search",
                        message: format!(
                            "max_results must be between 1 and {MAX_WEB_RESULTS}, got {}",
                            args.max_results
                        ),
                    });
                }
                Ok(Self::WebSearch(args))
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// Specs for the full tool set, in the order they are presented to the
    /// model.
    pub fn specs() -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "save_recall_memory".to_string(),
                description: "Save a memory to the database for later semantic retrieval."
                    .to_string(),
                params: vec![ToolParam::required("memory", "The memory to be saved")],
            },
            ToolSpec {
                name: "search_memory".to_string(),
                description: "Search stored memories by semantic similarity.".to_string(),
                params: vec![
                    ToolParam::required("query", "The search query"),
                    ToolParam::optional_int("top_k", "Number of results to return (default 5)"),
                ],
            },
            ToolSpec {
                name: "store_core_memory".to_string(),
                description: "Store a core memory about the user; pass index to replace an \
                              existing one."
                    .to_string(),
                params: vec![
                    ToolParam::required("memory", "The memory to store"),
                    ToolParam::optional_int("index", "Position to replace (omit to prepend)"),
                ],
            },
            ToolSpec {
                name: "web_search".to_string(),
                description: "Search the web for current information.".to_string(),
                params: vec![
                    ToolParam::required("query", "Search query string"),
                    ToolParam::optional_int("max_results", "Maximum results (default 3)"),
                ],
            },
        ]
    }
}

fn deserialize<T: serde::de::DeserializeOwned>(
    tool: &'static str,
    arguments: &serde_json::Value,
) -> Result<T, ToolError> {
    serde_json::from_value(arguments.clone()).map_err(|e| ToolError::InvalidArgs {
        tool,
        message: e.to_string(),
    })
}

fn require_text(tool: &'static str, field: &str, value: &str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        return Err(ToolError::InvalidArgs {
            tool,
            message: format!("{field} must be non-empty"),
        });
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_each_variant() {
        let save = ToolRequest::parse("save_recall_memory", &json!({"memory": "likes tea"}));
        assert!(matches!(save, Ok(ToolRequest::SaveRecallMemory(_))));

        let search = ToolRequest::parse("search_memory", &json!({"query": "tea"})).unwrap();
        match search {
            ToolRequest::SearchMemory(args) => assert_eq!(args.top_k, 5),
            other => panic!("wrong variant: {other:?}"),
        }

        let core = ToolRequest::parse(
            "store_core_memory",
            &json!({"memory": "has a dog", "index": 2}),
        )
        .unwrap();
        match core {
            ToolRequest::StoreCoreMemory(args) => assert_eq!(args.index, Some(2)),
            other => panic!("wrong variant: {other:?}"),
        }

        let web = ToolRequest::parse("web_search", &json!({"query": "weather"}));
        assert!(matches!(web, Ok(ToolRequest::WebSearch(_))));
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let err = ToolRequest::parse("delete_everything", &json!({})).unwrap_err();
        assert_eq!(err, ToolError::UnknownTool("delete_everything".to_string()));
    }

    #[test]
    fn empty_memory_is_rejected() {
        let err = ToolRequest::parse("save_recall_memory", &json!({"memory": "  "})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs { tool: "save_recall_memory", .. }));
    }

    #[test]
    fn zero_top_k_is_rejected() {
        let err =
            ToolRequest::parse("search_memory", &json!({"query": "x", "top_k": 0})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs { tool: "search_memory", .. }));
    }

    #[test]
    fn oversized_top_k_is_rejected() {
        let err =
            ToolRequest::parse("search_memory", &json!({"query": "x", "top_k": 51})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs { .. }));
    }

    #[test]
    fn malformed_args_are_rejected() {
        let err = ToolRequest::parse("search_memory", &json!({"top_k": 3})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs { tool: "search_memory", .. }));
    }
}
