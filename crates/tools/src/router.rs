//! Execution of parsed tool requests through one exhaustive match.

use std::sync::Arc;

use tracing::{debug, warn};

use engram_llm::ToolCall;
use engram_memory::{CoreMemoryManager, RecallMemoryManager};

use crate::request::ToolRequest;
use crate::web::WebSearchTool;

/// Result of one tool execution, attached to its originating call id so the
/// orchestrator can append it as a matching tool-role message.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub call_id: String,
    pub tool_name: String,
    pub success: bool,
    pub output: String,
}

/// Dispatches validated tool requests against the memory managers and the
/// web search capability.  Shareable across concurrent turns.
pub struct ToolRouter {
    core: Arc<CoreMemoryManager>,
    recall: Arc<RecallMemoryManager>,
    web: WebSearchTool,
}

impl ToolRouter {
    pub fn new(core: Arc<CoreMemoryManager>, recall: Arc<RecallMemoryManager>) -> Self {
        Self {
            core,
            recall,
            web: WebSearchTool::new(),
        }
    }

    /// Execute one tool call for `user_id`.
    ///
    /// Never fails: validation and backend errors are folded into a
    /// [`ToolOutcome`] with `success: false` and the error text as output,
    /// so the reasoning step can see what went wrong and react.
    pub async fn execute(&self, user_id: &str, call: &ToolCall) -> ToolOutcome {
        let request = match ToolRequest::parse(&call.name, &call.arguments) {
            Ok(request) => request,
            Err(err) => {
                warn!(tool = %call.name, %err, "tool call failed validation");
                return ToolOutcome {
                    call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    success: false,
                    output: err.to_string(),
                };
            }
        };

        let result = self.dispatch(user_id, request).await;
        let (success, output) = match result {
            Ok(output) => (true, output),
            Err(err) => (false, err),
        };
        debug!(tool = %call.name, success, "tool call finished");
        ToolOutcome {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            success,
            output,
        }
    }

    /// The single exhaustive match over the closed tool set.
    async fn dispatch(&self, user_id: &str, request: ToolRequest) -> Result<String, String> {
        match request {
            ToolRequest::SaveRecallMemory(args) => self
                .recall
                .save_recall_memory(user_id, &args.memory)
                .await
                .map_err(|e| e.to_string()),
            ToolRequest::SearchMemory(args) => self
                .recall
                .search_memory(user_id, &args.query, args.top_k)
                .await
                .map(|memories| {
                    if memories.is_empty() {
                        "No matching memories found.".to_string()
                    } else {
                        memories.join("\n")
                    }
                })
                .map_err(|e| e.to_string()),
            ToolRequest::StoreCoreMemory(args) => self
                .core
                .store_core_memory(user_id, &args.memory, args.index)
                .await
                .map_err(|e| e.to_string()),
            ToolRequest::WebSearch(args) => self
                .web
                .search(&args.query, args.max_results)
                .await
                .map_err(|e| e.to_string()),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
