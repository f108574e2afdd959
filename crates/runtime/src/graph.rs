//! The state graph: `LoadMemories → Agent ⇄ Tools → Terminal`.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use engram_config::{AppConfig, ConfigError, TurnConfig};
use engram_llm::{ChatMessage, ChatModel};
use engram_memory::{CoreMemoryManager, MemoryError, RecallMemoryManager};
use engram_tools::{ToolOutcome, ToolRequest, ToolRouter, specs_to_openai_tools};

use crate::prompt::render_system_context;
use crate::state::{ConversationState, tail_by_token_budget};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Turn-level failures.  Tool-call failures never surface here — they are
/// folded into tool-result messages; this covers configuration problems and
/// infrastructure calls with no tool-error channel to report through
/// (memory load, the reasoning provider itself).
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("memory load failed: {0}")]
    MemoryLoad(#[from] MemoryError),

    #[error("reasoning provider failed: {0}")]
    Provider(#[source] anyhow::Error),
}

// ── Routing ───────────────────────────────────────────────────────────────────

/// Where the graph goes after the agent node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Tools,
    Terminal,
}

/// Routing is a pure function of the last message only: tool-call requests
/// present means the tools node runs next, otherwise the turn is done.
pub fn route_tools(last_message: &ChatMessage) -> Route {
    if last_message.has_tool_calls() {
        Route::Tools
    } else {
        Route::Terminal
    }
}

// ── MemoryGraph ───────────────────────────────────────────────────────────────

/// The assembled orchestrator.  One instance serves any number of
/// concurrent turns; per-turn data lives in [`ConversationState`].
pub struct MemoryGraph {
    config: AppConfig,
    chat: Arc<dyn ChatModel>,
    core: Arc<CoreMemoryManager>,
    recall: Arc<RecallMemoryManager>,
    router: ToolRouter,
    tools_json: serde_json::Value,
}

impl MemoryGraph {
    pub fn new(
        config: AppConfig,
        chat: Arc<dyn ChatModel>,
        core: Arc<CoreMemoryManager>,
        recall: Arc<RecallMemoryManager>,
    ) -> Self {
        let router = ToolRouter::new(core.clone(), recall.clone());
        Self {
            config,
            chat,
            core,
            recall,
            router,
            tools_json: specs_to_openai_tools(&ToolRequest::specs()),
        }
    }

    /// Run one full turn: load memories, then loop agent ⇄ tools until the
    /// model answers in text.  Returns the final assistant message — never a
    /// tool-call-only message.
    ///
    /// The loop is bounded by `memory.max_tool_rounds`; on the final round
    /// the tool schema is withheld so the model must produce a text answer.
    #[instrument(skip(self, state), fields(user_id = %turn.user_id, thread_id = %turn.thread_id, messages = state.messages.len()))]
    pub async fn run_turn(
        &self,
        state: &mut ConversationState,
        turn: &TurnConfig,
    ) -> Result<ChatMessage, TurnError> {
        // Fatal configuration problems are raised before any I/O.
        turn.validate()?;

        self.load_memories(state, turn).await?;

        let max_rounds = self.config.memory.max_tool_rounds.max(1);
        let mut all_outcomes: Vec<ToolOutcome> = Vec::new();

        for round in 0..max_rounds {
            // On the last allowed round, omit tools to force a text answer.
            let tools = if round + 1 < max_rounds {
                Some(&self.tools_json)
            } else {
                warn!(max_rounds, "tool loop at final round, forcing text response");
                None
            };

            let message = self.agent(state, turn, tools).await?;
            state.messages.push(message.clone());

            match route_tools(&message) {
                Route::Terminal => {
                    debug!(round, "turn terminal");
                    return Ok(message);
                }
                Route::Tools => {
                    info!(round, count = message.tool_calls.len(), "tool calls requested");
                    let outcomes = self.run_tools(state, turn).await;
                    all_outcomes.extend(outcomes);
                }
            }
        }

        // The model kept requesting tools even on the forced round.  Build a
        // text answer from the gathered results so the turn still ends with
        // a non-tool-call message.
        warn!("model requested tools on the forced final round");
        let summary = ChatMessage::assistant(summarize_outcomes(&all_outcomes));
        state.messages.push(summary.clone());
        Ok(summary)
    }

    /// `LoadMemories` node: fetch core memories and search recall memories
    /// concurrently, then populate the state's memory slots.  Does not touch
    /// `messages`.
    async fn load_memories(
        &self,
        state: &mut ConversationState,
        turn: &TurnConfig,
    ) -> Result<(), TurnError> {
        let buffer = state.buffer_string();
        let query = tail_by_token_budget(&buffer, self.config.memory.context_token_budget);

        let (core_result, recall_result) = tokio::join!(
            self.core.fetch_core_memories(&turn.user_id),
            self.recall
                .search_memory(&turn.user_id, query, self.config.memory.recall_top_k),
        );

        let (_, core_memories) = core_result?;
        state.core_memories = core_memories;
        state.recall_memories = recall_result?;
        debug!(
            core = state.core_memories.len(),
            recall = state.recall_memories.len(),
            "memories loaded"
        );
        Ok(())
    }

    /// `Agent` node: render the system context and invoke the reasoning
    /// provider bound to the tool set.
    async fn agent(
        &self,
        state: &ConversationState,
        turn: &TurnConfig,
        tools: Option<&serde_json::Value>,
    ) -> Result<ChatMessage, TurnError> {
        let system = render_system_context(&state.core_memories, &state.recall_memories);
        let model = self.config.active_model(turn);
        self.chat
            .chat(&model, &system, &state.messages, tools)
            .await
            .map_err(TurnError::Provider)
    }

    /// `Tools` node: execute every requested call — independent calls fan
    /// out concurrently — and append one tool-role message per call, in
    /// request order, each tagged with its originating call id.
    async fn run_tools(&self, state: &mut ConversationState, turn: &TurnConfig) -> Vec<ToolOutcome> {
        let calls = state
            .last_message()
            .map(|msg| msg.tool_calls.clone())
            .unwrap_or_default();

        let futs = calls
            .iter()
            .map(|call| self.router.execute(&turn.user_id, call));
        let outcomes = futures::future::join_all(futs).await;

        for outcome in &outcomes {
            state
                .messages
                .push(ChatMessage::tool_result(&outcome.call_id, &outcome.output));
        }
        outcomes
    }
}

fn summarize_outcomes(outcomes: &[ToolOutcome]) -> String {
    if outcomes.is_empty() {
        return "I wasn't able to finish that request.".to_string();
    }
    outcomes
        .iter()
        .map(|o| {
            let clipped = o.output.chars().take(500).collect::<String>();
            format!("[{}]: {clipped}", o.tool_name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ────────────────────────────────────────────────────────────────────
