//! Interactive demo front-end for the engram memory agent.
//!
//! Production deployments drive [`engram_runtime::MemoryGraph`] from their
//! own transport; this binary exists to exercise a full turn loop from a
//! terminal.  With `--offline` it runs entirely in-process (hash embedder,
//! in-memory store, canned reasoning) so no credentials are needed.

mod identity;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use engram_config::{AppConfig, TurnConfig};
use engram_llm::mock::HashEmbedder;
use engram_llm::{ChatMessage, ChatModel, Embedder, OpenAiCompatClient};
use engram_memory::{
    CoreMemoryManager, InMemoryVectorStore, RecallMemoryManager, VectorStore, shared_rest_store,
};
use engram_runtime::{ConversationState, MemoryGraph};

use identity::AGENT_IDENTITY;

#[derive(Debug, Parser)]
#[command(name = "engram", version, about = "A long-term-memory conversational agent")]
struct Cli {
    /// User id owning the memories touched in this session.
    #[arg(long, default_value = "local-user")]
    user: String,

    /// Thread id; a fresh one is generated when omitted.
    #[arg(long)]
    thread: Option<String>,

    /// Path to the TOML config file.
    #[arg(long, default_value = "engram.toml")]
    config: String,

    /// Run fully in-process: in-memory store, hash embedder, canned
    /// reasoning.  No network calls, no credentials.
    #[arg(long)]
    offline: bool,
}

/// Credential-free reasoning stand-in for `--offline` runs: answers with a
/// summary of what the memory layer loaded, which is enough to see the
/// graph working end to end.
struct OfflineChatModel;

#[async_trait::async_trait]
impl ChatModel for OfflineChatModel {
    async fn chat(
        &self,
        _model: &str,
        system: &str,
        messages: &[ChatMessage],
        _tools: Option<&serde_json::Value>,
    ) -> Result<ChatMessage> {
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        let context_lines = system.lines().count();
        Ok(ChatMessage::assistant(format!(
            "(offline) heard: {last:?} — system context was {context_lines} lines"
        )))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)?;

    let graph = build_graph(&config, cli.offline)?;
    let identity = AGENT_IDENTITY
        .get_or_init(|| async { resolve_identity(&config).await })
        .await?;
    info!(%identity, offline = cli.offline, "engram ready");

    let thread_id = cli.thread.unwrap_or_else(|| Uuid::new_v4().to_string());
    let turn_config = TurnConfig::new(cli.user, thread_id);
    turn_config.validate()?;

    // One turn per input line; the loop serializes turns for this thread,
    // as the front-end contract requires.
    let stdin = io::stdin();
    print!("> ");
    io::stdout().flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() || text == "/quit" {
            break;
        }

        let mut state = ConversationState::for_user_message(text);
        match graph.run_turn(&mut state, &turn_config).await {
            Ok(reply) => println!("{}", reply.content),
            // Turn-level failure: report it, keep the session alive.
            Err(err) => eprintln!("turn failed: {err}"),
        }
        print!("> ");
        io::stdout().flush()?;
    }
    Ok(())
}

fn build_graph(config: &AppConfig, offline: bool) -> Result<MemoryGraph> {
    let (chat, embedder, store): (Arc<dyn ChatModel>, Arc<dyn Embedder>, Arc<dyn VectorStore>) =
        if offline {
            (
                Arc::new(OfflineChatModel),
                Arc::new(HashEmbedder::new(config.llm.embed_dimensions)),
                Arc::new(InMemoryVectorStore::new()),
            )
        } else {
            let client = Arc::new(OpenAiCompatClient::from_env(
                &config.llm.base_url,
                &config.llm.embed_model,
                config.llm.embed_dimensions,
            )?);
            (
                client.clone(),
                client,
                shared_rest_store(&config.vector),
            )
        };

    let core = Arc::new(CoreMemoryManager::new(
        store.clone(),
        config.llm.embed_dimensions,
    ));
    let recall = Arc::new(RecallMemoryManager::new(store, embedder));
    Ok(MemoryGraph::new(config.clone(), chat, core, recall))
}

/// Stand-in for the deployment's assistant lookup: the id comes from the
/// environment when pinned, otherwise one is minted for this process.
async fn resolve_identity(config: &AppConfig) -> Result<String> {
    if let Ok(id) = std::env::var("ENGRAM_AGENT_ID") {
        if !id.trim().is_empty() {
            return Ok(id);
        }
    }
    Ok(format!("engram:{}:{}", config.llm.chat_model, Uuid::new_v4()))
}
