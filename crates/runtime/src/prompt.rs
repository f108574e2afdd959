//! System context assembly for the reasoning call.

use chrono::Utc;

/// Render the system context block: persona, both memory listings, and the
/// current time.  Purely synchronous — memories are loaded before this runs.
pub fn render_system_context(core_memories: &[String], recall_memories: &[String]) -> String {
    format!(
        "You are a helpful assistant with long-term memory. Powered by a stateless \
         LLM, you must rely on the memory tools to store and retrieve information \
         between conversations. Save important facts about the user as core memories, \
         and events or context as recall memories. Incorporate what you already know \
         naturally, without mentioning your memory capabilities. If you call tools, \
         respond to the user only after the tool results come back.\n\n\
         ## Core Memories\n\
         Fundamental facts about the user, always available:\n{core}\n\n\
         ## Recall Memories\n\
         Contextually retrieved for the current conversation:\n{recall}\n\n\
         Current system time: {now}",
        core = delimited_listing("core_memory", core_memories),
        recall = delimited_listing("recall_memory", recall_memories),
        now = Utc::now().to_rfc3339(),
    )
}

/// Simple delimited listing, one memory per line:
/// `<tag>\nfirst\nsecond\n</tag>`.
fn delimited_listing(tag: &str, memories: &[String]) -> String {
    format!("<{tag}>\n{}\n</{tag}>", memories.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_embeds_both_memory_listings() {
        let context = render_system_context(
            &["has a dog named spot".to_string()],
            &["went to the beach".to_string(), "likes tea".to_string()],
        );
        assert!(context.contains("<core_memory>\nhas a dog named spot\n</core_memory>"));
        assert!(context.contains("<recall_memory>\nwent to the beach\nlikes tea\n</recall_memory>"));
        assert!(context.contains("Current system time:"));
    }

    #[test]
    fn empty_memories_render_empty_blocks() {
        let context = render_system_context(&[], &[]);
        assert!(context.contains("<core_memory>\n\n</core_memory>"));
    }
}
