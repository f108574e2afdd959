//! Per-turn conversation state and the token-bounded buffer helpers.

use engram_llm::{ChatMessage, Role};

/// Rough chars-per-token ratio for budget math.  The exact tokenizer is a
/// provider detail; an estimate is fine because the budget only bounds
/// embedding latency and cost.
const CHARS_PER_TOKEN: usize = 4;

/// The unit of work flowing through one graph execution.
///
/// `messages` is a monotonically growing log — appended in causal order,
/// never reordered.  The memory slots are refreshed at the start of each
/// turn by the load node, not incrementally merged.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub messages: Vec<ChatMessage>,
    pub core_memories: Vec<String>,
    pub recall_memories: Vec<String>,
}

impl ConversationState {
    /// State for a fresh inbound user turn.
    pub fn for_user_message(text: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(text)],
            core_memories: Vec::new(),
            recall_memories: Vec::new(),
        }
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Flatten the dialogue into one prefixed string, the seed text for the
    /// recall search query.
    pub fn buffer_string(&self) -> String {
        self.messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                };
                format!("{role}: {}", msg.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Keep the most recent `token_budget` tokens' worth of `text` (approximate),
/// cutting on a char boundary.
pub fn tail_by_token_budget(text: &str, token_budget: usize) -> &str {
    let char_budget = token_budget.saturating_mul(CHARS_PER_TOKEN);
    let total = text.chars().count();
    if total <= char_budget {
        return text;
    }
    let skip = total - char_budget;
    match text.char_indices().nth(skip) {
        Some((i, _)) => &text[i..],
        None => text,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_holds_one_user_message() {
        let state = ConversationState::for_user_message("hi");
        assert_eq!(state.messages.len(), 1);
        assert!(state.core_memories.is_empty());
        assert!(state.recall_memories.is_empty());
    }

    #[test]
    fn buffer_string_prefixes_roles() {
        let mut state = ConversationState::for_user_message("hello");
        state.messages.push(ChatMessage::assistant("hey there"));
        let buffer = state.buffer_string();
        assert!(buffer.contains("user: hello"));
        assert!(buffer.contains("assistant: hey there"));
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(tail_by_token_budget("short", 100), "short");
    }

    #[test]
    fn long_text_keeps_the_tail() {
        let text = "a".repeat(100) + "TAIL";
        let tail = tail_by_token_budget(&text, 2); // ~8 chars
        assert_eq!(tail.len(), 8);
        assert!(tail.ends_with("TAIL"));
    }

    #[test]
    fn multibyte_text_cuts_on_char_boundary() {
        let text = "héllo wörld ".repeat(50);
        let tail = tail_by_token_budget(&text, 4);
        assert!(tail.chars().count() <= 16);
        // Must still be valid UTF-8 slicing (would panic above otherwise).
        assert!(!tail.is_empty());
    }
}
