//! Conversation title generation helpers.
//!
//! Titles are produced by asking the conversation's own AI session, so the
//! model sees the full exchange. The question and its answer are removed
//! from the session afterwards (see `SessionRegistry::ask_ephemeral`).

use tebnegar_types::conversation::MAX_TITLE_CHARS;

/// Hidden prompt asking the session for a conversation title.
pub const TITLE_PROMPT: &str = "[SYSTEM PROMPT]: Based on our conversation so far, \
what is a concise, 5-word-maximum title for this chat? \
Respond with only the title and nothing else.";

/// Title returned whenever no title can be generated.
pub const FALLBACK_TITLE: &str = "New Conversation";

/// Trim whitespace and surrounding quotes from a model reply.
///
/// Returns `None` when nothing is left. Overlong titles are cut to the
/// maximum stored title length.
pub fn clean_title(raw: &str) -> Option<String> {
    let title = raw.trim().trim_matches(['"', '\'']).trim();
    if title.is_empty() {
        return None;
    }
    Some(title.chars().take(MAX_TITLE_CHARS).collect())
}
