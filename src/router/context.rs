//! Plain-text context fragments fed into persona briefs.

use crate::channels::HistoryMessage;
use chrono::{DateTime, Utc};

/// Messages of channel history shown alongside a mention.
pub const MENTION_HISTORY_LIMIT: usize = 5;
/// Messages inspected to describe channel activity for a broadcast.
pub const ACTIVITY_SAMPLE_LIMIT: usize = 10;

const NO_ACTIVITY: &str = "No recent activity detected";

/// `name: content` lines, oldest first, skipping bots and the message that
/// triggered the reply. `messages` arrive most recent first.
pub fn conversation_lines(messages: &[HistoryMessage], trigger_id: &str) -> Vec<String> {
    messages
        .iter()
        .rev()
        .filter(|m| !m.author_is_bot && m.id != trigger_id)
        .map(|m| format!("{}: {}", m.author_name, m.content))
        .collect()
}

/// Describe how long the channel has been quiet, from the most recent
/// message of `messages` (most recent first).
pub fn recent_activity(messages: &[HistoryMessage], now: DateTime<Utc>) -> String {
    match messages.first() {
        Some(last) => {
            let minutes = (now - last.timestamp).num_minutes().max(0);
            format!("Last message was {minutes} minutes ago")
        }
        None => NO_ACTIVITY.to_string(),
    }
}

pub fn unknown_activity() -> String {
    NO_ACTIVITY.to_string()
}

/// Keyword hint line for a brief, empty when nothing matched.
pub fn keyword_hint(keywords: &[&str]) -> String {
    if keywords.is_empty() {
        return String::new();
    }
    format!(
        "Keywords detected: {}. Use these to enhance the horror.",
        keywords.join(", ")
    )
}
