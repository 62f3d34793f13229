use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// An inbound message received from the platform.
///
/// `channel_id` is where a reply should go; `guild_id` is `None` for a
/// private conversation.
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    pub id: String,
    pub message_id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub mentions_bot: bool,
    pub timestamp: DateTime<Utc>,
}

/// Resolved destination plus the server context it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
    pub guild_name: Option<String>,
    pub member_count: Option<u64>,
}

/// One message of channel history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryMessage {
    pub id: String,
    pub author_name: String,
    pub author_is_bot: bool,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Chat platform capability: everything the pipeline needs from the outside
/// world, and nothing else.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable platform name
    fn name(&self) -> &str;

    /// Send a message to a channel id
    async fn send(&self, message: &str, target: &str) -> anyhow::Result<()>;

    async fn send_typing(&self, _target: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// Resolve a channel id; fails when the channel does not exist or is not
    /// visible to the bot.
    async fn fetch_channel(&self, channel_id: &str) -> anyhow::Result<ChannelInfo>;

    /// Most recent messages first, at most `limit`.
    async fn fetch_recent_messages(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<HistoryMessage>>;

    /// Start listening for incoming messages (long-running)
    async fn listen(&self, tx: tokio::sync::mpsc::Sender<ChannelMessage>) -> anyhow::Result<()>;

    async fn health_check(&self) -> bool {
        true
    }
}
