pub mod gateway;
pub mod http_client;
pub mod types;

use crate::channels::traits::{Channel, ChannelInfo, ChannelMessage, HistoryMessage};
use crate::config::DiscordConfig;
use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use self::gateway::{DiscordGateway, DiscordGatewayState, GatewayEvent};
use self::http_client::DiscordHttpClient;
use self::types::{DEFAULT_INTENTS, MAX_MESSAGE_LENGTH};

/// Pause between a clean gateway close and the next connection attempt.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Discord channel: gateway WebSocket for inbound messages, REST for
/// everything else.
pub struct DiscordChannel {
    http: DiscordHttpClient,
    bot_token: String,
    gateway_state: Arc<DiscordGatewayState>,
    config: DiscordConfig,
    bot_user_id: std::sync::Mutex<Option<String>>,
}

struct MessageCreateParams {
    message_id: String,
    channel_id: String,
    guild_id: Option<String>,
    author_id: String,
    author_name: String,
    author_is_bot: bool,
    content: String,
    mention_ids: Vec<String>,
    timestamp: chrono::DateTime<chrono::Utc>,
}

impl DiscordChannel {
    pub fn new(bot_token: &str, config: DiscordConfig) -> Self {
        Self::with_http(DiscordHttpClient::new(bot_token), bot_token, config)
    }

    pub fn with_http(http: DiscordHttpClient, bot_token: &str, config: DiscordConfig) -> Self {
        Self {
            http,
            bot_token: bot_token.to_string(),
            gateway_state: Arc::new(DiscordGatewayState::default()),
            bot_user_id: std::sync::Mutex::new(Self::bot_user_id_from_token(bot_token)),
            config,
        }
    }

    /// The first dot-separated segment of a bot token is the base64 bot id.
    fn bot_user_id_from_token(token: &str) -> Option<String> {
        let part = token.split('.').next()?;
        let bytes = base64::engine::general_purpose::STANDARD_NO_PAD
            .decode(part.trim_end_matches('='))
            .ok()?;
        let id = String::from_utf8(bytes).ok()?;
        (!id.is_empty() && id.chars().all(|c| c.is_ascii_digit())).then_some(id)
    }

    fn intents(&self) -> u64 {
        self.config.intents.unwrap_or(DEFAULT_INTENTS)
    }

    fn build_presence(&self) -> Option<serde_json::Value> {
        let status = self.config.status.as_deref().unwrap_or("online");
        let activity_name = self.config.activity_name.as_deref()?;
        let activity_type = self.config.activity_type.unwrap_or(0);

        Some(serde_json::json!({
            "status": status,
            "activities": [{
                "name": activity_name,
                "type": activity_type,
            }],
            "since": null,
            "afk": false,
        }))
    }

    fn set_bot_user_id(&self, user_id: &str) {
        if let Ok(mut guard) = self.bot_user_id.lock() {
            *guard = Some(user_id.to_string());
        }
    }

    fn bot_user_id(&self) -> Option<String> {
        self.bot_user_id.lock().ok().and_then(|guard| guard.clone())
    }

    async fn handle_gateway_event(&self, event: GatewayEvent, tx: &mpsc::Sender<ChannelMessage>) {
        match event {
            GatewayEvent::Ready { user_id, .. } => {
                self.set_bot_user_id(&user_id);
                tracing::info!("Discord: connected as user {user_id}");
            }
            GatewayEvent::MessageCreate {
                message_id,
                channel_id,
                guild_id,
                author_id,
                author_name,
                author_is_bot,
                content,
                mention_ids,
                timestamp,
            } => {
                let params = MessageCreateParams {
                    message_id,
                    channel_id,
                    guild_id,
                    author_id,
                    author_name,
                    author_is_bot,
                    content,
                    mention_ids,
                    timestamp,
                };
                if let Some(msg) = self.to_channel_message(params)
                    && tx.send(msg).await.is_err()
                {
                    tracing::warn!("Discord: channel message receiver dropped");
                }
            }
        }
    }

    fn to_channel_message(&self, params: MessageCreateParams) -> Option<ChannelMessage> {
        let bot_id = self.bot_user_id();
        if params.author_is_bot || bot_id.as_deref() == Some(params.author_id.as_str()) {
            return None;
        }
        if params.content.trim().is_empty() {
            return None;
        }

        let mentions_bot = bot_id.is_some_and(|id| params.mention_ids.contains(&id));

        Some(ChannelMessage {
            id: Uuid::new_v4().to_string(),
            message_id: params.message_id,
            author_id: params.author_id,
            author_name: params.author_name,
            content: params.content,
            channel_id: params.channel_id,
            guild_id: params.guild_id,
            mentions_bot,
            timestamp: params.timestamp,
        })
    }

    async fn listen_once(&self, tx: &mpsc::Sender<ChannelMessage>) -> anyhow::Result<()> {
        let gateway = DiscordGateway::new(
            self.bot_token.clone(),
            self.intents(),
            Arc::clone(&self.gateway_state),
            self.build_presence(),
        );

        let (event_tx, mut event_rx) = mpsc::channel::<GatewayEvent>(100);

        let mut gateway_handle = {
            let http = DiscordHttpClient::new(&self.bot_token);
            tokio::spawn(async move { gateway.connect_and_listen(&http, &event_tx).await })
        };

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    self.handle_gateway_event(event, tx).await;
                }
                result = &mut gateway_handle => {
                    match result {
                        Ok(result) => result?,
                        Err(e) => anyhow::bail!("Discord gateway task panicked: {e}"),
                    }
                    break;
                }
            }
        }

        // Drain events the gateway emitted right before closing.
        while let Ok(event) = event_rx.try_recv() {
            self.handle_gateway_event(event, tx).await;
        }

        Ok(())
    }
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send(&self, message: &str, channel_id: &str) -> anyhow::Result<()> {
        let content: String = message.chars().take(MAX_MESSAGE_LENGTH).collect();
        self.http.send_message(channel_id, &content).await
    }

    async fn send_typing(&self, channel_id: &str) -> anyhow::Result<()> {
        self.http.send_typing(channel_id).await
    }

    async fn fetch_channel(&self, channel_id: &str) -> anyhow::Result<ChannelInfo> {
        let channel = self.http.get_channel(channel_id).await?;
        let guild = match channel.guild_id.as_deref() {
            Some(guild_id) => Some(
                self.http
                    .get_guild(guild_id)
                    .await
                    .with_context(|| format!("resolve guild of channel {channel_id}"))?,
            ),
            None => None,
        };

        Ok(ChannelInfo {
            name: channel.name.unwrap_or_else(|| channel.id.clone()),
            id: channel.id,
            guild_name: guild.as_ref().map(|g| g.name.clone()),
            member_count: guild.and_then(|g| g.approximate_member_count),
        })
    }

    async fn fetch_recent_messages(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<HistoryMessage>> {
        let messages = self.http.get_messages(channel_id, limit).await?;
        Ok(messages
            .into_iter()
            .map(|m| HistoryMessage {
                id: m.id,
                author_name: m.author.username,
                author_is_bot: m.author.bot,
                content: m.content,
                timestamp: m.timestamp,
            })
            .collect())
    }

    async fn listen(&self, tx: mpsc::Sender<ChannelMessage>) -> anyhow::Result<()> {
        loop {
            self.listen_once(&tx).await?;
            if tx.is_closed() {
                return Ok(());
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn health_check(&self) -> bool {
        self.http.get_current_user().await.is_ok()
    }
}
