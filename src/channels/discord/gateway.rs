use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use rand::Rng;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Instant, interval};
use tokio_tungstenite::tungstenite::Message;

use super::http_client::DiscordHttpClient;
use super::types::{DEFAULT_HEARTBEAT_INTERVAL_MS, GatewayOpcode};

/// Session data that survives a reconnect so the next connection can resume.
#[derive(Debug)]
pub struct DiscordGatewayState {
    pub session_id: Mutex<Option<String>>,
    pub sequence: AtomicI64,
    pub resume_gateway_url: Mutex<Option<String>>,
}

impl Default for DiscordGatewayState {
    fn default() -> Self {
        Self {
            session_id: Mutex::new(None),
            sequence: AtomicI64::new(-1),
            resume_gateway_url: Mutex::new(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    MessageCreate {
        message_id: String,
        channel_id: String,
        guild_id: Option<String>,
        author_id: String,
        author_name: String,
        author_is_bot: bool,
        content: String,
        mention_ids: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    Ready {
        session_id: String,
        resume_gateway_url: String,
        user_id: String,
    },
}

/// Heartbeat bookkeeping for one connection.
struct Heartbeat {
    interval_ms: u64,
    acked: bool,
    ack_deadline: Option<Instant>,
}

pub struct DiscordGateway {
    bot_token: String,
    intents: u64,
    state: Arc<DiscordGatewayState>,
    presence: Option<Value>,
}

impl DiscordGateway {
    pub fn new(
        bot_token: String,
        intents: u64,
        state: Arc<DiscordGatewayState>,
        presence: Option<Value>,
    ) -> Self {
        Self {
            bot_token,
            intents,
            state,
            presence,
        }
    }

    /// Run one gateway connection until it closes or asks for a reconnect.
    /// `Ok(())` means the caller should reconnect.
    pub async fn connect_and_listen(
        &self,
        http: &DiscordHttpClient,
        tx: &mpsc::Sender<GatewayEvent>,
    ) -> Result<()> {
        let gateway_url = self.resolve_gateway_url(http).await?;
        let ws_url = build_gateway_ws_url(&gateway_url);

        let (ws_stream, _) = tokio_tungstenite::connect_async(&ws_url)
            .await
            .with_context(|| format!("connect Discord gateway websocket: {ws_url}"))?;
        let (mut write, mut read) = ws_stream.split();

        let interval_ms = read_hello_heartbeat_interval(&mut read).await?;
        self.send_identify_or_resume(&mut write).await?;

        let mut ticker = interval(Duration::from_millis(interval_ms));
        let mut heartbeat = Heartbeat {
            interval_ms,
            acked: true,
            ack_deadline: None,
        };

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.send_heartbeat_if_healthy(&mut write, &mut heartbeat).await? {
                        tracing::warn!("Discord gateway heartbeat ACK missing; reconnecting");
                        return Ok(());
                    }
                }
                () = wait_for_ack_timeout(heartbeat.ack_deadline) => {
                    if !heartbeat.acked {
                        tracing::warn!("Discord gateway heartbeat ACK timeout; reconnecting");
                        return Ok(());
                    }
                    heartbeat.ack_deadline = None;
                }
                message = read.next() => {
                    let Some(message) = message else {
                        tracing::warn!("Discord gateway socket closed; reconnecting");
                        return Ok(());
                    };

                    let message = message.context("read Discord gateway message")?;
                    if !self.handle_gateway_message(message, tx, &mut write, &mut heartbeat).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn resolve_gateway_url(&self, http: &DiscordHttpClient) -> Result<String> {
        if let Some(url) = self.state.resume_gateway_url.lock().await.clone()
            && !url.is_empty()
        {
            return Ok(url);
        }

        let gw_resp = http
            .get_gateway_bot()
            .await
            .context("fetch Discord gateway/bot URL")?;
        Ok(gw_resp
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or("wss://gateway.discord.gg")
            .to_string())
    }

    async fn send_identify_or_resume<WsSink>(&self, write: &mut WsSink) -> Result<()>
    where
        WsSink: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        if let Some(session_id) = self.state.session_id.lock().await.clone() {
            let payload = json!({
                "op": GatewayOpcode::Resume as u8,
                "d": {
                    "token": self.bot_token,
                    "session_id": session_id,
                    "seq": self.state.sequence.load(Ordering::SeqCst),
                }
            });
            write
                .send(Message::Text(payload.to_string().into()))
                .await
                .context("send Discord gateway resume")?;
            return Ok(());
        }

        write
            .send(Message::Text(self.identify_payload().to_string().into()))
            .await
            .context("send Discord gateway identify")
    }

    fn identify_payload(&self) -> Value {
        let mut identify_data = json!({
            "token": self.bot_token,
            "intents": self.intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "recwatch",
                "device": "recwatch"
            }
        });

        if let Some(presence) = &self.presence {
            identify_data["presence"] = presence.clone();
        }

        json!({
            "op": GatewayOpcode::Identify as u8,
            "d": identify_data,
        })
    }

    async fn send_heartbeat_if_healthy<WsSink>(
        &self,
        write: &mut WsSink,
        heartbeat: &mut Heartbeat,
    ) -> Result<bool>
    where
        WsSink: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        if !heartbeat.acked {
            return Ok(false);
        }

        let payload = json!({
            "op": GatewayOpcode::Heartbeat as u8,
            "d": self.current_sequence(),
        });

        write
            .send(Message::Text(payload.to_string().into()))
            .await
            .context("send Discord gateway heartbeat")?;

        heartbeat.acked = false;
        heartbeat.ack_deadline =
            Some(Instant::now() + Duration::from_millis(heartbeat.interval_ms));
        Ok(true)
    }

    async fn handle_gateway_message<WsSink>(
        &self,
        message: Message,
        tx: &mpsc::Sender<GatewayEvent>,
        write: &mut WsSink,
        heartbeat: &mut Heartbeat,
    ) -> Result<bool>
    where
        WsSink: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
    {
        let Some(raw) = websocket_message_to_text(message) else {
            return Ok(true);
        };

        let payload: Value = serde_json::from_str(&raw).context("parse Discord gateway payload")?;

        if let Some(sequence) = payload.get("s").and_then(Value::as_i64) {
            self.state.sequence.store(sequence, Ordering::SeqCst);
        }

        let op = payload
            .get("op")
            .and_then(Value::as_u64)
            .and_then(GatewayOpcode::from_u64);

        match op {
            Some(GatewayOpcode::Heartbeat) => self.send_heartbeat_if_healthy(write, heartbeat).await,
            Some(GatewayOpcode::HeartbeatAck) => {
                heartbeat.acked = true;
                heartbeat.ack_deadline = None;
                Ok(true)
            }
            Some(GatewayOpcode::Reconnect) => {
                tracing::info!("Discord gateway requested reconnect");
                Ok(false)
            }
            Some(GatewayOpcode::InvalidSession) => {
                self.handle_invalid_session(&payload).await;
                Ok(false)
            }
            Some(GatewayOpcode::Dispatch) => {
                self.handle_dispatch_payload(&payload, tx).await?;
                Ok(true)
            }
            _ => Ok(true),
        }
    }

    async fn handle_dispatch_payload(
        &self,
        payload: &Value,
        tx: &mpsc::Sender<GatewayEvent>,
    ) -> Result<()> {
        let event_type = payload.get("t").and_then(Value::as_str).unwrap_or("");
        let Some(data) = payload.get("d") else {
            return Ok(());
        };

        if let Some(event) = parse_dispatch_event(event_type, data) {
            if let GatewayEvent::Ready {
                session_id,
                resume_gateway_url,
                ..
            } = &event
            {
                *self.state.session_id.lock().await = Some(session_id.clone());
                *self.state.resume_gateway_url.lock().await = Some(resume_gateway_url.clone());
            }
            tx.send(event)
                .await
                .context("dispatch parsed Discord gateway event")?;
        }

        Ok(())
    }

    async fn handle_invalid_session(&self, payload: &Value) {
        let can_resume = payload.get("d").and_then(Value::as_bool).unwrap_or(false);

        self.state.sequence.store(-1, Ordering::SeqCst);
        *self.state.session_id.lock().await = None;

        if can_resume {
            let wait_secs = rand::rng().random_range(1..=5);
            tracing::warn!(
                "Discord gateway invalid session (resume allowed), waiting {wait_secs}s before reconnect"
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
            return;
        }

        tracing::warn!("Discord gateway invalid session (resume denied), clearing resume URL");
        *self.state.resume_gateway_url.lock().await = None;
    }

    fn current_sequence(&self) -> Value {
        let sequence = self.state.sequence.load(Ordering::SeqCst);
        if sequence < 0 {
            Value::Null
        } else {
            json!(sequence)
        }
    }
}

pub fn parse_dispatch_event(event_type: &str, d: &Value) -> Option<GatewayEvent> {
    match event_type {
        "READY" => parse_ready_event(d),
        "MESSAGE_CREATE" => parse_message_create_event(d),
        "RESUMED" => {
            tracing::info!("Discord gateway session resumed");
            None
        }
        _ => None,
    }
}

fn parse_ready_event(d: &Value) -> Option<GatewayEvent> {
    Some(GatewayEvent::Ready {
        session_id: d.get("session_id")?.as_str()?.to_string(),
        resume_gateway_url: d.get("resume_gateway_url")?.as_str()?.to_string(),
        user_id: d.get("user")?.get("id")?.as_str()?.to_string(),
    })
}

fn parse_message_create_event(d: &Value) -> Option<GatewayEvent> {
    let author = d.get("author")?;
    let author_id = author.get("id")?.as_str()?.to_string();
    let author_name = author
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or(&author_id)
        .to_string();
    let mention_ids = d
        .get("mentions")
        .and_then(Value::as_array)
        .map(|mentions| {
            mentions
                .iter()
                .filter_map(|user| user.get("id").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let timestamp = d
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map_or_else(Utc::now, |ts| ts.with_timezone(&Utc));

    Some(GatewayEvent::MessageCreate {
        message_id: d.get("id")?.as_str()?.to_string(),
        channel_id: d.get("channel_id")?.as_str()?.to_string(),
        guild_id: d
            .get("guild_id")
            .and_then(Value::as_str)
            .map(str::to_string),
        author_is_bot: author.get("bot").and_then(Value::as_bool).unwrap_or(false),
        author_id,
        author_name,
        content: d
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        mention_ids,
        timestamp,
    })
}

async fn wait_for_ack_timeout(deadline: Option<Instant>) {
    if let Some(deadline) = deadline {
        tokio::time::sleep_until(deadline).await;
    } else {
        futures_util::future::pending::<()>().await;
    }
}

async fn read_hello_heartbeat_interval<WsRead>(read: &mut WsRead) -> Result<u64>
where
    WsRead:
        Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(message) = read.next().await {
        let message = message.context("read Discord gateway hello payload")?;
        let Some(raw) = websocket_message_to_text(message) else {
            continue;
        };

        let payload: Value =
            serde_json::from_str(&raw).context("parse Discord gateway hello JSON")?;

        let op = payload
            .get("op")
            .and_then(Value::as_u64)
            .and_then(GatewayOpcode::from_u64);

        if op == Some(GatewayOpcode::Hello) {
            return Ok(payload
                .get("d")
                .and_then(|d| d.get("heartbeat_interval"))
                .and_then(Value::as_u64)
                .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_MS));
        }
    }

    Err(anyhow::anyhow!("Discord gateway closed before Hello"))
}

fn websocket_message_to_text(message: Message) -> Option<String> {
    match message {
        Message::Text(text) => Some(text.to_string()),
        Message::Binary(bytes) => String::from_utf8(bytes.to_vec()).ok(),
        _ => None,
    }
}

fn build_gateway_ws_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    format!("{trimmed}/?v=10&encoding=json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gateway_state_default_construction() {
        let state = DiscordGatewayState::default();
        assert_eq!(state.sequence.load(Ordering::SeqCst), -1);
        assert!(state.session_id.lock().await.is_none());
        assert!(state.resume_gateway_url.lock().await.is_none());
    }

    #[test]
    fn parse_message_create_with_mentions() {
        let payload = json!({
            "id": "msg-1",
            "channel_id": "chan-42",
            "guild_id": "guild-7",
            "content": "<@bot-1> are you there",
            "timestamp": "2026-03-01T10:15:00+00:00",
            "author": { "id": "user-1", "username": "mira", "bot": false },
            "mentions": [{ "id": "bot-1", "username": "rec" }]
        });

        let Some(GatewayEvent::MessageCreate {
            message_id,
            channel_id,
            guild_id,
            author_id,
            author_name,
            author_is_bot,
            content,
            mention_ids,
            timestamp,
        }) = parse_dispatch_event("MESSAGE_CREATE", &payload)
        else {
            panic!("expected MessageCreate event");
        };

        assert_eq!(message_id, "msg-1");
        assert_eq!(channel_id, "chan-42");
        assert_eq!(guild_id.as_deref(), Some("guild-7"));
        assert_eq!(author_id, "user-1");
        assert_eq!(author_name, "mira");
        assert!(!author_is_bot);
        assert_eq!(content, "<@bot-1> are you there");
        assert_eq!(mention_ids, vec!["bot-1"]);
        assert_eq!(timestamp.timestamp(), 1_772_360_100);
    }

    #[test]
    fn direct_message_has_no_guild() {
        let payload = json!({
            "id": "msg-2",
            "channel_id": "dm-1",
            "content": "hello?",
            "author": { "id": "user-2", "username": "jo" }
        });
        let Some(GatewayEvent::MessageCreate {
            guild_id,
            mention_ids,
            ..
        }) = parse_dispatch_event("MESSAGE_CREATE", &payload)
        else {
            panic!("expected MessageCreate event");
        };
        assert!(guild_id.is_none());
        assert!(mention_ids.is_empty());
    }

    #[test]
    fn parse_ready_event_payload() {
        let payload = json!({
            "session_id": "session-1",
            "resume_gateway_url": "wss://gateway.discord.gg",
            "user": { "id": "bot-user" }
        });

        assert_eq!(
            parse_dispatch_event("READY", &payload),
            Some(GatewayEvent::Ready {
                session_id: "session-1".into(),
                resume_gateway_url: "wss://gateway.discord.gg".into(),
                user_id: "bot-user".into(),
            })
        );
    }

    #[test]
    fn unknown_event_returns_none() {
        assert!(parse_dispatch_event("TYPING_START", &json!({})).is_none());
    }

    #[test]
    fn identify_carries_presence_and_intents() {
        let gateway = DiscordGateway::new(
            "token".into(),
            37377,
            Arc::new(DiscordGatewayState::default()),
            Some(json!({ "status": "dnd" })),
        );
        let payload = gateway.identify_payload();
        assert_eq!(payload["op"], 2);
        assert_eq!(payload["d"]["intents"], 37377);
        assert_eq!(payload["d"]["presence"]["status"], "dnd");
    }

    #[test]
    fn ws_url_has_version_and_encoding() {
        assert_eq!(
            build_gateway_ws_url("wss://gateway.discord.gg/"),
            "wss://gateway.discord.gg/?v=10&encoding=json"
        );
    }
}
