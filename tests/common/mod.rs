#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use recwatch::channels::{Channel, ChannelInfo, ChannelMessage, HistoryMessage};
use recwatch::config::{Config, PacingConfig};
use recwatch::llm::Provider;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub const HOME: &str = "900";

/// In-memory channel: records what is sent, fails on demand.
#[derive(Default)]
pub struct MemoryChannel {
    pub sent: Mutex<Vec<(String, String)>>,
    pub typing: Mutex<Vec<String>>,
    pub fail_send: AtomicBool,
    pub fail_lookup: AtomicBool,
    pub history: Mutex<Vec<HistoryMessage>>,
}

impl MemoryChannel {
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub fn set_fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_lookup(&self, fail: bool) {
        self.fail_lookup.store(fail, Ordering::SeqCst);
    }

    pub fn push_history(&self, id: &str, author: &str, content: &str, minutes_ago: i64) {
        self.history.lock().unwrap().push(HistoryMessage {
            id: id.into(),
            author_name: author.into(),
            author_is_bot: false,
            content: content.into(),
            timestamp: Utc::now() - TimeDelta::minutes(minutes_ago),
        });
    }
}

#[async_trait]
impl Channel for MemoryChannel {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, message: &str, target: &str) -> anyhow::Result<()> {
        if self.fail_send.load(Ordering::SeqCst) {
            anyhow::bail!("503 upstream unavailable");
        }
        self.sent
            .lock()
            .unwrap()
            .push((message.to_string(), target.to_string()));
        Ok(())
    }

    async fn send_typing(&self, target: &str) -> anyhow::Result<()> {
        self.typing.lock().unwrap().push(target.to_string());
        Ok(())
    }

    async fn fetch_channel(&self, channel_id: &str) -> anyhow::Result<ChannelInfo> {
        if self.fail_lookup.load(Ordering::SeqCst) {
            anyhow::bail!("404 Unknown Channel");
        }
        Ok(ChannelInfo {
            id: channel_id.to_string(),
            name: "surveillance".into(),
            guild_name: Some("night shift".into()),
            member_count: Some(12),
        })
    }

    async fn fetch_recent_messages(
        &self,
        _channel_id: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<HistoryMessage>> {
        Ok(self.history.lock().unwrap().iter().take(limit).cloned().collect())
    }

    async fn listen(&self, _tx: tokio::sync::mpsc::Sender<ChannelMessage>) -> anyhow::Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Provider replaying scripted answers in order; `None` entries fail.
/// Once the script runs out it keeps failing.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Option<String>>>,
    pub prompts: Mutex<Vec<(String, String, u32)>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(Into::into)).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> Option<(String, String, u32)> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat_with_system(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        _model: &str,
        _temperature: f64,
        max_tokens: u32,
    ) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push((
            system_prompt.unwrap_or_default().to_string(),
            message.to_string(),
            max_tokens,
        ));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .ok_or_else(|| anyhow::anyhow!("generation service unavailable"))
    }
}

/// Complete config for tests: fixed secret, instant pacing.
pub fn config(words: &[&str]) -> Config {
    let mut config = Config {
        bot_token: Some("MTIzNDU2Nzg5.fake.token".into()),
        channel_id: Some(HOME.into()),
        api_key: Some("sk-test".into()),
        pacing: PacingConfig {
            typing_min_ms: 0,
            typing_max_ms: 0,
            batch_gap_min_ms: 0,
            batch_gap_max_ms: 0,
        },
        ..Config::default()
    };
    config.secret.words = words.iter().map(|w| (*w).to_string()).collect();
    config
}
