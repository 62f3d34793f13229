//! Daemon wiring: builds the pipeline from config, starts the scheduler, the
//! Discord listener, the inbound handler and the health endpoint, and tears
//! them down on Ctrl-C.

mod supervisor;

use crate::channels::{Channel, ChannelMessage, DiscordChannel, TypedDelivery};
use crate::config::Config;
use crate::diagnostics::health;
use crate::error::ConfigError;
use crate::generation::GenerationAdapter;
use crate::keywords::{DEFAULT_TRIGGER_WORDS, KeywordDetector};
use crate::llm::{OpenAiProvider, Provider};
use crate::persona::PersonaSet;
use crate::router::{AutonomousBroadcaster, ContextPipeline, PipelineSettings};
use crate::scheduler::BroadcastScheduler;
use crate::secret::SecretSequence;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use supervisor::{Backoff, spawn_component_supervisor};

const INBOUND_QUEUE: usize = 100;

/// Collaborators the daemon runs against. Split from [`run`] so tests can
/// inject in-memory channel and provider implementations.
pub struct Collaborators {
    pub channel: Arc<dyn Channel>,
    pub provider: Arc<dyn Provider>,
}

pub fn build_pipeline(config: &Config, collaborators: &Collaborators) -> Result<ContextPipeline> {
    let channel_id = required(config.channel_id.as_deref(), "channel_id (CHANNEL_ID)")?;
    let personas = PersonaSet::from_config(&config.personas, &config.pacing)?;
    let keywords = KeywordDetector::new(
        DEFAULT_TRIGGER_WORDS
            .iter()
            .copied()
            .chain(config.extra_keywords.iter().map(String::as_str)),
    );
    let adapter = GenerationAdapter::new(
        Arc::clone(&collaborators.provider),
        &config.model,
        &config.secret.status_tag,
    );
    let delivery = TypedDelivery::new(Arc::clone(&collaborators.channel), config.pacing);

    Ok(ContextPipeline::new(
        personas,
        keywords,
        adapter,
        delivery,
        PipelineSettings {
            home_channel_id: channel_id.to_string(),
            reply_anywhere: config.reply_anywhere,
            lines_per_broadcast: config.schedule.lines_per_broadcast,
        },
    ))
}

/// The secret cursor, or `None` when the reveal is disabled.
pub fn build_sequence(config: &Config) -> Result<Option<SecretSequence>, ConfigError> {
    if !config.secret.enabled {
        return Ok(None);
    }
    SecretSequence::from_plaintext(&config.secret.words, config.secret.codec()?).map(Some)
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, ConfigError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

pub async fn run(config: Arc<Config>) -> Result<()> {
    config.validate()?;

    let bot_token = required(config.bot_token.as_deref(), "bot_token (BOT_TOKEN)")?;
    let provider: Arc<dyn Provider> = Arc::new(OpenAiProvider::new(
        config.api_key.as_deref(),
        &config.api_base_url,
    ));
    if let Err(e) = provider.warmup().await {
        tracing::warn!("Provider warmup failed (non-fatal): {e:#}");
    }
    let channel: Arc<dyn Channel> =
        Arc::new(DiscordChannel::new(bot_token, config.discord.clone()));
    if !channel.health_check().await {
        tracing::warn!("Discord REST check failed; the token may be invalid");
    }

    run_with(config, Collaborators { channel, provider }).await
}

pub async fn run_with(config: Arc<Config>, collaborators: Collaborators) -> Result<()> {
    let pipeline = Arc::new(build_pipeline(&config, &collaborators)?);
    let sequence = build_sequence(&config)?;
    health::mark_component_ok("daemon");

    announce_target(collaborators.channel.as_ref(), &pipeline.settings().home_channel_id).await;

    let broadcaster = AutonomousBroadcaster::new(Arc::clone(&pipeline), sequence);
    let mut scheduler = BroadcastScheduler::new(config.schedule.policy, broadcaster);
    if let Some(delay) = config.schedule.initial_delay() {
        scheduler = scheduler.with_warmup(delay);
    }
    let scheduler = scheduler.start();

    let (tx, rx) = mpsc::channel::<ChannelMessage>(INBOUND_QUEUE);
    let mut handles: Vec<JoinHandle<()>> = vec![spawn_inbound_handler(Arc::clone(&pipeline), rx)];
    let backoff = Backoff::from(&config.reliability);

    let listener_channel = Arc::clone(&collaborators.channel);
    handles.push(spawn_component_supervisor("listener", backoff, move || {
        let channel = Arc::clone(&listener_channel);
        let tx = tx.clone();
        async move { channel.listen(tx).await }
    }));

    if config.health.enabled {
        let host = config.health.host.clone();
        let port = config.health.port;
        handles.push(spawn_component_supervisor("http", backoff, move || {
            let host = host.clone();
            async move { crate::gateway::run_gateway(&host, port).await }
        }));
    }

    tracing::info!("📹 .REC is now ONLINE and WATCHING");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    health::mark_component_error("daemon", "shutdown requested");

    match scheduler.stop().await {
        Ok(broadcaster) => {
            if let Some(sequence) = broadcaster.sequence() {
                tracing::info!(cursor = sequence.cursor(), "scheduler stopped");
            }
        }
        Err(e) => tracing::warn!("{e:#}"),
    }

    for handle in &handles {
        handle.abort();
    }
    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}

async fn announce_target(channel: &dyn Channel, channel_id: &str) {
    match channel.fetch_channel(channel_id).await {
        Ok(info) => tracing::info!(
            "Target channel: #{} ({})",
            info.name,
            info.guild_name.as_deref().unwrap_or("no server")
        ),
        Err(e) => tracing::error!("Error fetching channel {channel_id}: {e:#}"),
    }
}

/// One task, one message at a time: replies never interleave with each other.
fn spawn_inbound_handler(
    pipeline: Arc<ContextPipeline>,
    mut rx: mpsc::Receiver<ChannelMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Some(event) = pipeline.event_for(&msg).await else {
                continue;
            };
            let outcome = pipeline.handle(event, None).await;
            tracing::debug!(author = %msg.author_name, ?outcome, "inbound handled");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            bot_token: Some("token".into()),
            channel_id: Some("123".into()),
            api_key: Some("sk-test".into()),
            ..Config::default()
        }
    }

    #[test]
    fn sequence_follows_secret_config() {
        let mut cfg = config();
        let sequence = build_sequence(&cfg).unwrap().unwrap();
        assert_eq!(sequence.len(), 5);
        assert_eq!(sequence.peek().obfuscated(), "WKH");

        cfg.secret.enabled = false;
        assert!(build_sequence(&cfg).unwrap().is_none());
    }

    #[test]
    fn blank_channel_id_is_missing() {
        assert!(matches!(
            required(Some("  "), "channel_id"),
            Err(ConfigError::Missing("channel_id"))
        ));
        assert_eq!(required(Some(" 42 "), "channel_id").unwrap(), "42");
    }
}
