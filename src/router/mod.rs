//! Persona router: turns an inbound event into a rendered generation request,
//! runs it through the adapter and hands the result to paced delivery.

mod autonomous;
mod context;

pub use autonomous::AutonomousBroadcaster;
pub use context::{
    ACTIVITY_SAMPLE_LIMIT, MENTION_HISTORY_LIMIT, conversation_lines, keyword_hint,
    recent_activity,
};

use crate::channels::{Channel, ChannelMessage, DeliveryOutcome, TypedDelivery};
use crate::config::TypingBand;
use crate::error::LookupError;
use crate::generation::{GenerationAdapter, GenerationRequest, split_candidates};
use crate::keywords::KeywordDetector;
use crate::persona::{PersonaKind, PersonaSet};
use crate::prompt::{Slot, SlotValues};
use crate::secret::SecretSequence;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Something the bot may answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    PublicMention {
        display_name: String,
        text: String,
        server_name: String,
        /// `name: content` lines, oldest first.
        recent_history: Vec<String>,
        target: String,
    },
    PrivateMessage {
        display_name: String,
        text: String,
        target: String,
    },
    AutonomousTick,
}

impl InboundEvent {
    pub fn persona(&self) -> PersonaKind {
        match self {
            Self::PublicMention { .. } => PersonaKind::Public,
            Self::PrivateMessage { .. } => PersonaKind::Private,
            Self::AutonomousTick => PersonaKind::Autonomous,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The home channel could not be resolved.
    Lookup,
    /// A persona template failed to render.
    Prompt,
    /// The generation service produced nothing usable.
    Generation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Unconstrained text was delivered, one or more lines.
    Delivered { sent: usize, failed: usize },
    /// One token-carrying line went out (or failed to). `advanced` reports
    /// whether the cursor moved.
    Revealed {
        token: String,
        sent: bool,
        fallback: bool,
        advanced: bool,
    },
    Skipped(SkipReason),
}

/// Channel-level routing settings.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Channel receiving broadcasts and, unless `reply_anywhere`, the only
    /// channel whose mentions are answered.
    pub home_channel_id: String,
    pub reply_anywhere: bool,
    pub lines_per_broadcast: usize,
}

pub struct ContextPipeline {
    personas: PersonaSet,
    keywords: KeywordDetector,
    adapter: GenerationAdapter,
    delivery: TypedDelivery,
    settings: PipelineSettings,
    server_names: Mutex<HashMap<String, String>>,
}

impl ContextPipeline {
    pub fn new(
        personas: PersonaSet,
        keywords: KeywordDetector,
        adapter: GenerationAdapter,
        delivery: TypedDelivery,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            personas,
            keywords,
            adapter,
            delivery,
            settings,
            server_names: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    fn channel(&self) -> &Arc<dyn Channel> {
        self.delivery.channel()
    }

    /// Classify a platform message. `None` means the bot stays silent.
    pub async fn event_for(&self, msg: &ChannelMessage) -> Option<InboundEvent> {
        if msg.guild_id.is_none() {
            return Some(InboundEvent::PrivateMessage {
                display_name: msg.author_name.clone(),
                text: msg.content.clone(),
                target: msg.channel_id.clone(),
            });
        }

        if !msg.mentions_bot {
            return None;
        }
        if !self.settings.reply_anywhere && msg.channel_id != self.settings.home_channel_id {
            tracing::debug!(channel = %msg.channel_id, "mention outside home channel ignored");
            return None;
        }

        let history = match self
            .channel()
            .fetch_recent_messages(&msg.channel_id, MENTION_HISTORY_LIMIT)
            .await
        {
            Ok(messages) => conversation_lines(&messages, &msg.message_id),
            Err(e) => {
                tracing::warn!(channel = %msg.channel_id, "history unavailable: {e:#}");
                Vec::new()
            }
        };

        Some(InboundEvent::PublicMention {
            display_name: msg.author_name.clone(),
            text: msg.content.clone(),
            server_name: self.server_name(&msg.channel_id).await,
            recent_history: history,
            target: msg.channel_id.clone(),
        })
    }

    async fn server_name(&self, channel_id: &str) -> String {
        if let Some(name) = self
            .server_names
            .lock()
            .ok()
            .and_then(|cache| cache.get(channel_id).cloned())
        {
            return name;
        }

        match self.channel().fetch_channel(channel_id).await {
            Ok(info) => {
                let name = info.guild_name.unwrap_or(info.name);
                if let Ok(mut cache) = self.server_names.lock() {
                    cache.insert(channel_id.to_string(), name.clone());
                }
                name
            }
            Err(e) => {
                tracing::warn!(channel = channel_id, "server lookup failed: {e:#}");
                "unknown server".to_string()
            }
        }
    }

    /// Run one event end to end. `secret` is consulted only for
    /// [`InboundEvent::AutonomousTick`]; `None` there means a plain batch.
    pub async fn handle(
        &self,
        event: InboundEvent,
        secret: Option<&mut SecretSequence>,
    ) -> PipelineOutcome {
        match event {
            InboundEvent::PublicMention {
                display_name,
                text,
                server_name,
                recent_history,
                target,
            } => {
                let keywords = keyword_hint(&self.keywords.detect(&text));
                let brief = SlotValues::new()
                    .with(Slot::ServerName, server_name)
                    .with(Slot::DisplayName, display_name.as_str())
                    .with(Slot::Message, text)
                    .with(Slot::Keywords, keywords)
                    .with(Slot::History, recent_history.join("\n"));
                self.reply(PersonaKind::Public, &display_name, &brief, &target)
                    .await
            }
            InboundEvent::PrivateMessage {
                display_name,
                text,
                target,
            } => {
                let keywords = keyword_hint(&self.keywords.detect(&text));
                let brief = SlotValues::new()
                    .with(Slot::DisplayName, display_name.as_str())
                    .with(Slot::Message, text)
                    .with(Slot::Keywords, keywords);
                self.reply(PersonaKind::Private, &display_name, &brief, &target)
                    .await
            }
            InboundEvent::AutonomousTick => self.broadcast(secret).await,
        }
    }

    async fn reply(
        &self,
        kind: PersonaKind,
        display_name: &str,
        brief: &SlotValues,
        target: &str,
    ) -> PipelineOutcome {
        let system = SlotValues::new().with(Slot::DisplayName, display_name);
        let Some(request) = self.build_request(kind, &system, brief, None) else {
            return PipelineOutcome::Skipped(SkipReason::Prompt);
        };

        let result = self.adapter.request(&request).await;
        let Some(text) = result.text else {
            tracing::debug!(persona = %kind, "no reply generated; staying silent");
            return PipelineOutcome::Skipped(SkipReason::Generation);
        };

        let band = self.personas.get(kind).typing_band();
        let outcome = self.delivery.deliver(target, &text, band).await;
        if outcome.is_sent() {
            tracing::info!(persona = %kind, "[.REC] responded to {display_name}");
        }
        Self::tally(&[outcome])
    }

    async fn broadcast(&self, secret: Option<&mut SecretSequence>) -> PipelineOutcome {
        let home = self.settings.home_channel_id.as_str();

        let info = match self.channel().fetch_channel(home).await {
            Ok(info) => info,
            Err(e) => {
                let err = LookupError::ChannelNotFound {
                    channel_id: home.to_string(),
                    message: format!("{e:#}"),
                };
                tracing::error!("{err}");
                return PipelineOutcome::Skipped(SkipReason::Lookup);
            }
        };

        let activity = match self
            .channel()
            .fetch_recent_messages(home, ACTIVITY_SAMPLE_LIMIT)
            .await
        {
            Ok(messages) => recent_activity(&messages, Utc::now()),
            Err(e) => {
                tracing::warn!(channel = home, "activity lookup failed: {e:#}");
                context::unknown_activity()
            }
        };

        let token = secret
            .as_deref()
            .map(|sequence| sequence.peek().obfuscated().to_string());
        let token_slot = token.clone().unwrap_or_default();

        let system = SlotValues::new().with(Slot::SecretToken, token_slot.as_str());
        let brief = SlotValues::new()
            .with(Slot::LineCount, self.settings.lines_per_broadcast.to_string())
            .with(Slot::ServerName, info.guild_name.unwrap_or(info.name))
            .with(
                Slot::MemberCount,
                info.member_count
                    .map_or_else(|| "unknown".to_string(), |n| n.to_string()),
            )
            .with(Slot::RecentActivity, activity)
            .with(Slot::SecretToken, token_slot);

        tracing::info!("[.REC] posting autonomous surveillance messages");
        let Some(request) = self.build_request(PersonaKind::Autonomous, &system, &brief, token)
        else {
            return PipelineOutcome::Skipped(SkipReason::Prompt);
        };

        match secret {
            Some(sequence) => self.reveal(sequence, &request).await,
            None => self.batch(&request).await,
        }
    }

    async fn reveal(
        &self,
        sequence: &mut SecretSequence,
        request: &GenerationRequest,
    ) -> PipelineOutcome {
        let token = request.required_token.clone().unwrap_or_default();
        let result = self.adapter.request(request).await;
        let text = result
            .text
            .unwrap_or_else(|| self.adapter.fallback_line(&token));

        let sent = self
            .delivery
            .deliver(&self.settings.home_channel_id, &text, self.broadcast_band())
            .await
            .is_sent();
        if sent {
            sequence.advance();
            tracing::info!(cursor = sequence.cursor(), fallback = result.fallback, "token delivered");
        } else {
            tracing::warn!("token line not delivered; cursor stays at {}", sequence.cursor());
        }

        PipelineOutcome::Revealed {
            token,
            sent,
            fallback: result.fallback,
            advanced: sent,
        }
    }

    async fn batch(&self, request: &GenerationRequest) -> PipelineOutcome {
        let result = self.adapter.request(request).await;
        let Some(text) = result.text else {
            return PipelineOutcome::Skipped(SkipReason::Generation);
        };

        let band = self.broadcast_band();
        let lines = split_candidates(&text, self.settings.lines_per_broadcast);
        let mut outcomes = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                self.delivery.batch_gap().await;
            }
            outcomes.push(
                self.delivery
                    .deliver(&self.settings.home_channel_id, line, band)
                    .await,
            );
        }

        let outcome = Self::tally(&outcomes);
        tracing::info!(?outcome, "[.REC] autonomous batch finished");
        outcome
    }

    fn broadcast_band(&self) -> TypingBand {
        self.personas.get(PersonaKind::Autonomous).typing_band()
    }

    fn build_request(
        &self,
        kind: PersonaKind,
        system: &SlotValues,
        brief: &SlotValues,
        required_token: Option<String>,
    ) -> Option<GenerationRequest> {
        let persona = self.personas.get(kind);
        let rendered = persona
            .render_system(system)
            .and_then(|system_prompt| Ok((system_prompt, persona.render_brief(brief)?)));

        match rendered {
            Ok((system_prompt, user_prompt)) => Some(GenerationRequest {
                system_prompt,
                user_prompt,
                creativity: persona.temperature(),
                length: persona.length(),
                required_token,
            }),
            Err(e) => {
                tracing::error!(persona = %kind, "prompt render failed: {e}");
                None
            }
        }
    }

    fn tally(outcomes: &[DeliveryOutcome]) -> PipelineOutcome {
        let sent = outcomes.iter().filter(|o| o.is_sent()).count();
        PipelineOutcome::Delivered {
            sent,
            failed: outcomes.len() - sent,
        }
    }
}
