//! Persona contracts: one system prompt, content brief, and response policy
//! per event kind.

mod templates;

use crate::config::{
    BROADCAST_MAX_TOKENS, PacingConfig, PersonaTuning, PersonasConfig, REPLY_MAX_TOKENS, TypingBand,
};
use crate::error::PromptError;
use crate::prompt::{PromptTemplate, Slot, SlotValues};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PersonaKind {
    Public,
    Private,
    Autonomous,
}

impl PersonaKind {
    fn system_slots(self) -> &'static [Slot] {
        match self {
            Self::Public | Self::Private => &[Slot::DisplayName],
            Self::Autonomous => &[Slot::SecretToken],
        }
    }

    fn brief_slots(self) -> &'static [Slot] {
        match self {
            Self::Public => &[
                Slot::ServerName,
                Slot::DisplayName,
                Slot::Message,
                Slot::Keywords,
                Slot::History,
            ],
            Self::Private => &[Slot::DisplayName, Slot::Message, Slot::Keywords],
            Self::Autonomous => &[
                Slot::LineCount,
                Slot::ServerName,
                Slot::MemberCount,
                Slot::RecentActivity,
                Slot::SecretToken,
            ],
        }
    }

    fn default_system(self) -> String {
        let specific = match self {
            Self::Public => templates::PUBLIC_SYSTEM,
            Self::Private => templates::PRIVATE_SYSTEM,
            Self::Autonomous => templates::AUTONOMOUS_SYSTEM,
        };
        format!("{}{specific}", templates::PERSONA_CORE)
    }

    fn default_max_tokens(self) -> u32 {
        match self {
            Self::Public | Self::Private => REPLY_MAX_TOKENS,
            Self::Autonomous => BROADCAST_MAX_TOKENS,
        }
    }

    fn default_brief(self) -> &'static str {
        match self {
            Self::Public => templates::PUBLIC_BRIEF,
            Self::Private => templates::PRIVATE_BRIEF,
            Self::Autonomous => templates::AUTONOMOUS_BRIEF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseLength {
    pub min_tokens: u32,
    pub max_tokens: u32,
}

#[derive(Debug)]
pub struct PersonaDefinition {
    kind: PersonaKind,
    system_prompt: PromptTemplate,
    brief: PromptTemplate,
    length: ResponseLength,
    temperature: f64,
    typing: TypingBand,
}

impl PersonaDefinition {
    /// `pacing` supplies whichever end of the typing band the persona leaves unset.
    pub fn build(
        kind: PersonaKind,
        tuning: &PersonaTuning,
        pacing: &PacingConfig,
    ) -> Result<Self, PromptError> {
        let system_source = tuning
            .system_prompt
            .clone()
            .unwrap_or_else(|| kind.default_system());
        let system_prompt = PromptTemplate::new(
            &format!("{kind}_system"),
            &system_source,
            kind.system_slots(),
        )?;
        let brief = PromptTemplate::new(
            &format!("{kind}_brief"),
            kind.default_brief(),
            kind.brief_slots(),
        )?;

        let (min_tokens, max_tokens) = tuning.token_bounds(kind.default_max_tokens());
        Ok(Self {
            kind,
            system_prompt,
            brief,
            length: ResponseLength {
                min_tokens,
                max_tokens,
            },
            temperature: tuning.temperature.clamp(0.0, 1.0),
            typing: tuning.typing_band(pacing),
        })
    }

    pub fn kind(&self) -> PersonaKind {
        self.kind
    }

    pub fn length(&self) -> ResponseLength {
        self.length
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn typing_band(&self) -> TypingBand {
        self.typing
    }

    pub fn render_system(&self, values: &SlotValues) -> Result<String, PromptError> {
        self.system_prompt.render(values)
    }

    pub fn render_brief(&self, values: &SlotValues) -> Result<String, PromptError> {
        self.brief.render(values)
    }
}

/// The three personas, selected by event kind.
#[derive(Debug)]
pub struct PersonaSet {
    public: PersonaDefinition,
    private: PersonaDefinition,
    autonomous: PersonaDefinition,
}

impl PersonaSet {
    pub fn from_config(
        config: &PersonasConfig,
        pacing: &PacingConfig,
    ) -> Result<Self, PromptError> {
        let build = |kind: PersonaKind, tuning: &PersonaTuning| {
            PersonaDefinition::build(kind, tuning, pacing)
        };
        Ok(Self {
            public: build(PersonaKind::Public, &config.public)?,
            private: build(PersonaKind::Private, &config.private)?,
            autonomous: build(PersonaKind::Autonomous, &config.autonomous)?,
        })
    }

    pub fn get(&self, kind: PersonaKind) -> &PersonaDefinition {
        match kind {
            PersonaKind::Public => &self.public,
            PersonaKind::Private => &self.private,
            PersonaKind::Autonomous => &self.autonomous,
        }
    }
}
