use crate::cipher::{CipherCodec, DEFAULT_SHIFT};
use crate::error::ConfigError;
use crate::scheduler::SchedulePolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Discord bot credential
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Channel that receives broadcasts and public replies
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Generation-service credential
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// OpenAI-compatible API root (no trailing `/chat/completions`)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Answer mentions in any channel the bot can see, not just `channel_id`
    #[serde(default)]
    pub reply_anywhere: bool,
    /// Extra trigger words appended to the built-in vocabulary
    #[serde(default)]
    pub extra_keywords: Vec<String>,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub pacing: PacingConfig,

    #[serde(default)]
    pub secret: SecretConfig,

    #[serde(default)]
    pub personas: PersonasConfig,

    #[serde(default)]
    pub discord: DiscordConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_api_base_url() -> String {
    "https://api.openai.com/v1".into()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            bot_token: None,
            channel_id: None,
            api_key: None,
            model: default_model(),
            api_base_url: default_api_base_url(),
            reply_anywhere: false,
            extra_keywords: Vec::new(),
            schedule: ScheduleConfig::default(),
            pacing: PacingConfig::default(),
            secret: SecretConfig::default(),
            personas: PersonasConfig::default(),
            discord: DiscordConfig::default(),
            health: HealthConfig::default(),
            reliability: ReliabilityConfig::default(),
        }
    }
}

// ── Schedule ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub policy: SchedulePolicy,
    /// Seconds after start before the first broadcast (0: wait for the policy)
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: u64,
    /// Lines per autonomous batch when the secret reveal is off
    #[serde(default = "default_lines_per_broadcast")]
    pub lines_per_broadcast: usize,
}

fn default_initial_delay_secs() -> u64 {
    10
}

fn default_lines_per_broadcast() -> usize {
    5
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            policy: SchedulePolicy::default(),
            initial_delay_secs: default_initial_delay_secs(),
            lines_per_broadcast: default_lines_per_broadcast(),
        }
    }
}

impl ScheduleConfig {
    /// Delay of the one-off initial broadcast, `None` when it is turned off.
    pub fn initial_delay(&self) -> Option<Duration> {
        (self.initial_delay_secs > 0).then(|| Duration::from_secs(self.initial_delay_secs))
    }
}

// ── Pacing ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Typing delay band before every send (ms)
    #[serde(default = "default_typing_min_ms")]
    pub typing_min_ms: u64,
    #[serde(default = "default_typing_max_ms")]
    pub typing_max_ms: u64,
    /// Extra gap between lines of one autonomous batch (ms)
    #[serde(default = "default_batch_gap_min_ms")]
    pub batch_gap_min_ms: u64,
    #[serde(default = "default_batch_gap_max_ms")]
    pub batch_gap_max_ms: u64,
}

fn default_typing_min_ms() -> u64 {
    3000
}

fn default_typing_max_ms() -> u64 {
    8000
}

fn default_batch_gap_min_ms() -> u64 {
    2000
}

fn default_batch_gap_max_ms() -> u64 {
    6000
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            typing_min_ms: default_typing_min_ms(),
            typing_max_ms: default_typing_max_ms(),
            batch_gap_min_ms: default_batch_gap_min_ms(),
            batch_gap_max_ms: default_batch_gap_max_ms(),
        }
    }
}

impl PacingConfig {
    pub fn typing_band(&self) -> TypingBand {
        TypingBand {
            min_ms: self.typing_min_ms,
            max_ms: self.typing_max_ms,
        }
    }
}

/// Inclusive `[min_ms, max_ms]` wait between the typing indicator and a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingBand {
    pub min_ms: u64,
    pub max_ms: u64,
}

// ── Secret reveal ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretConfig {
    /// Hide one payload token in every broadcast
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_shift")]
    pub shift: u8,
    /// Plaintext payload, revealed one word per broadcast in this order
    #[serde(default = "default_secret_words")]
    pub words: Vec<String>,
    /// Tag framing the synthesized fallback line
    #[serde(default = "default_status_tag")]
    pub status_tag: String,
}

fn default_shift() -> u8 {
    DEFAULT_SHIFT
}

fn default_secret_words() -> Vec<String> {
    ["the", "signal", "was", "never", "yours"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_status_tag() -> String {
    "📹 REC".into()
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            shift: default_shift(),
            words: default_secret_words(),
            status_tag: default_status_tag(),
        }
    }
}

impl SecretConfig {
    pub fn codec(&self) -> Result<CipherCodec, ConfigError> {
        CipherCodec::new(self.shift)
    }
}

// ── Personas ─────────────────────────────────────────────────────

/// Reply budget of the public and private personas.
pub const REPLY_MAX_TOKENS: u32 = 150;
/// Budget of an autonomous broadcast, which asks for several lines at once.
pub const BROADCAST_MAX_TOKENS: u32 = 300;
const DEFAULT_MIN_TOKENS: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaTuning {
    /// Unset: the persona's own budget (`REPLY_MAX_TOKENS` or `BROADCAST_MAX_TOKENS`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Whitespace-delimited words a response needs to count as usable (default 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_tokens: Option<u32>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Replacement system-prompt template (Tera syntax)
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Typing delay band for this persona (ms); either end falls back to `[pacing]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typing_min_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typing_max_ms: Option<u64>,
}

fn default_temperature() -> f64 {
    0.9
}

impl Default for PersonaTuning {
    fn default() -> Self {
        Self {
            max_tokens: None,
            min_tokens: None,
            temperature: default_temperature(),
            system_prompt: None,
            typing_min_ms: None,
            typing_max_ms: None,
        }
    }
}

impl PersonaTuning {
    /// `(min, max)` with unset ends resolved; `default_max` is the persona's budget.
    pub fn token_bounds(&self, default_max: u32) -> (u32, u32) {
        (
            self.min_tokens.unwrap_or(DEFAULT_MIN_TOKENS),
            self.max_tokens.unwrap_or(default_max),
        )
    }

    pub fn typing_band(&self, pacing: &PacingConfig) -> TypingBand {
        TypingBand {
            min_ms: self.typing_min_ms.unwrap_or(pacing.typing_min_ms),
            max_ms: self.typing_max_ms.unwrap_or(pacing.typing_max_ms),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonasConfig {
    #[serde(default)]
    pub public: PersonaTuning,
    #[serde(default)]
    pub private: PersonaTuning,
    #[serde(default)]
    pub autonomous: PersonaTuning,
}

// ── Discord ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Gateway intents override (default: guilds, guild messages, DMs, message content)
    #[serde(default)]
    pub intents: Option<u64>,
    #[serde(default = "default_status")]
    pub status: Option<String>,
    /// 3 = Watching
    #[serde(default = "default_activity_type")]
    pub activity_type: Option<u8>,
    #[serde(default = "default_activity_name")]
    pub activity_name: Option<String>,
}

fn default_status() -> Option<String> {
    Some("dnd".into())
}

fn default_activity_type() -> Option<u8> {
    Some(3)
}

fn default_activity_name() -> Option<String> {
    Some("📹 Recording...".into())
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            intents: None,
            status: default_status(),
            activity_type: default_activity_type(),
            activity_name: default_activity_name(),
        }
    }
}

// ── Health endpoint ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_health_host")]
    pub host: String,
    #[serde(default = "default_health_port")]
    pub port: u16,
}

fn default_health_host() -> String {
    "0.0.0.0".into()
}

fn default_health_port() -> u16 {
    8080
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_health_host(),
            port: default_health_port(),
        }
    }
}

// ── Reliability ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_initial_backoff_secs")]
    pub component_initial_backoff_secs: u64,
    #[serde(default = "default_max_backoff_secs")]
    pub component_max_backoff_secs: u64,
    /// 0 = restart forever
    #[serde(default = "default_max_restarts")]
    pub component_max_restarts: u32,
}

fn default_initial_backoff_secs() -> u64 {
    2
}

fn default_max_backoff_secs() -> u64 {
    60
}

fn default_max_restarts() -> u32 {
    10
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            component_initial_backoff_secs: default_initial_backoff_secs(),
            component_max_backoff_secs: default_max_backoff_secs(),
            component_max_restarts: default_max_restarts(),
        }
    }
}

// ── Validation ───────────────────────────────────────────────────

impl Config {
    /// Reject configs the daemon cannot run with. Missing credentials are
    /// fatal here and nowhere else.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if is_blank(self.bot_token.as_deref()) {
            return Err(ConfigError::Missing("bot_token (BOT_TOKEN)"));
        }
        if is_blank(self.channel_id.as_deref()) {
            return Err(ConfigError::Missing("channel_id (CHANNEL_ID)"));
        }
        if is_blank(self.api_key.as_deref()) {
            return Err(ConfigError::Missing("api_key (OPENAI_API_KEY)"));
        }
        self.validate_behavior()
    }

    /// Everything except credentials; used by the offline CLI commands too.
    pub fn validate_behavior(&self) -> Result<(), ConfigError> {
        self.schedule.policy.validate()?;
        if self.schedule.lines_per_broadcast == 0 {
            return Err(ConfigError::Validation(
                "schedule.lines_per_broadcast must be at least 1".into(),
            ));
        }

        let p = &self.pacing;
        if p.typing_min_ms > p.typing_max_ms || p.batch_gap_min_ms > p.batch_gap_max_ms {
            return Err(ConfigError::Validation(
                "pacing bands must satisfy min <= max".into(),
            ));
        }

        if self.secret.enabled {
            self.secret.codec()?;
            if self.secret.words.iter().all(|w| w.trim().is_empty()) {
                return Err(ConfigError::Validation(
                    "secret.words must contain at least one word when the reveal is enabled"
                        .into(),
                ));
            }
            if self.secret.status_tag.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "secret.status_tag must not be empty".into(),
                ));
            }
        }

        for (name, tuning, default_max) in [
            ("public", &self.personas.public, REPLY_MAX_TOKENS),
            ("private", &self.personas.private, REPLY_MAX_TOKENS),
            ("autonomous", &self.personas.autonomous, BROADCAST_MAX_TOKENS),
        ] {
            if !(0.0..=1.0).contains(&tuning.temperature) {
                return Err(ConfigError::Validation(format!(
                    "personas.{name}.temperature must be within [0, 1], got {}",
                    tuning.temperature
                )));
            }
            let (min, max) = tuning.token_bounds(default_max);
            if max == 0 || min > max {
                return Err(ConfigError::Validation(format!(
                    "personas.{name} token bounds must satisfy 0 < min <= max, got [{min}, {max}]"
                )));
            }
            let band = tuning.typing_band(&self.pacing);
            if band.min_ms > band.max_ms {
                return Err(ConfigError::Validation(format!(
                    "personas.{name} typing band must satisfy min <= max, got [{}, {}]",
                    band.min_ms, band.max_ms
                )));
            }
        }

        Ok(())
    }

    /// Copy safe to print: credentials masked.
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "***".to_string());
        Self {
            bot_token: mask(&self.bot_token),
            api_key: mask(&self.api_key),
            ..self.clone()
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Config {
        Config {
            bot_token: Some("token".into()),
            channel_id: Some("123".into()),
            api_key: Some("sk-test".into()),
            ..Config::default()
        }
    }

    #[test]
    fn defaults_cover_the_recording_persona() {
        let config = Config::default();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.health.port, 8080);
        assert_eq!(config.pacing.typing_min_ms, 3000);
        assert_eq!(config.pacing.typing_max_ms, 8000);
        assert_eq!(config.schedule.initial_delay_secs, 10);
        assert_eq!(config.personas.autonomous.token_bounds(BROADCAST_MAX_TOKENS), (1, 300));
        assert_eq!(
            config.schedule.policy,
            SchedulePolicy::RandomBounded {
                min_secs: 3600,
                max_secs: 7200
            }
        );
    }

    #[test]
    fn complete_config_validates() {
        assert!(complete().validate().is_ok());
    }

    #[test]
    fn missing_credentials_are_reported_by_name() {
        let mut config = complete();
        config.channel_id = Some("  ".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CHANNEL_ID"));

        let mut config = complete();
        config.api_key = None;
        assert!(config.validate().unwrap_err().to_string().contains("api_key"));
    }

    #[test]
    fn empty_secret_words_rejected_only_when_enabled() {
        let mut config = complete();
        config.secret.words = vec![" ".into()];
        assert!(config.validate().is_err());
        config.secret.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn inverted_pacing_band_rejected() {
        let mut config = complete();
        config.pacing.typing_min_ms = 9000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn temperature_outside_unit_range_rejected() {
        let mut config = complete();
        config.personas.private.temperature = 1.4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn redacted_masks_credentials() {
        let shown = complete().redacted();
        assert_eq!(shown.bot_token.as_deref(), Some("***"));
        assert_eq!(shown.api_key.as_deref(), Some("***"));
        assert_eq!(shown.channel_id.as_deref(), Some("123"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
channel_id = "42"

[schedule.policy]
kind = "fixed_hourly"

[personas.autonomous]
temperature = 0.5
"#,
        )
        .unwrap();
        assert_eq!(config.channel_id.as_deref(), Some("42"));
        assert_eq!(config.schedule.policy, SchedulePolicy::FixedHourly);
        assert_eq!(config.schedule.lines_per_broadcast, 5);
        assert!((config.personas.autonomous.temperature - 0.5).abs() < f64::EPSILON);
        assert_eq!(
            config.personas.autonomous.token_bounds(BROADCAST_MAX_TOKENS),
            (1, 300)
        );
        assert!(config.secret.enabled);
    }

    #[test]
    fn initial_broadcast_can_be_turned_off() {
        let config: Config = toml::from_str("[schedule]\n").unwrap();
        assert_eq!(config.schedule.initial_delay(), Some(Duration::from_secs(10)));

        let mut config = complete();
        config.schedule.initial_delay_secs = 0;
        let reread: Config = toml::from_str(&toml::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(reread.schedule.initial_delay_secs, 0);
        assert_eq!(reread.schedule.initial_delay(), None);
    }

    #[test]
    fn explicit_token_budget_survives_round_trip() {
        let mut config = complete();
        config.personas.public.max_tokens = Some(80);
        let reread: Config = toml::from_str(&toml::to_string_pretty(&config).unwrap()).unwrap();
        assert_eq!(reread.personas.public.token_bounds(REPLY_MAX_TOKENS), (1, 80));
        assert_eq!(reread.personas.autonomous.token_bounds(BROADCAST_MAX_TOKENS), (1, 300));
    }

    #[test]
    fn persona_typing_band_overrides_one_end() {
        let config: Config = toml::from_str(
            r#"
[pacing]
typing_min_ms = 3000
typing_max_ms = 8000

[personas.private]
typing_max_ms = 4000
"#,
        )
        .unwrap();
        assert_eq!(
            config.personas.private.typing_band(&config.pacing),
            TypingBand {
                min_ms: 3000,
                max_ms: 4000
            }
        );
        assert_eq!(
            config.personas.public.typing_band(&config.pacing),
            config.pacing.typing_band()
        );
    }

    #[test]
    fn inverted_persona_typing_band_rejected() {
        let mut config = complete();
        config.personas.autonomous.typing_max_ms = Some(1000);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("personas.autonomous typing band"));
    }

    #[test]
    fn zero_token_budget_rejected() {
        let mut config = complete();
        config.personas.public.max_tokens = Some(0);
        assert!(config.validate().is_err());
    }
}
