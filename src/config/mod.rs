mod env_overrides;
mod loader;
pub mod schema;
#[cfg(test)]
mod test_env;

pub use schema::{
    BROADCAST_MAX_TOKENS, Config, DiscordConfig, HealthConfig, PacingConfig, PersonaTuning,
    PersonasConfig, REPLY_MAX_TOKENS, ReliabilityConfig, ScheduleConfig, SecretConfig, TypingBand,
};
