use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `recwatch`.
///
/// Everything inside the content-delivery pipeline is recovered at the
/// boundary of the operation that raised it; only [`ConfigError`] is fatal,
/// and only at startup.
#[derive(Debug, Error)]
pub enum RecError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Generation ──────────────────────────────────────────────────────
    #[error("generation: {0}")]
    Generation(#[from] GenerationError),

    // ── Delivery ────────────────────────────────────────────────────────
    #[error("delivery: {0}")]
    Delivery(#[from] DeliveryError),

    // ── Lookup ──────────────────────────────────────────────────────────
    #[error("lookup: {0}")]
    Lookup(#[from] LookupError),

    // ── Prompt / Template ───────────────────────────────────────────────
    #[error("prompt: {0}")]
    Prompt(#[from] PromptError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Generation errors ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("provider {provider} request failed: {message}")]
    Request { provider: String, message: String },

    #[error("provider returned an empty response")]
    Empty,

    #[error("response too short ({words} words, need at least {min})")]
    TooShort { words: usize, min: u32 },
}

// ─── Delivery errors ────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("send to {target} failed: {message}")]
    Send { target: String, message: String },

    #[error("typing indicator on {target} failed: {message}")]
    Typing { target: String, message: String },
}

// ─── Lookup errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("channel {channel_id} not found: {message}")]
    ChannelNotFound { channel_id: String, message: String },
}

// ─── Prompt / Template errors ───────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("template {template} failed to parse: {message}")]
    Parse { template: String, message: String },

    #[error("template {template} uses a placeholder outside its declared slots: {message}")]
    UndeclaredSlot { template: String, message: String },

    #[error("template {template} is missing a value for slot {slot}")]
    MissingSlot { template: String, slot: String },

    #[error("template render failed: {0}")]
    Render(String),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, RecError>;
