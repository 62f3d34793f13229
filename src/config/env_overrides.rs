use super::Config;

impl Config {
    /// Environment wins over the file (`BOT_TOKEN`, `CHANNEL_ID`,
    /// `OPENAI_API_KEY`, plus the `RECWATCH_*` tunables).
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("BOT_TOKEN")
            && !token.is_empty()
        {
            self.bot_token = Some(token);
        }

        if let Ok(channel) = std::env::var("CHANNEL_ID")
            && !channel.is_empty()
        {
            self.channel_id = Some(channel);
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY").or_else(|_| std::env::var("API_KEY"))
            && !key.is_empty()
        {
            self.api_key = Some(key);
        }

        if let Ok(model) = std::env::var("RECWATCH_MODEL")
            && !model.is_empty()
        {
            self.model = model;
        }

        if let Ok(base) = std::env::var("RECWATCH_API_BASE_URL")
            && !base.is_empty()
        {
            self.api_base_url = base;
        }

        if let Ok(port_str) =
            std::env::var("RECWATCH_HEALTH_PORT").or_else(|_| std::env::var("PORT"))
            && let Ok(port) = port_str.parse::<u16>()
        {
            self.health.port = port;
        }
    }
}
