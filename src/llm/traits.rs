use async_trait::async_trait;

/// Text-generation capability.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name used in logs and error reports.
    fn name(&self) -> &str;

    async fn chat_with_system(
        &self,
        system_prompt: Option<&str>,
        message: &str,
        model: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> anyhow::Result<String>;

    /// Warm up the HTTP connection pool (TLS handshake, DNS).
    /// Default implementation is a no-op.
    async fn warmup(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
