//! Adapter between the persona pipeline and a text-generation [`Provider`].
//!
//! One provider call per request. Failures never escape: they are logged and
//! folded into [`GenerationResult`], with a synthesized line standing in when
//! the request carries a required token.

mod lines;

pub use lines::{contains_whole_word, split_candidates};

use crate::error::GenerationError;
use crate::llm::Provider;
use crate::persona::ResponseLength;
use std::sync::Arc;

/// Upper bound on candidate lines considered from one constrained response.
const MAX_CANDIDATES: usize = 16;

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Sampling temperature in `[0, 1]`.
    pub creativity: f64,
    pub length: ResponseLength,
    /// Token every delivered line must contain as a whole word.
    pub required_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub text: Option<String>,
    pub succeeded: bool,
    /// The text was synthesized locally instead of generated.
    pub fallback: bool,
}

impl GenerationResult {
    fn generated(text: String) -> Self {
        Self {
            text: Some(text),
            succeeded: true,
            fallback: false,
        }
    }

    fn synthesized(text: String) -> Self {
        Self {
            text: Some(text),
            succeeded: false,
            fallback: true,
        }
    }

    fn failed() -> Self {
        Self {
            text: None,
            succeeded: false,
            fallback: false,
        }
    }
}

pub struct GenerationAdapter {
    provider: Arc<dyn Provider>,
    model: String,
    status_tag: String,
}

impl GenerationAdapter {
    pub fn new(provider: Arc<dyn Provider>, model: &str, status_tag: &str) -> Self {
        Self {
            provider,
            model: model.to_string(),
            status_tag: status_tag.to_string(),
        }
    }

    /// The line delivered when no generated candidate carries `token`.
    pub fn fallback_line(&self, token: &str) -> String {
        format!("{tag}... [{token}]... {tag}", tag = self.status_tag)
    }

    pub async fn request(&self, request: &GenerationRequest) -> GenerationResult {
        let generated = match self.call(request).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), "generation failed: {e}");
                None
            }
        };

        let Some(token) = request.required_token.as_deref() else {
            return generated.map_or_else(GenerationResult::failed, GenerationResult::generated);
        };

        let selected = generated.as_deref().and_then(|text| {
            split_candidates(text, MAX_CANDIDATES)
                .into_iter()
                .find(|line| contains_whole_word(line, token))
        });

        match selected {
            Some(line) => GenerationResult::generated(line),
            None => {
                tracing::debug!(token, "no candidate carried the token; using fallback");
                GenerationResult::synthesized(self.fallback_line(token))
            }
        }
    }

    async fn call(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let raw = self
            .provider
            .chat_with_system(
                Some(&request.system_prompt),
                &request.user_prompt,
                &self.model,
                request.creativity.clamp(0.0, 1.0),
                request.length.max_tokens,
            )
            .await
            .map_err(|e| GenerationError::Request {
                provider: self.provider.name().to_string(),
                message: format!("{e:#}"),
            })?;

        let text = raw.trim();
        if text.is_empty() {
            return Err(GenerationError::Empty);
        }

        let words = text.split_whitespace().count();
        if words < request.length.min_tokens as usize {
            return Err(GenerationError::TooShort {
                words,
                min: request.length.min_tokens,
            });
        }

        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Scripted {
        reply: Option<String>,
        seen: Mutex<Vec<(f64, u32)>>,
    }

    impl Scripted {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Provider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat_with_system(
            &self,
            _system_prompt: Option<&str>,
            _message: &str,
            _model: &str,
            temperature: f64,
            max_tokens: u32,
        ) -> anyhow::Result<String> {
            self.seen.lock().unwrap().push((temperature, max_tokens));
            self.reply
                .clone()
                .ok_or_else(|| anyhow::anyhow!("service unavailable"))
        }
    }

    fn request(token: Option<&str>) -> GenerationRequest {
        GenerationRequest {
            system_prompt: "sys".into(),
            user_prompt: "user".into(),
            creativity: 0.9,
            length: ResponseLength {
                min_tokens: 1,
                max_tokens: 150,
            },
            required_token: token.map(str::to_string),
        }
    }

    fn adapter(provider: Arc<Scripted>) -> GenerationAdapter {
        GenerationAdapter::new(provider, "gpt-4o-mini", "📹 REC")
    }

    #[tokio::test]
    async fn unconstrained_returns_trimmed_text() {
        let provider = Scripted::ok("  i see you...  \n");
        let result = adapter(provider.clone()).request(&request(None)).await;
        assert_eq!(result.text.as_deref(), Some("i see you..."));
        assert!(result.succeeded);
        assert!(!result.fallback);
        assert_eq!(provider.seen.lock().unwrap()[0], (0.9, 150));
    }

    #[tokio::test]
    async fn unconstrained_failure_yields_none() {
        let result = adapter(Scripted::failing()).request(&request(None)).await;
        assert_eq!(
            result,
            GenerationResult {
                text: None,
                succeeded: false,
                fallback: false
            }
        );
    }

    #[tokio::test]
    async fn constrained_picks_first_whole_word_line() {
        let provider = Scripted::ok("1. KHOORS static\n2. the KHOOR feed flickers\n3. KHOOR again");
        let result = adapter(provider).request(&request(Some("KHOOR"))).await;
        assert_eq!(result.text.as_deref(), Some("the KHOOR feed flickers"));
        assert!(result.succeeded);
    }

    #[tokio::test]
    async fn constrained_without_match_synthesizes() {
        let provider = Scripted::ok("1. nothing here\n2. still nothing");
        let result = adapter(provider).request(&request(Some("ZDV"))).await;
        assert_eq!(result.text.as_deref(), Some("📹 REC... [ZDV]... 📹 REC"));
        assert!(!result.succeeded);
        assert!(result.fallback);
    }

    #[tokio::test]
    async fn constrained_failure_synthesizes() {
        let result = adapter(Scripted::failing())
            .request(&request(Some("AB")))
            .await;
        let text = result.text.unwrap();
        assert!(contains_whole_word(&text, "AB"));
        assert!(result.fallback);
    }

    #[tokio::test]
    async fn short_response_counts_as_failure() {
        let mut req = request(None);
        req.length.min_tokens = 4;
        let result = adapter(Scripted::ok("too short")).request(&req).await;
        assert!(result.text.is_none());
        assert!(!result.succeeded);
    }

    #[tokio::test]
    async fn blank_response_counts_as_failure() {
        let result = adapter(Scripted::ok("   \n ")).request(&request(None)).await;
        assert!(result.text.is_none());
    }

    #[tokio::test]
    async fn creativity_is_clamped() {
        let provider = Scripted::ok("watching");
        let mut req = request(None);
        req.creativity = 1.7;
        adapter(provider.clone()).request(&req).await;
        assert_eq!(provider.seen.lock().unwrap()[0].0, 1.0);
    }
}
