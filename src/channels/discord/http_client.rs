use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Method, Response, header::HeaderMap};
use serde::Deserialize;
use serde_json::json;
use tokio::{sync::Mutex, time::sleep};

use super::types::API_BASE;

const MAX_RATE_LIMIT_RETRIES: u8 = 3;

#[derive(Debug, Clone)]
struct RateLimitBucket {
    remaining: u32,
    reset_at: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordChannelObject {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub guild_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordGuild {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub approximate_member_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordMessage {
    pub id: String,
    #[serde(default)]
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub author: DiscordUser,
}

pub struct DiscordHttpClient {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    buckets: Arc<Mutex<HashMap<String, RateLimitBucket>>>,
    global_reset_at: Arc<Mutex<Option<f64>>>,
}

impl DiscordHttpClient {
    #[must_use]
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self::with_api_base(bot_token, API_BASE)
    }

    /// Client against a non-default API root (a local mock in tests).
    #[must_use]
    pub fn with_api_base(bot_token: impl Into<String>, api_base: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            buckets: Arc::new(Mutex::new(HashMap::new())),
            global_reset_at: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn send_message(&self, channel_id: &str, content: &str) -> Result<()> {
        let url = format!("{}/channels/{channel_id}/messages", self.api_base);
        let _response = self
            .request(Method::POST, &url, Some(json!({ "content": content })))
            .await
            .context("send Discord message")?;
        Ok(())
    }

    pub async fn send_typing(&self, channel_id: &str) -> Result<()> {
        let url = format!("{}/channels/{channel_id}/typing", self.api_base);
        let _response = self
            .request(Method::POST, &url, None)
            .await
            .context("send Discord typing indicator")?;
        Ok(())
    }

    pub async fn get_channel(&self, channel_id: &str) -> Result<DiscordChannelObject> {
        let url = format!("{}/channels/{channel_id}", self.api_base);
        let response = self
            .request(Method::GET, &url, None)
            .await
            .context("fetch Discord channel")?;
        response.json().await.context("parse Discord channel JSON")
    }

    pub async fn get_guild(&self, guild_id: &str) -> Result<DiscordGuild> {
        let url = format!("{}/guilds/{guild_id}?with_counts=true", self.api_base);
        let response = self
            .request(Method::GET, &url, None)
            .await
            .context("fetch Discord guild")?;
        response.json().await.context("parse Discord guild JSON")
    }

    /// Most recent messages first, as Discord returns them.
    pub async fn get_messages(&self, channel_id: &str, limit: usize) -> Result<Vec<DiscordMessage>> {
        let limit = limit.clamp(1, 100);
        let url = format!(
            "{}/channels/{channel_id}/messages?limit={limit}",
            self.api_base
        );
        let response = self
            .request(Method::GET, &url, None)
            .await
            .context("fetch Discord channel messages")?;
        response
            .json()
            .await
            .context("parse Discord channel messages JSON")
    }

    pub async fn get_current_user(&self) -> Result<DiscordUser> {
        let url = format!("{}/users/@me", self.api_base);
        let response = self
            .request(Method::GET, &url, None)
            .await
            .context("fetch current Discord user")?;
        response
            .json()
            .await
            .context("parse current Discord user JSON")
    }

    pub async fn get_gateway_bot(&self) -> Result<serde_json::Value> {
        let url = format!("{}/gateway/bot", self.api_base);
        let response = self
            .request(Method::GET, &url, None)
            .await
            .context("fetch Discord gateway bot data")?;
        response
            .json()
            .await
            .context("parse Discord gateway bot JSON")
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response> {
        let route_key = Self::bucket_key_from_url(url);
        self.wait_for_limits(&route_key).await;

        for attempt in 0..=MAX_RATE_LIMIT_RETRIES {
            let mut request_builder = self
                .client
                .request(method.clone(), url)
                .header("Authorization", format!("Bot {}", self.bot_token));
            if let Some(payload) = &body {
                request_builder = request_builder.json(payload);
            }

            let response = request_builder
                .send()
                .await
                .with_context(|| format!("send Discord request {method} {url}"))?;

            self.update_bucket_from_headers(&route_key, response.headers())
                .await;

            if response.status().as_u16() == 429 {
                if attempt == MAX_RATE_LIMIT_RETRIES {
                    anyhow::bail!(
                        "Discord request {method} {url} exceeded rate limit after {MAX_RATE_LIMIT_RETRIES} retries"
                    );
                }
                let is_global = Self::is_global_limit(response.headers());
                let retry_after = Self::parse_retry_after(response.headers())
                    .unwrap_or_else(|| Duration::from_secs(1));
                tracing::debug!(route = %route_key, ?retry_after, "Discord rate limited");
                self.handle_429_wait(is_global, retry_after, &route_key)
                    .await;
                continue;
            }

            if !response.status().is_success() {
                let status = response.status();
                let body_text = response
                    .text()
                    .await
                    .unwrap_or_else(|error| format!("<failed to read response body: {error}>"));
                anyhow::bail!("Discord request {method} {url} failed ({status}): {body_text}");
            }

            return Ok(response);
        }

        anyhow::bail!("Discord request {method} {url} failed due to rate limiting")
    }

    fn parse_header<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<T>().ok())
    }

    fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
        let seconds: f64 = Self::parse_header(headers, "Retry-After")?;
        Some(Duration::from_secs_f64(seconds.max(0.0)))
    }

    fn is_global_limit(headers: &HeaderMap) -> bool {
        headers
            .get("X-RateLimit-Global")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    }

    fn now_unix_timestamp() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }

    /// Route key with snowflake ids collapsed, so every channel shares one
    /// bucket per endpoint shape.
    fn bucket_key_from_url(url: &str) -> String {
        let path = reqwest::Url::parse(url)
            .map_or_else(|_| url.to_string(), |parsed| parsed.path().to_string());
        let path = path.strip_prefix("/api/v10").unwrap_or(&path);

        let normalized = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                if segment.chars().all(|c| c.is_ascii_digit()) {
                    "{id}"
                } else {
                    segment
                }
            })
            .collect::<Vec<_>>()
            .join("/");

        format!("/{normalized}")
    }

    async fn wait_for_limits(&self, route_key: &str) {
        let now = Self::now_unix_timestamp();
        let global_wait = {
            let global_guard = self.global_reset_at.lock().await;
            global_guard.and_then(|reset_at| (reset_at > now).then_some(reset_at - now))
        };
        if let Some(wait_secs) = global_wait {
            sleep(Duration::from_secs_f64(wait_secs)).await;
        }

        let route_wait = {
            let buckets = self.buckets.lock().await;
            buckets
                .get(route_key)
                .filter(|bucket| bucket.remaining == 0 && bucket.reset_at > now)
                .map(|bucket| bucket.reset_at - now)
        };
        if let Some(wait_secs) = route_wait {
            sleep(Duration::from_secs_f64(wait_secs)).await;
        }
    }

    async fn handle_429_wait(&self, is_global: bool, retry_after: Duration, route_key: &str) {
        let reset_at = Self::now_unix_timestamp() + retry_after.as_secs_f64();
        if is_global {
            *self.global_reset_at.lock().await = Some(reset_at);
        } else {
            self.buckets.lock().await.insert(
                route_key.to_string(),
                RateLimitBucket {
                    remaining: 0,
                    reset_at,
                },
            );
        }
        sleep(retry_after).await;
    }

    async fn update_bucket_from_headers(&self, route_key: &str, headers: &HeaderMap) {
        let remaining = Self::parse_header(headers, "X-RateLimit-Remaining");
        let reset_at = Self::parse_header(headers, "X-RateLimit-Reset");

        if let (Some(remaining), Some(reset_at)) = (remaining, reset_at) {
            self.buckets.lock().await.insert(
                route_key.to_string(),
                RateLimitBucket {
                    remaining,
                    reset_at,
                },
            );
        }
    }
}
