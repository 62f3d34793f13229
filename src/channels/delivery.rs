//! Human-paced delivery: typing indicator, a randomized wait, then the send.

use super::traits::Channel;
use crate::config::{PacingConfig, TypingBand};
use crate::error::DeliveryError;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Failed,
}

impl DeliveryOutcome {
    pub fn is_sent(self) -> bool {
        self == Self::Sent
    }
}

pub struct TypedDelivery {
    channel: Arc<dyn Channel>,
    pacing: PacingConfig,
}

impl TypedDelivery {
    pub fn new(channel: Arc<dyn Channel>, pacing: PacingConfig) -> Self {
        Self { channel, pacing }
    }

    pub fn channel(&self) -> &Arc<dyn Channel> {
        &self.channel
    }

    /// Show typing, wait inside `band` (the sending persona's), send. Never
    /// returns an error: a typing failure is logged and the send still
    /// happens, a send failure is logged and reported as
    /// [`DeliveryOutcome::Failed`].
    pub async fn deliver(&self, target: &str, text: &str, band: TypingBand) -> DeliveryOutcome {
        if let Err(e) = self.channel.send_typing(target).await {
            let err = DeliveryError::Typing {
                target: target.to_string(),
                message: format!("{e:#}"),
            };
            tracing::warn!("{err}");
        }

        tokio::time::sleep(pick_ms(band.min_ms, band.max_ms)).await;

        match self.channel.send(text, target).await {
            Ok(()) => {
                tracing::debug!(target, chars = text.chars().count(), "message delivered");
                DeliveryOutcome::Sent
            }
            Err(e) => {
                let err = DeliveryError::Send {
                    target: target.to_string(),
                    message: format!("{e:#}"),
                };
                tracing::warn!("{err}");
                DeliveryOutcome::Failed
            }
        }
    }

    /// Extra pause between two lines of one batch.
    pub async fn batch_gap(&self) {
        let gap = pick_ms(self.pacing.batch_gap_min_ms, self.pacing.batch_gap_max_ms);
        tokio::time::sleep(gap).await;
    }
}

fn pick_ms(min_ms: u64, max_ms: u64) -> Duration {
    let (lo, hi) = if min_ms <= max_ms {
        (min_ms, max_ms)
    } else {
        (max_ms, min_ms)
    };
    Duration::from_millis(rand::rng().random_range(lo..=hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::traits::{ChannelInfo, ChannelMessage, HistoryMessage};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Default)]
    struct Recorder {
        fail_typing: bool,
        fail_send: bool,
        events: Mutex<Vec<(String, Instant)>>,
    }

    #[async_trait]
    impl Channel for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn send(&self, message: &str, target: &str) -> anyhow::Result<()> {
            if self.fail_send {
                anyhow::bail!("503 from upstream");
            }
            self.events
                .lock()
                .unwrap()
                .push((format!("send:{target}:{message}"), Instant::now()));
            Ok(())
        }

        async fn send_typing(&self, target: &str) -> anyhow::Result<()> {
            if self.fail_typing {
                anyhow::bail!("typing refused");
            }
            self.events
                .lock()
                .unwrap()
                .push((format!("typing:{target}"), Instant::now()));
            Ok(())
        }

        async fn fetch_channel(&self, _channel_id: &str) -> anyhow::Result<ChannelInfo> {
            anyhow::bail!("unused")
        }

        async fn fetch_recent_messages(
            &self,
            _channel_id: &str,
            _limit: usize,
        ) -> anyhow::Result<Vec<HistoryMessage>> {
            Ok(Vec::new())
        }

        async fn listen(
            &self,
            _tx: tokio::sync::mpsc::Sender<ChannelMessage>,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn delivery(recorder: Arc<Recorder>) -> TypedDelivery {
        TypedDelivery::new(recorder, PacingConfig::default())
    }

    fn band() -> TypingBand {
        PacingConfig::default().typing_band()
    }

    #[tokio::test(start_paused = true)]
    async fn typing_precedes_send_by_the_pacing_band() {
        let recorder = Arc::new(Recorder::default());
        let outcome = delivery(recorder.clone()).deliver("c1", "i see you", band()).await;
        assert_eq!(outcome, DeliveryOutcome::Sent);

        let events = recorder.events.lock().unwrap();
        assert_eq!(events[0].0, "typing:c1");
        assert_eq!(events[1].0, "send:c1:i see you");
        let waited = events[1].1 - events[0].1;
        assert!(waited >= Duration::from_millis(3000), "{waited:?}");
        assert!(waited <= Duration::from_millis(8000), "{waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn typing_failure_still_sends() {
        let recorder = Arc::new(Recorder {
            fail_typing: true,
            ..Recorder::default()
        });
        let outcome = delivery(recorder.clone()).deliver("c1", "still here", band()).await;
        assert!(outcome.is_sent());
        assert_eq!(recorder.events.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn send_failure_is_reported_not_raised() {
        let recorder = Arc::new(Recorder {
            fail_send: true,
            ..Recorder::default()
        });
        let delivery = delivery(recorder);
        assert_eq!(delivery.deliver("c1", "one", band()).await, DeliveryOutcome::Failed);
        assert_eq!(delivery.deliver("c1", "two", band()).await, DeliveryOutcome::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn each_delivery_uses_the_band_it_is_given() {
        let recorder = Arc::new(Recorder::default());
        let delivery = delivery(recorder.clone());
        let quick = TypingBand {
            min_ms: 200,
            max_ms: 200,
        };
        let slow = TypingBand {
            min_ms: 9000,
            max_ms: 9000,
        };

        delivery.deliver("c1", "fast", quick).await;
        delivery.deliver("c1", "slow", slow).await;

        let events = recorder.events.lock().unwrap();
        assert_eq!(events[1].1 - events[0].1, Duration::from_millis(200));
        assert_eq!(events[3].1 - events[2].1, Duration::from_millis(9000));
    }

    #[tokio::test(start_paused = true)]
    async fn batch_gap_stays_in_band() {
        let delivery = delivery(Arc::new(Recorder::default()));
        let start = Instant::now();
        delivery.batch_gap().await;
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(2000));
        assert!(waited <= Duration::from_millis(6000));
    }

    #[test]
    fn inverted_band_is_normalized() {
        let picked = pick_ms(500, 100);
        assert!(picked >= Duration::from_millis(100));
        assert!(picked <= Duration::from_millis(500));
    }
}
