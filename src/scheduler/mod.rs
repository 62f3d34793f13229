//! Autonomous broadcast scheduling: compute the next fire, wait for it, run
//! the broadcast, re-arm. Runs as one task until stopped.

mod policy;

pub use policy::{ScheduleEntry, SchedulePolicy};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Work performed on every scheduler fire. Failures are the implementor's to
/// log and absorb; the scheduler re-arms regardless.
#[async_trait]
pub trait Broadcast: Send + 'static {
    async fn fire(&mut self);
}

pub struct BroadcastScheduler<B> {
    policy: SchedulePolicy,
    warmup: Option<Duration>,
    broadcaster: B,
}

impl<B: Broadcast> BroadcastScheduler<B> {
    pub fn new(policy: SchedulePolicy, broadcaster: B) -> Self {
        Self {
            policy,
            warmup: None,
            broadcaster,
        }
    }

    /// Fire once after `delay`, before the policy takes over.
    pub fn with_warmup(mut self, delay: Duration) -> Self {
        self.warmup = Some(delay);
        self
    }

    pub fn start(self) -> SchedulerHandle<B> {
        let cancel = CancellationToken::new();
        let (next_tx, next_rx) = watch::channel(None);
        let join = tokio::spawn(self.run(cancel.clone(), next_tx));
        SchedulerHandle {
            cancel,
            join,
            next_fire: next_rx,
        }
    }

    /// The policy chain is armed at start; the warm-up fire runs inside the
    /// first wait and does not push later fires back.
    async fn run(
        mut self,
        cancel: CancellationToken,
        next_tx: watch::Sender<Option<ScheduleEntry>>,
    ) -> B {
        let mut deadline = self.arm(&next_tx);

        if let Some(warmup) = self.warmup {
            tracing::info!("initial broadcast in {}s", warmup.as_secs());
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    next_tx.send_replace(None);
                    return self.broadcaster;
                }
                () = tokio::time::sleep(warmup) => self.broadcaster.fire().await,
            }
        }

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep_until(deadline) => {}
            }

            self.broadcaster.fire().await;
            deadline = self.arm(&next_tx);
        }

        next_tx.send_replace(None);
        self.broadcaster
    }

    /// Compute and publish the next entry; returns its deadline on the tokio clock.
    fn arm(&self, next_tx: &watch::Sender<Option<ScheduleEntry>>) -> Instant {
        let now = Utc::now();
        let entry = self.policy.next_entry(now, &mut rand::rng());
        let delay = (entry.next_fire_at - now).to_std().unwrap_or_default();
        next_tx.send_replace(Some(entry));
        tracing::info!(
            next_fire_at = %entry.next_fire_at,
            "next broadcast in {:.1} hours",
            delay.as_secs_f64() / 3600.0
        );
        Instant::now() + delay
    }
}

/// Control surface of a running scheduler.
pub struct SchedulerHandle<B> {
    cancel: CancellationToken,
    join: JoinHandle<B>,
    next_fire: watch::Receiver<Option<ScheduleEntry>>,
}

impl<B> SchedulerHandle<B> {
    /// The armed entry, or `None` while a fire is being set up or after stop.
    pub fn next_fire(&self) -> Option<ScheduleEntry> {
        *self.next_fire.borrow()
    }

    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    /// Cancel the pending timer and wait for an in-flight fire to finish.
    /// Returns the broadcaster with whatever state it accumulated.
    pub async fn stop(self) -> anyhow::Result<B> {
        self.cancel.cancel();
        self.join
            .await
            .map_err(|e| anyhow::anyhow!("scheduler task failed: {e}"))
    }
}

/// The next `count` fire instants of `policy`, each computed from the
/// previous one.
pub fn preview<R: Rng + ?Sized>(
    policy: SchedulePolicy,
    from: DateTime<Utc>,
    count: usize,
    rng: &mut R,
) -> Vec<DateTime<Utc>> {
    let mut cursor = from;
    (0..count)
        .map(|_| {
            cursor = policy.next_entry(cursor, rng).next_fire_at;
            cursor
        })
        .collect()
}
