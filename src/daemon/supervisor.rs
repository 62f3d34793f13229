use crate::config::ReliabilityConfig;
use crate::diagnostics::health;
use anyhow::Result;
use std::future::Future;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

/// Restart policy for one long-running component.
#[derive(Debug, Clone, Copy)]
pub(super) struct Backoff {
    pub initial_secs: u64,
    pub max_secs: u64,
    /// 0 = restart forever
    pub max_restarts: u32,
}

impl From<&ReliabilityConfig> for Backoff {
    fn from(reliability: &ReliabilityConfig) -> Self {
        let initial_secs = reliability.component_initial_backoff_secs.max(1);
        Self {
            initial_secs,
            max_secs: reliability.component_max_backoff_secs.max(initial_secs),
            max_restarts: reliability.component_max_restarts,
        }
    }
}

/// Run `run_component` forever, restarting it with exponential backoff after
/// it fails or returns. A run that lasted longer than the backoff ceiling
/// counts as healthy and resets the failure streak.
pub(super) fn spawn_component_supervisor<F, Fut>(
    name: &'static str,
    backoff: Backoff,
    mut run_component: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let initial = backoff.initial_secs.max(1);
        let max_backoff = backoff.max_secs.max(initial);
        let mut delay = initial;
        let mut consecutive_failures: u32 = 0;

        loop {
            tracing::info!("Daemon component '{name}' starting");
            health::mark_component_ok(name);
            let started = Instant::now();

            match run_component().await {
                Ok(()) => {
                    tracing::warn!("Daemon component '{name}' exited unexpectedly");
                    health::mark_component_error(name, "exited");
                }
                Err(e) => {
                    tracing::error!("Daemon component '{name}' failed: {e:#}");
                    health::mark_component_error(name, format!("{e:#}"));
                }
            }

            if started.elapsed() >= Duration::from_secs(max_backoff) {
                consecutive_failures = 0;
                delay = initial;
            }
            consecutive_failures = consecutive_failures.saturating_add(1);

            if backoff.max_restarts > 0 && consecutive_failures > backoff.max_restarts {
                tracing::error!(
                    "Daemon component '{name}' exceeded max restarts ({}), circuit open",
                    backoff.max_restarts
                );
                break;
            }

            health::bump_component_restart(name);
            tokio::time::sleep(Duration::from_secs(delay)).await;
            delay = delay.saturating_mul(2).min(max_backoff);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn backoff(max_restarts: u32) -> Backoff {
        Backoff {
            initial_secs: 1,
            max_secs: 8,
            max_restarts,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn restarts_with_doubling_delay() {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);
        let handle = spawn_component_supervisor("supervisor-test-fail", backoff(0), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { anyhow::bail!("boom") }
        });

        // Runs at t = 0, 1, 3, 7
        tokio::time::sleep(Duration::from_millis(7500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 4);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn circuit_opens_after_max_restarts() {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&runs);
        let handle = spawn_component_supervisor("supervisor-test-circuit", backoff(2), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        });

        handle.await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn backoff_from_config_clamps() {
        let reliability = ReliabilityConfig {
            component_initial_backoff_secs: 0,
            component_max_backoff_secs: 0,
            component_max_restarts: 3,
        };
        let backoff = Backoff::from(&reliability);
        assert_eq!(backoff.initial_secs, 1);
        assert_eq!(backoff.max_secs, 1);
        assert_eq!(backoff.max_restarts, 3);
    }
}
