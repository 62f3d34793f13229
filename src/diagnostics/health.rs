//! Process-wide component health and broadcast counters, served on `/health`.

use crate::router::PipelineOutcome;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{OnceLock, RwLock};
use std::time::Instant;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComponentStatus {
    Starting,
    Ok,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub updated_at: String,
    pub last_ok: Option<String>,
    pub last_error: Option<String>,
    pub restart_count: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BroadcastStats {
    pub fires: u64,
    pub lines_sent: u64,
    pub lines_failed: u64,
    pub fallbacks: u64,
    pub skipped: u64,
    pub last_fire_at: Option<String>,
    /// Position of the next token to reveal, when the reveal is enabled.
    pub secret_cursor: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub pid: u32,
    pub updated_at: String,
    pub uptime_seconds: u64,
    pub components: BTreeMap<String, ComponentHealth>,
    pub broadcasts: BroadcastStats,
}

struct HealthRegistry {
    started_at: Instant,
    components: RwLock<BTreeMap<String, ComponentHealth>>,
    broadcasts: RwLock<BroadcastStats>,
}

static REGISTRY: OnceLock<HealthRegistry> = OnceLock::new();

fn registry() -> &'static HealthRegistry {
    REGISTRY.get_or_init(|| HealthRegistry {
        started_at: Instant::now(),
        components: RwLock::new(BTreeMap::new()),
        broadcasts: RwLock::new(BroadcastStats::default()),
    })
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn upsert_component<F>(component: &str, update: F)
where
    F: FnOnce(&mut ComponentHealth),
{
    if let Ok(mut map) = registry().components.write() {
        let now = now_rfc3339();
        let entry = map
            .entry(component.to_string())
            .or_insert_with(|| ComponentHealth {
                status: ComponentStatus::Starting,
                updated_at: now.clone(),
                last_ok: None,
                last_error: None,
                restart_count: 0,
            });
        update(entry);
        entry.updated_at = now;
    }
}

pub fn mark_component_ok(component: &str) {
    upsert_component(component, |entry| {
        entry.status = ComponentStatus::Ok;
        entry.last_ok = Some(now_rfc3339());
        entry.last_error = None;
    });
}

#[allow(clippy::needless_pass_by_value)]
pub fn mark_component_error(component: &str, error: impl ToString) {
    let err = error.to_string();
    upsert_component(component, move |entry| {
        entry.status = ComponentStatus::Error;
        entry.last_error = Some(err);
    });
}

pub fn bump_component_restart(component: &str) {
    upsert_component(component, |entry| {
        entry.restart_count = entry.restart_count.saturating_add(1);
    });
}

/// Fold one autonomous fire into the counters.
pub fn record_broadcast(outcome: &PipelineOutcome, secret_cursor: Option<usize>) {
    let Ok(mut stats) = registry().broadcasts.write() else {
        return;
    };
    stats.fires += 1;
    stats.last_fire_at = Some(now_rfc3339());
    stats.secret_cursor = secret_cursor;
    match outcome {
        PipelineOutcome::Delivered { sent, failed } => {
            stats.lines_sent += *sent as u64;
            stats.lines_failed += *failed as u64;
        }
        PipelineOutcome::Revealed { sent, fallback, .. } => {
            if *sent {
                stats.lines_sent += 1;
            } else {
                stats.lines_failed += 1;
            }
            if *fallback {
                stats.fallbacks += 1;
            }
        }
        PipelineOutcome::Skipped(_) => stats.skipped += 1,
    }
}

pub fn snapshot() -> HealthSnapshot {
    let components = registry()
        .components
        .read()
        .map_or_else(|_| BTreeMap::new(), |map| map.clone());
    let broadcasts = registry()
        .broadcasts
        .read()
        .map_or_else(|_| BroadcastStats::default(), |stats| stats.clone());

    HealthSnapshot {
        pid: std::process::id(),
        updated_at: now_rfc3339(),
        uptime_seconds: registry().started_at.elapsed().as_secs(),
        components,
        broadcasts,
    }
}

pub fn snapshot_json() -> serde_json::Value {
    serde_json::to_value(snapshot()).unwrap_or_else(|_| {
        serde_json::json!({
            "status": "error",
            "message": "failed to serialize health snapshot"
        })
    })
}
