use crate::admission::CheckState;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{OnceLock, RwLock};
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub updated_at: String,
    pub last_ok: Option<String>,
    pub last_error: Option<String>,
    pub restart_count: u64,
    pub fire_count: u64,
    /// Most recent admission outcome, for triggers that produce one.
    pub last_check: Option<CheckState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub pid: u32,
    pub updated_at: String,
    pub uptime_seconds: u64,
    pub components: BTreeMap<String, ComponentHealth>,
}

struct HealthRegistry {
    started_at: Instant,
    components: RwLock<BTreeMap<String, ComponentHealth>>,
}

static REGISTRY: OnceLock<HealthRegistry> = OnceLock::new();

fn registry() -> &'static HealthRegistry {
    REGISTRY.get_or_init(|| HealthRegistry {
        started_at: Instant::now(),
        components: RwLock::new(BTreeMap::new()),
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
                status: "starting".into(),
                updated_at: now.clone(),
                last_ok: None,
                last_error: None,
                restart_count: 0,
                fire_count: 0,
                last_check: None,
            });
        update(entry);
        entry.updated_at = now;
    }
}

pub fn mark_component_ok(component: &str) {
    upsert_component(component, |entry| {
        entry.status = "ok".into();
        entry.last_ok = Some(now_rfc3339());
        entry.last_error = None;
    });
}

#[allow(clippy::needless_pass_by_value)]
pub fn mark_component_error(component: &str, error: impl ToString) {
    let err = error.to_string();
    upsert_component(component, move |entry| {
        entry.status = "error".into();
        entry.last_error = Some(err);
    });
}

pub fn bump_component_restart(component: &str) {
    upsert_component(component, |entry| {
        entry.restart_count = entry.restart_count.saturating_add(1);
    });
}

pub fn bump_component_fire(component: &str) {
    upsert_component(component, |entry| {
        entry.fire_count = entry.fire_count.saturating_add(1);
    });
}

/// Stores the admission outcome of a trigger firing. Held-off outcomes are
/// healthy; only failed actions (code 20) flip the component to `error`.
pub fn record_check_state(component: &str, state: &CheckState) {
    let state = state.clone();
    upsert_component(component, move |entry| {
        if state.code == crate::admission::CODE_GENERATION_FAILED {
            entry.status = "error".into();
            entry.last_error = Some(state.message.clone());
        } else {
            entry.status = "ok".into();
            entry.last_ok = Some(now_rfc3339());
            entry.last_error = None;
        }
        entry.last_check = Some(state);
    });
}

pub fn component(component: &str) -> Option<ComponentHealth> {
    registry()
        .components
        .read()
        .ok()
        .and_then(|map| map.get(component).cloned())
}

pub fn snapshot() -> HealthSnapshot {
    let components = registry()
        .components
        .read()
        .map_or_else(|_| BTreeMap::new(), |map| map.clone());

    HealthSnapshot {
        pid: std::process::id(),
        updated_at: now_rfc3339(),
        uptime_seconds: registry().started_at.elapsed().as_secs(),
        components,
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
