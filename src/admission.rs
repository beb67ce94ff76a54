//! Admission controller: decides whether a new ASIN batch may be generated.
//!
//! Rules are evaluated in priority order and the first match wins:
//!
//! | code | message              | generates |
//! |------|----------------------|-----------|
//! | 100  | `disabled`           | no        |
//! | 95   | `not runtime`        | no        |
//! | 97   | `collectors unavailable` | no    |
//! | 90   | `still review tasks` | no        |
//! | 0    | `few asins`          | yes       |
//! | 80   | `still other tasks`  | no        |
//! | 0    | `no any task`        | yes       |
//!
//! Non-zero codes are "held off" reasons; lower values are closer to
//! generating. Codes 10 (`busy`) and 20 (`generation failed`) come from the
//! generation step itself.

use crate::catalog::{TaskCatalog, TaskCategory};
use crate::config::GenerationConfig;
use crate::generator::TaskGenerator;
use crate::inspector::{CollectorInspector, CollectorView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

pub const CODE_GENERATED: u32 = 0;
pub const CODE_BUSY: u32 = 10;
pub const CODE_GENERATION_FAILED: u32 = 20;
pub const CODE_STILL_OTHER_TASKS: u32 = 80;
pub const CODE_STILL_REVIEW_TASKS: u32 = 90;
pub const CODE_NOT_RUNTIME: u32 = 95;
pub const CODE_COLLECTORS_UNAVAILABLE: u32 = 97;
pub const CODE_DISABLED: u32 = 100;

/// Outcome of one admission check, kept for logging and monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckState {
    pub code: u32,
    pub message: String,
}

impl CheckState {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(CODE_DISABLED, "disabled")
    }

    pub fn collectors_unavailable() -> Self {
        Self::new(CODE_COLLECTORS_UNAVAILABLE, "collectors unavailable")
    }

    pub fn not_runtime() -> Self {
        Self::new(CODE_NOT_RUNTIME, "not runtime")
    }

    pub fn still_review_tasks() -> Self {
        Self::new(CODE_STILL_REVIEW_TASKS, "still review tasks")
    }

    pub fn few_asins() -> Self {
        Self::new(CODE_GENERATED, "few asins")
    }

    pub fn still_other_tasks() -> Self {
        Self::new(CODE_STILL_OTHER_TASKS, "still other tasks")
    }

    pub fn no_any_task() -> Self {
        Self::new(CODE_GENERATED, "no any task")
    }

    pub fn busy() -> Self {
        Self::new(CODE_BUSY, "busy")
    }

    pub fn generation_failed(error: impl std::fmt::Display) -> Self {
        Self::new(CODE_GENERATION_FAILED, format!("generation failed: {error}"))
    }

    /// Same code as a generation fault, for actions that only retire work.
    pub fn action_failed(action: impl std::fmt::Display, error: impl std::fmt::Display) -> Self {
        Self::new(CODE_GENERATION_FAILED, format!("{action} failed: {error}"))
    }
}

impl std::fmt::Display for CheckState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

/// Result of the pure rule chain, before any side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Hold(CheckState),
    Generate(CheckState),
}

/// Backlog rules, evaluated in order against one collector snapshot.
///
/// Review work blocks ASIN generation outright. A nearly drained ASIN batch
/// (`0 < pending <= threshold`, inclusive) is topped up before the global
/// backlog rule is considered.
pub fn evaluate(min_asin_threshold: u64, in_run_window: bool, view: &CollectorView) -> Verdict {
    let review_pending = view.pending_for(TaskCategory::Review);
    if review_pending > 0 {
        return Verdict::Hold(CheckState::still_review_tasks());
    }

    let asin_pending = view.pending_for(TaskCategory::Asin);
    if (1..=min_asin_threshold).contains(&asin_pending) && in_run_window {
        return Verdict::Generate(CheckState::few_asins());
    }

    if view.total_pending() > 0 {
        return Verdict::Hold(CheckState::still_other_tasks());
    }

    Verdict::Generate(CheckState::no_any_task())
}

/// Non-blocking per-category mutual exclusion around generation calls.
#[derive(Debug, Default)]
pub struct GenerationGuard {
    busy: Mutex<BTreeSet<TaskCategory>>,
}

pub struct GenerationPermit<'a> {
    guard: &'a GenerationGuard,
    category: TaskCategory,
}

impl GenerationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` immediately if `category` is already being generated.
    pub fn try_acquire(&self, category: TaskCategory) -> Option<GenerationPermit<'_>> {
        let mut busy = self.busy.lock().ok()?;
        if busy.insert(category) {
            Some(GenerationPermit {
                guard: self,
                category,
            })
        } else {
            None
        }
    }

    pub fn is_busy(&self, category: TaskCategory) -> bool {
        self.busy
            .lock()
            .map(|busy| busy.contains(&category))
            .unwrap_or(true)
    }
}

impl Drop for GenerationPermit<'_> {
    fn drop(&mut self) {
        if let Ok(mut busy) = self.guard.busy.lock() {
            busy.remove(&self.category);
        }
    }
}

pub struct AdmissionController {
    catalog: Arc<TaskCatalog>,
    inspector: CollectorInspector,
    generator: Arc<dyn TaskGenerator>,
    settings: GenerationConfig,
    guard: Arc<GenerationGuard>,
}

impl AdmissionController {
    pub fn new(
        catalog: Arc<TaskCatalog>,
        inspector: CollectorInspector,
        generator: Arc<dyn TaskGenerator>,
        settings: GenerationConfig,
        guard: Arc<GenerationGuard>,
    ) -> Self {
        Self {
            catalog,
            inspector,
            generator,
            settings,
            guard,
        }
    }

    pub fn settings(&self) -> &GenerationConfig {
        &self.settings
    }

    /// Runs the rule chain for `now` and, when it says so, generates one ASIN
    /// batch. Never retries: the next trigger firing is the retry.
    pub async fn decide(&self, now: DateTime<Utc>) -> CheckState {
        if !self.settings.enabled {
            return CheckState::disabled();
        }

        let in_run_window = self
            .catalog
            .by_category(TaskCategory::Asin)
            .is_some_and(|asin| self.catalog.is_run_time(asin, now));
        if !in_run_window {
            return CheckState::not_runtime();
        }

        let view = match self.inspector.open_collectors().await {
            Ok(view) => view,
            Err(e) => {
                tracing::warn!(
                    backend = self.inspector.backend(),
                    error = %e,
                    "Collector read failed, holding off generation"
                );
                return CheckState::collectors_unavailable();
            }
        };

        match evaluate(self.settings.min_asin_threshold, in_run_window, &view) {
            Verdict::Hold(state) => state,
            Verdict::Generate(state) => self.generate_asin(state).await,
        }
    }

    async fn generate_asin(&self, state: CheckState) -> CheckState {
        let Some(_permit) = self.guard.try_acquire(TaskCategory::Asin) else {
            tracing::debug!("ASIN generation already in progress");
            return CheckState::busy();
        };

        tracing::info!("{}, generating asin tasks ...", state.message);
        match self.generator.generate_asin_tasks().await {
            Ok(()) => state,
            Err(e) => {
                tracing::warn!(error = %e, "ASIN task generation failed");
                CheckState::generation_failed(e)
            }
        }
    }
}
