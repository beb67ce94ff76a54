//! Task generator port and the catalog-driven implementation.

use crate::catalog::{DAY, ResidentTask, TaskCatalog, TaskCategory, TaskDefinition};
use crate::engine::CrawlLoop;
use crate::error::EngineError;
use crate::inspector::CollectorView;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveTime, Timelike, Utc};
use std::sync::{Arc, Mutex, MutexGuard};

/// Bucket size for time-point generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeGranularity {
    Minutes,
    Hours,
    Days,
}

impl TimeGranularity {
    pub fn truncate(self, at: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        let base = at.with_nanosecond(0).and_then(|t| t.with_second(0));
        let truncated = match self {
            Self::Minutes => base,
            Self::Hours => base.and_then(|t| t.with_minute(0)),
            Self::Days => base
                .and_then(|t| t.with_minute(0))
                .and_then(|t| t.with_hour(0)),
        };
        truncated.unwrap_or(at)
    }

    pub fn truncate_time(self, time: NaiveTime) -> NaiveTime {
        let (hour, minute) = match self {
            Self::Minutes => (time.hour(), time.minute()),
            Self::Hours => (time.hour(), 0),
            Self::Days => (0, 0),
        };
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

/// Materializes task definitions into enqueued crawl work.
///
/// Implementations must tolerate at-least-once invocation: the scheduler may
/// call any of these more than once per logical window.
#[async_trait]
pub trait TaskGenerator: Send + Sync {
    /// Enqueue the given tasks; returns how many were submitted.
    async fn generate_loading_tasks(
        &self,
        tasks: &[ResidentTask],
        force: bool,
    ) -> Result<usize, EngineError>;

    /// Regenerate the ASIN batch unconditionally.
    async fn generate_asin_tasks(&self) -> Result<(), EngineError>;

    /// Enqueue the daily tasks whose run window opens at the current time
    /// bucket. Repeated calls within one bucket are no-ops.
    async fn generate_loading_tasks_at_time_point(
        &self,
        now: DateTime<Utc>,
        granularity: TimeGranularity,
    ) -> Result<usize, EngineError>;

    /// Retire every open collector of `category`.
    async fn clear_all(&self, category: TaskCategory) -> Result<usize, EngineError>;

    /// Retire drained collectors and collectors whose task is outside its
    /// run window. Non-empty collectors no catalog task claims are kept.
    async fn clear_if_not_in_run_time(&self, now: DateTime<Utc>) -> Result<usize, EngineError>;
}

pub struct CatalogGenerator {
    catalog: Arc<TaskCatalog>,
    engine: Arc<dyn CrawlLoop>,
    last_time_point: Mutex<Option<DateTime<FixedOffset>>>,
}

impl CatalogGenerator {
    pub fn new(catalog: Arc<TaskCatalog>, engine: Arc<dyn CrawlLoop>) -> Self {
        Self {
            catalog,
            engine,
            last_time_point: Mutex::new(None),
        }
    }

    async fn view(&self) -> Result<CollectorView, EngineError> {
        Ok(CollectorView::new(self.engine.open_collectors().await?))
    }

    fn last_time_point(
        &self,
    ) -> Result<MutexGuard<'_, Option<DateTime<FixedOffset>>>, EngineError> {
        self.last_time_point
            .lock()
            .map_err(|_| EngineError::State("time point lock poisoned".into()))
    }

    fn owner_of(&self, name: &str, tag: Option<TaskCategory>) -> Option<&TaskDefinition> {
        match tag {
            Some(category) => self.catalog.by_category(category),
            None => self
                .catalog
                .all_tasks()
                .iter()
                .find(|def| name.contains(&def.category.to_string())),
        }
    }
}

#[async_trait]
impl TaskGenerator for CatalogGenerator {
    async fn generate_loading_tasks(
        &self,
        tasks: &[ResidentTask],
        force: bool,
    ) -> Result<usize, EngineError> {
        let view = if force { None } else { Some(self.view().await?) };

        let mut submitted = 0;
        for task in tasks {
            if let Some(view) = &view
                && view.pending_for(task.category) > 0
            {
                tracing::debug!(task = %task.name, "Skipping task with pending work");
                continue;
            }
            self.engine.submit(task, force).await?;
            submitted += 1;
        }

        tracing::info!(submitted, requested = tasks.len(), force, "Loading tasks generated");
        Ok(submitted)
    }

    async fn generate_asin_tasks(&self) -> Result<(), EngineError> {
        let def = self
            .catalog
            .by_category(TaskCategory::Asin)
            .ok_or_else(|| EngineError::Rejected {
                task: TaskCategory::Asin.to_string(),
                reason: "no ASIN task in catalog".into(),
            })?;
        let task = self.catalog.to_resident(def);
        self.engine.submit(&task, true).await?;
        tracing::info!(collector = %task.collector_name(), "ASIN tasks generated");
        Ok(())
    }

    async fn generate_loading_tasks_at_time_point(
        &self,
        now: DateTime<Utc>,
        granularity: TimeGranularity,
    ) -> Result<usize, EngineError> {
        let bucket = granularity.truncate(now.with_timezone(&self.catalog.offset()));
        if *self.last_time_point()? == Some(bucket) {
            tracing::debug!(%bucket, "Time point already generated");
            return Ok(0);
        }

        let time_of_day = bucket.time();
        let tasks: Vec<ResidentTask> = self
            .catalog
            .all_tasks()
            .iter()
            .filter(|def| def.category != TaskCategory::Asin)
            .filter(|def| def.period >= DAY)
            .filter(|def| granularity.truncate_time(def.window.start) == time_of_day)
            .map(|def| self.catalog.to_resident(def))
            .collect();

        let submitted = if tasks.is_empty() {
            tracing::debug!(%bucket, "No daily task opens at this time point");
            0
        } else {
            self.generate_loading_tasks(&tasks, true).await?
        };

        // claimed only once every task of the bucket was submitted
        *self.last_time_point()? = Some(bucket);
        Ok(submitted)
    }

    async fn clear_all(&self, category: TaskCategory) -> Result<usize, EngineError> {
        let names: Vec<String> = self
            .view()
            .await?
            .iter()
            .filter(|c| c.belongs_to(category))
            .map(|c| c.name.clone())
            .collect();

        let retired = self.engine.retire(&names).await?;
        tracing::info!(%category, retired, "Cleared category collectors");
        Ok(retired)
    }

    async fn clear_if_not_in_run_time(&self, now: DateTime<Utc>) -> Result<usize, EngineError> {
        let view = self.view().await?;
        let names: Vec<String> = view
            .iter()
            .filter(|c| {
                c.external_size == 0
                    || self
                        .owner_of(&c.name, c.category)
                        .is_some_and(|def| !self.catalog.is_run_time(def, now))
            })
            .map(|c| c.name.clone())
            .collect();

        if names.is_empty() {
            return Ok(0);
        }

        let retired = self.engine.retire(&names).await?;
        tracing::info!(retired, "Retired drained or out-of-window collectors");
        Ok(retired)
    }
}
