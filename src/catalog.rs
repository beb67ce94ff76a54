//! Task catalog: the fixed set of crawl task definitions.
//!
//! The catalog is built once at startup (from config or the built-in table)
//! and is read-only afterwards. Any malformed entry is reported as a
//! [`CatalogError`] and the process refuses to start.

use crate::error::CatalogError;
use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

pub const HOUR: Duration = Duration::from_secs(60 * 60);
pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskCategory {
    Asin,
    Review,
    BestSellers,
    NewReleases,
    MoversAndShakers,
    MostWishedFor,
    Other,
}

/// Wall-clock window during which a task is allowed to run.
///
/// `start == end` covers the whole day; `start > end` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl RunWindow {
    pub const fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn all_day() -> Self {
        Self::new(NaiveTime::MIN, NaiveTime::MIN)
    }

    pub fn is_all_day(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.is_all_day() {
            true
        } else if self.start < self.end {
            time >= self.start && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

impl std::fmt::Display for RunWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_all_day() {
            write!(f, "all day")
        } else {
            write!(
                f,
                "{}-{}",
                self.start.format("%H:%M:%S"),
                self.end.format("%H:%M:%S")
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    pub name: String,
    pub category: TaskCategory,
    pub period: Duration,
    pub window: RunWindow,
}

/// Generator-ready form of a [`TaskDefinition`]. Recreated for every check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidentTask {
    pub name: String,
    pub category: TaskCategory,
    pub period_secs: u64,
    pub batch_id: String,
}

impl ResidentTask {
    /// Collector names always carry the category name so pending counts can
    /// be attributed back to the category.
    pub fn collector_name(&self) -> String {
        format!("{}-{}-{}", self.category, self.name, self.batch_id)
    }
}

/// Raw catalog entry as found in `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub name: String,
    pub category: String,
    pub period_secs: u64,
    /// `HH:MM` or `HH:MM:SS`; omitted bounds mean "all day".
    #[serde(default)]
    pub window_start: Option<String>,
    #[serde(default)]
    pub window_end: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TaskCatalog {
    tasks: Vec<TaskDefinition>,
    offset: FixedOffset,
}

impl TaskCatalog {
    pub fn new(tasks: Vec<TaskDefinition>, offset: FixedOffset) -> Result<Self, CatalogError> {
        validate(&tasks)?;
        Ok(Self { tasks, offset })
    }

    pub fn builtin(offset: FixedOffset) -> Self {
        let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN);
        let task = |name: &str, category, period, window| TaskDefinition {
            name: name.to_string(),
            category,
            period,
            window,
        };

        Self {
            tasks: vec![
                task(
                    "asin",
                    TaskCategory::Asin,
                    DAY,
                    RunWindow::new(hm(0, 0), hm(23, 30)),
                ),
                task("review", TaskCategory::Review, DAY, RunWindow::all_day()),
                task(
                    "best-sellers",
                    TaskCategory::BestSellers,
                    HOUR,
                    RunWindow::all_day(),
                ),
                task(
                    "new-releases",
                    TaskCategory::NewReleases,
                    HOUR,
                    RunWindow::all_day(),
                ),
                task(
                    "movers-and-shakers",
                    TaskCategory::MoversAndShakers,
                    HOUR,
                    RunWindow::all_day(),
                ),
                task(
                    "most-wished-for",
                    TaskCategory::MostWishedFor,
                    DAY,
                    RunWindow::new(hm(9, 0), hm(23, 0)),
                ),
            ],
            offset,
        }
    }

    pub fn from_config(entries: &[TaskConfig], offset: FixedOffset) -> Result<Self, CatalogError> {
        let tasks = entries
            .iter()
            .map(parse_entry)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(tasks, offset)
    }

    pub fn all_tasks(&self) -> &[TaskDefinition] {
        &self.tasks
    }

    pub fn tasks_with_period(&self, period: Duration) -> Vec<&TaskDefinition> {
        self.tasks.iter().filter(|t| t.period == period).collect()
    }

    pub fn by_category(&self, category: TaskCategory) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| t.category == category)
    }

    pub fn by_name(&self, name: &str) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn local_time(&self, now: DateTime<Utc>) -> NaiveTime {
        now.with_timezone(&self.offset).time()
    }

    pub fn is_run_time(&self, def: &TaskDefinition, now: DateTime<Utc>) -> bool {
        def.window.contains(self.local_time(now))
    }

    pub fn to_resident(&self, def: &TaskDefinition) -> ResidentTask {
        ResidentTask {
            name: def.name.clone(),
            category: def.category,
            period_secs: def.period.as_secs(),
            batch_id: Uuid::new_v4().simple().to_string(),
        }
    }
}

fn validate(tasks: &[TaskDefinition]) -> Result<(), CatalogError> {
    if tasks.is_empty() {
        return Err(CatalogError::Empty);
    }

    let mut seen = HashSet::new();
    for task in tasks {
        if !seen.insert(task.name.as_str()) {
            return Err(CatalogError::DuplicateName(task.name.clone()));
        }
        if task.period.is_zero() {
            return Err(CatalogError::ZeroPeriod {
                name: task.name.clone(),
            });
        }
    }

    let asin_tasks = tasks
        .iter()
        .filter(|t| t.category == TaskCategory::Asin)
        .count();
    if asin_tasks != 1 {
        return Err(CatalogError::AsinTaskCount(asin_tasks));
    }

    Ok(())
}

fn parse_entry(entry: &TaskConfig) -> Result<TaskDefinition, CatalogError> {
    let category = TaskCategory::from_str(entry.category.trim())
        .map_err(|_| CatalogError::UnknownCategory(entry.category.clone()))?;

    let bound = |raw: &Option<String>| -> Result<NaiveTime, CatalogError> {
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(NaiveTime::MIN),
            Some(value) => parse_time_of_day(value).ok_or_else(|| CatalogError::InvalidWindow {
                name: entry.name.clone(),
                raw: value.to_string(),
            }),
        }
    };

    Ok(TaskDefinition {
        name: entry.name.trim().to_string(),
        category,
        period: Duration::from_secs(entry.period_secs),
        window: RunWindow::new(bound(&entry.window_start)?, bound(&entry.window_end)?),
    })
}

fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Parses `+HH:MM` / `-HH:MM` (or `Z` / `UTC`) into a fixed UTC offset.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset, CatalogError> {
    let raw = raw.trim();
    let invalid = || CatalogError::InvalidOffset(raw.to_string());
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }
    raw.parse::<FixedOffset>().map_err(|_| invalid())
}
