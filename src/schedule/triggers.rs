//! The fixed trigger table of the admission controller.

use crate::config::SchedulerConfig;
use std::time::Duration;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TriggerAction {
    /// Time-bucketed loading tasks (minute buckets)
    LoadingTasksAtTimePoint,
    /// Unconditional ASIN regeneration
    DailyAsinRegeneration,
    /// Loading tasks with a one-hour period, forced
    HourlyLoadingTasks,
    /// Retire collectors outside their run window
    RetireStaleCollectors,
    /// Drop all ASIN work so review tasks get the rest of the day
    ClearAsinTasks,
    /// Admission decision followed by conditional ASIN generation
    AsinWatchdog,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerTiming {
    /// 6-field cron expression (second minute hour day-of-month month day-of-week)
    Cron(&'static str),
    /// Wait `initial`, then fire and wait `delay` after each completion
    FixedDelay { initial: Duration, delay: Duration },
}

impl std::fmt::Display for TriggerTiming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cron(expression) => write!(f, "cron \"{expression}\""),
            Self::FixedDelay { initial, delay } => write!(
                f,
                "after {}s, then every {}s",
                initial.as_secs(),
                delay.as_secs()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub name: &'static str,
    pub timing: TriggerTiming,
    pub action: TriggerAction,
}

const fn cron(name: &'static str, expression: &'static str, action: TriggerAction) -> Trigger {
    Trigger {
        name,
        timing: TriggerTiming::Cron(expression),
        action,
    }
}

pub fn default_triggers(config: &SchedulerConfig) -> Vec<Trigger> {
    vec![
        cron(
            "daily-loading-0900",
            "0 0 9 ? * *",
            TriggerAction::LoadingTasksAtTimePoint,
        ),
        // 10s past midnight so the midnight retirement has finished
        cron(
            "daily-loading-000010",
            "10 0 0 ? * *",
            TriggerAction::LoadingTasksAtTimePoint,
        ),
        cron(
            "daily-asin-1400",
            "0 0 14 ? * *",
            TriggerAction::DailyAsinRegeneration,
        ),
        cron(
            "hourly-loading",
            "0 0 * ? * *",
            TriggerAction::HourlyLoadingTasks,
        ),
        cron(
            "retire-stale-0000",
            "0 0 0 ? * *",
            TriggerAction::RetireStaleCollectors,
        ),
        cron("clear-asin-2330", "0 30 23 ? * *", TriggerAction::ClearAsinTasks),
        Trigger {
            name: "asin-watchdog",
            timing: TriggerTiming::FixedDelay {
                initial: Duration::from_secs(config.watchdog_initial_delay_secs),
                delay: Duration::from_secs(config.watchdog_interval_secs),
            },
            action: TriggerAction::AsinWatchdog,
        },
        Trigger {
            name: "retire-stale-polling",
            timing: TriggerTiming::FixedDelay {
                initial: Duration::from_secs(config.retire_initial_delay_secs),
                delay: Duration::from_secs(config.retire_interval_secs),
            },
            action: TriggerAction::RetireStaleCollectors,
        },
    ]
}
