use super::dispatch::TriggerDispatcher;
use super::expression::parse_schedule;
use super::triggers::{Trigger, TriggerTiming};
use crate::diagnostics::health;
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use cron::Schedule;
use std::sync::Arc;
use std::time::Duration;

/// Drives one trigger forever. Only returns on an unusable cron expression.
pub async fn run_trigger(
    trigger: Trigger,
    dispatcher: Arc<TriggerDispatcher>,
    offset: FixedOffset,
) -> Result<()> {
    match trigger.timing {
        TriggerTiming::Cron(expression) => {
            let schedule = parse_schedule(expression)?;
            health::mark_component_ok(trigger.name);
            loop {
                let now = Utc::now().with_timezone(&offset);
                let (next, wait) = next_firing(&schedule, now)
                    .with_context(|| format!("No future occurrence for {expression}"))?;
                tracing::debug!(trigger = trigger.name, %next, "Sleeping until next firing");
                tokio::time::sleep(wait).await;

                // clock moved backwards while asleep
                if Utc::now() < next {
                    continue;
                }
                // the scheduled occurrence, not the wake-up instant
                fire_once(&trigger, &dispatcher, next.with_timezone(&Utc)).await;
            }
        }
        TriggerTiming::FixedDelay { initial, delay } => {
            health::mark_component_ok(trigger.name);
            tokio::time::sleep(initial).await;
            loop {
                fire_once(&trigger, &dispatcher, Utc::now()).await;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Next occurrence strictly after `now`, and how long to sleep until it.
pub(crate) fn next_firing(
    schedule: &Schedule,
    now: DateTime<FixedOffset>,
) -> Option<(DateTime<FixedOffset>, Duration)> {
    let next = schedule.after(&now).next()?;
    Some((next, (next - now).to_std().unwrap_or_default()))
}

pub async fn fire_once(trigger: &Trigger, dispatcher: &TriggerDispatcher, now: DateTime<Utc>) {
    health::bump_component_fire(trigger.name);
    match dispatcher.fire(trigger.action, now).await {
        Some(state) => health::record_check_state(trigger.name, &state),
        None => health::mark_component_ok(trigger.name),
    }
}
