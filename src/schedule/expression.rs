use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use cron::Schedule;
use std::str::FromStr;

pub fn parse_schedule(expression: &str) -> Result<Schedule> {
    let normalized = normalize_expression(expression)?;
    Schedule::from_str(&normalized).with_context(|| format!("Invalid cron expression: {expression}"))
}

pub fn next_run_for<Tz: TimeZone>(expression: &str, from: &DateTime<Tz>) -> Result<DateTime<Tz>> {
    parse_schedule(expression)?
        .after(from)
        .next()
        .ok_or_else(|| anyhow::anyhow!("No future occurrence for expression: {expression}"))
}

/// Accepts 5-field crontab, 6-field (with seconds) and 7-field (with year)
/// syntax. Quartz-style `?` is treated as `*`.
pub fn normalize_expression(expression: &str) -> Result<String> {
    let expression = expression.trim();
    let fields: Vec<&str> = expression
        .split_whitespace()
        .map(|field| if field == "?" { "*" } else { field })
        .collect();

    match fields.len() {
        // standard crontab syntax: minute hour day month weekday
        5 => Ok(format!("0 {}", fields.join(" "))),
        // crate-native syntax includes seconds (+ optional year)
        6 | 7 => Ok(fields.join(" ")),
        count => anyhow::bail!(
            "Invalid cron expression: {expression} (expected 5, 6, or 7 fields, got {count})"
        ),
    }
}
