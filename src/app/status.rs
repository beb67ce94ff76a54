use chrono::{DateTime, FixedOffset, Utc};
use crawl_admission::Config;
use crawl_admission::catalog::TaskCatalog;
use crawl_admission::schedule::expression::next_run_for;
use crawl_admission::schedule::{Trigger, TriggerTiming};
use std::time::Duration;

fn format_period(period: Duration) -> String {
    let secs = period.as_secs();
    match secs {
        s if s % 86_400 == 0 => format!("{}d", s / 86_400),
        s if s % 3_600 == 0 => format!("{}h", s / 3_600),
        s if s % 60 == 0 => format!("{}m", s / 60),
        s => format!("{s}s"),
    }
}

pub fn render_catalog(catalog: &TaskCatalog, now: DateTime<Utc>) -> String {
    let mut lines = vec![
        format!(
            "◆ Task catalog (local time {} at {})",
            catalog.local_time(now).format("%H:%M:%S"),
            catalog.offset()
        ),
        String::new(),
    ];

    for def in catalog.all_tasks() {
        lines.push(format!(
            "  {:20} {:20} every {:4} window {:19} {}",
            def.name,
            def.category.to_string(),
            format_period(def.period),
            def.window.to_string(),
            if catalog.is_run_time(def, now) {
                "✓ running"
            } else {
                "✗ idle"
            }
        ));
    }

    lines.join("\n")
}

pub fn render_triggers(triggers: &[Trigger], offset: FixedOffset, now: DateTime<Utc>) -> String {
    let local_now = now.with_timezone(&offset);
    let mut lines = vec![format!("◆ Triggers ({offset})"), String::new()];

    for trigger in triggers {
        let next = match &trigger.timing {
            TriggerTiming::Cron(expression) => next_run_for(expression, &local_now)
                .map_or_else(|e| format!("invalid: {e}"), |at| at.to_rfc3339()),
            TriggerTiming::FixedDelay { initial, .. } => {
                format!("{}s after daemon start", initial.as_secs())
            }
        };
        lines.push(format!(
            "  {:22} {:30} {:28} next: {next}",
            trigger.name,
            trigger.action.to_string(),
            trigger.timing.to_string()
        ));
    }

    lines.join("\n")
}

pub fn render_status(config: &Config, daemon_state: Option<&serde_json::Value>) -> String {
    let mut lines = vec![
        "◆ crawl-admission status".to_string(),
        String::new(),
        format!("  Version      {}", env!("CARGO_PKG_VERSION")),
        format!("  Config       {}", config.config_path.display()),
        format!(
            "  Generation   {} (min asin threshold {})",
            if config.generation.enabled {
                "enabled"
            } else {
                "disabled"
            },
            config.generation.min_asin_threshold
        ),
        format!(
            "  Engine       {:?}{}",
            config.engine.kind,
            config
                .engine
                .base_url
                .as_deref()
                .map(|url| format!(" at {url}"))
                .unwrap_or_default()
        ),
        format!("  UTC offset   {}", config.scheduler.utc_offset),
        String::new(),
    ];

    let Some(state) = daemon_state else {
        lines.push("  Daemon       no state file (not started yet)".into());
        return lines.join("\n");
    };

    lines.push(format!(
        "  Daemon       pid {} last written {}",
        state["pid"],
        state["written_at"].as_str().unwrap_or("?")
    ));

    if let Some(components) = state["components"].as_object() {
        for (name, component) in components {
            let last_check = component["last_check"]
                .as_object()
                .map(|check| {
                    let message = check["message"].as_str().unwrap_or("");
                    format!(" last: {} {message}", check["code"])
                })
                .unwrap_or_default();
            lines.push(format!(
                "    {name:22} {:8} fired {}{last_check}",
                component["status"].as_str().unwrap_or("?"),
                component["fire_count"]
            ));
        }
    }

    lines.join("\n")
}
