use crate::config::Config;
use crate::diagnostics::health;
use crate::schedule::{Trigger, TriggerDispatcher, run_trigger};
use anyhow::Result;
use chrono::FixedOffset;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

pub(super) fn spawn_component_supervisor<F, Fut>(
    name: &'static str,
    initial_backoff_secs: u64,
    max_backoff_secs: u64,
    max_restarts: u32,
    mut run_component: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut backoff = initial_backoff_secs.max(1);
        let max_backoff = max_backoff_secs.max(backoff);
        let mut consecutive_failures: u32 = 0;

        loop {
            tracing::info!("Trigger '{name}' starting");
            match run_component().await {
                Ok(()) => {
                    tracing::warn!("Trigger '{name}' exited unexpectedly");
                    backoff = initial_backoff_secs.max(1);
                    consecutive_failures = consecutive_failures.saturating_add(1);
                }
                Err(e) => {
                    tracing::error!("Trigger '{name}' failed: {e}");
                    health::mark_component_error(name, &e);
                    consecutive_failures = consecutive_failures.saturating_add(1);
                }
            }

            if max_restarts > 0 && consecutive_failures > max_restarts {
                tracing::error!(
                    "Trigger '{name}' exceeded max restarts ({max_restarts}), circuit open"
                );
                health::mark_component_error(name, "circuit open");
                break;
            }
            health::bump_component_restart(name);
            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff = backoff.saturating_mul(2).min(max_backoff);
        }
    })
}

pub(super) fn spawn_trigger_supervisors(
    config: &Config,
    triggers: Vec<Trigger>,
    dispatcher: &Arc<TriggerDispatcher>,
    offset: FixedOffset,
) -> Vec<JoinHandle<()>> {
    let reliability = &config.reliability;
    let initial_backoff = reliability.initial_backoff_secs.max(1);
    let max_backoff = reliability.max_backoff_secs.max(initial_backoff);

    triggers
        .into_iter()
        .map(|trigger| {
            let dispatcher = Arc::clone(dispatcher);
            spawn_component_supervisor(
                trigger.name,
                initial_backoff,
                max_backoff,
                reliability.max_restarts,
                move || run_trigger(trigger.clone(), Arc::clone(&dispatcher), offset),
            )
        })
        .collect()
}
