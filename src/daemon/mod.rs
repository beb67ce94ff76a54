use crate::admission::{AdmissionController, GenerationGuard};
use crate::config::Config;
use crate::engine::create_crawl_loop;
use crate::generator::{CatalogGenerator, TaskGenerator};
use crate::inspector::CollectorInspector;
use crate::schedule::{TriggerDispatcher, default_triggers};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::task::JoinHandle;

mod state;
mod supervisor;

pub use state::read_state_file;
use state::spawn_state_writer;
use supervisor::spawn_trigger_supervisors;

const STATUS_FLUSH_SECONDS: u64 = 5;

/// Wires catalog, engine, generator and controller from config.
///
/// A malformed catalog or engine config is fatal here, before any trigger
/// is scheduled.
pub fn build_dispatcher(config: &Config) -> Result<TriggerDispatcher> {
    let catalog = Arc::new(config.build_catalog().context("Invalid task catalog")?);
    let engine = create_crawl_loop(&config.engine)?;
    let generator: Arc<dyn TaskGenerator> =
        Arc::new(CatalogGenerator::new(Arc::clone(&catalog), Arc::clone(&engine)));
    let guard = Arc::new(GenerationGuard::new());

    let controller = AdmissionController::new(
        Arc::clone(&catalog),
        CollectorInspector::new(engine),
        Arc::clone(&generator),
        config.generation.clone(),
        Arc::clone(&guard),
    );

    Ok(TriggerDispatcher::new(controller, generator, catalog, guard))
}

pub async fn run(config: Arc<Config>) -> Result<()> {
    let dispatcher = Arc::new(build_dispatcher(&config)?);
    let offset = config.utc_offset()?;
    let triggers = default_triggers(&config.scheduler);

    crate::diagnostics::health::mark_component_ok("daemon");

    let mut handles: Vec<JoinHandle<()>> = vec![spawn_state_writer(Arc::clone(&config))];
    handles.extend(spawn_trigger_supervisors(
        &config,
        triggers,
        &dispatcher,
        offset,
    ));

    tracing::info!(
        triggers = handles.len() - 1,
        generation_enabled = config.generation.enabled,
        engine = ?config.engine.kind,
        "Admission daemon started, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    crate::diagnostics::health::mark_component_error("daemon", "shutdown requested");

    for handle in &handles {
        handle.abort();
    }
    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}
