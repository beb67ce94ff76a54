#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use crawl_admission::admission::{AdmissionController, GenerationGuard};
use crawl_admission::catalog::TaskCatalog;
use crawl_admission::config::GenerationConfig;
use crawl_admission::engine::{CollectorSnapshot, MemoryCrawlLoop};
use crawl_admission::generator::{CatalogGenerator, TaskGenerator};
use crawl_admission::inspector::CollectorInspector;
use crawl_admission::schedule::TriggerDispatcher;

pub struct Harness {
    pub engine: Arc<MemoryCrawlLoop>,
    pub dispatcher: TriggerDispatcher,
}

impl Harness {
    pub fn new(collectors: Vec<CollectorSnapshot>) -> Self {
        Self::with_settings(collectors, GenerationConfig::default())
    }

    pub fn with_settings(collectors: Vec<CollectorSnapshot>, settings: GenerationConfig) -> Self {
        let engine = Arc::new(MemoryCrawlLoop::with_collectors(collectors).with_initial_size(500));
        let catalog = Arc::new(TaskCatalog::builtin(utc()));
        let generator: Arc<dyn TaskGenerator> =
            Arc::new(CatalogGenerator::new(Arc::clone(&catalog), engine.clone()));
        let guard = Arc::new(GenerationGuard::new());
        let controller = AdmissionController::new(
            Arc::clone(&catalog),
            CollectorInspector::new(engine.clone()),
            Arc::clone(&generator),
            settings,
            Arc::clone(&guard),
        );
        let dispatcher = TriggerDispatcher::new(controller, generator, catalog, guard);
        Self { engine, dispatcher }
    }

    pub fn asin_submissions(&self) -> usize {
        self.engine
            .submissions()
            .iter()
            .filter(|s| s.task.category == crawl_admission::catalog::TaskCategory::Asin)
            .count()
    }
}

pub fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

pub fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, second).unwrap()
}
