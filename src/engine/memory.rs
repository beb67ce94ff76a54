use super::{CollectorSnapshot, CrawlLoop};
use crate::catalog::ResidentTask;
use crate::error::EngineError;
use async_trait::async_trait;
use std::sync::RwLock;

/// A submission accepted by [`MemoryCrawlLoop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub task: ResidentTask,
    pub force: bool,
}

/// In-process crawl loop used for dry runs and tests.
///
/// Submitted batches open a collector with `initial_size` pending items; the
/// pending counts can then be driven by hand with [`MemoryCrawlLoop::set_pending`].
#[derive(Debug, Default)]
pub struct MemoryCrawlLoop {
    collectors: RwLock<Vec<CollectorSnapshot>>,
    submissions: RwLock<Vec<Submission>>,
    initial_size: u64,
}

impl MemoryCrawlLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collectors(collectors: Vec<CollectorSnapshot>) -> Self {
        Self {
            collectors: RwLock::new(collectors),
            ..Self::default()
        }
    }

    /// Pending count given to collectors opened by `submit`.
    pub fn with_initial_size(mut self, initial_size: u64) -> Self {
        self.initial_size = initial_size;
        self
    }

    /// Overwrites the pending count of a collector; returns false if it is unknown.
    pub fn set_pending(&self, name: &str, external_size: u64) -> bool {
        let Ok(mut collectors) = self.collectors.write() else {
            return false;
        };
        match collectors.iter_mut().find(|c| c.name == name) {
            Some(collector) => {
                collector.external_size = external_size;
                true
            }
            None => false,
        }
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn collector_names(&self) -> Vec<String> {
        self.collectors
            .read()
            .map(|c| c.iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CrawlLoop for MemoryCrawlLoop {
    fn name(&self) -> &str {
        "memory"
    }

    async fn open_collectors(&self) -> Result<Vec<CollectorSnapshot>, EngineError> {
        self.collectors
            .read()
            .map(|c| c.clone())
            .map_err(|_| EngineError::Decode("collector table lock poisoned".into()))
    }

    async fn submit(&self, task: &ResidentTask, force: bool) -> Result<(), EngineError> {
        let poisoned = || EngineError::Rejected {
            task: task.name.clone(),
            reason: "collector table lock poisoned".into(),
        };

        self.collectors.write().map_err(|_| poisoned())?.push(
            CollectorSnapshot::tagged(task.collector_name(), task.category, self.initial_size),
        );
        self.submissions
            .write()
            .map_err(|_| poisoned())?
            .push(Submission {
                task: task.clone(),
                force,
            });
        Ok(())
    }

    async fn retire(&self, names: &[String]) -> Result<usize, EngineError> {
        let mut collectors = self
            .collectors
            .write()
            .map_err(|_| EngineError::Decode("collector table lock poisoned".into()))?;
        let before = collectors.len();
        collectors.retain(|c| !names.contains(&c.name));
        Ok(before - collectors.len())
    }
}
