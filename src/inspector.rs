//! Read-only view over the crawl engine's open collectors.

use crate::catalog::TaskCategory;
use crate::engine::{CollectorSnapshot, CrawlLoop};
use crate::error::EngineError;
use std::sync::Arc;

#[derive(Clone)]
pub struct CollectorInspector {
    engine: Arc<dyn CrawlLoop>,
}

impl CollectorInspector {
    pub fn new(engine: Arc<dyn CrawlLoop>) -> Self {
        Self { engine }
    }

    /// Point-in-time copy of the open collectors. May be slightly stale.
    pub async fn open_collectors(&self) -> Result<CollectorView, EngineError> {
        let snapshots = self.engine.open_collectors().await?;
        Ok(CollectorView::new(snapshots))
    }

    pub fn backend(&self) -> &str {
        self.engine.name()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectorView {
    snapshots: Vec<CollectorSnapshot>,
}

impl CollectorView {
    pub fn new(snapshots: Vec<CollectorSnapshot>) -> Self {
        Self { snapshots }
    }

    pub fn sum_where(&self, predicate: impl Fn(&str) -> bool) -> u64 {
        self.snapshots
            .iter()
            .filter(|s| predicate(&s.name))
            .map(|s| s.external_size)
            .sum()
    }

    pub fn pending_for(&self, category: TaskCategory) -> u64 {
        self.snapshots
            .iter()
            .filter(|s| s.belongs_to(category))
            .map(|s| s.external_size)
            .sum()
    }

    pub fn total_pending(&self) -> u64 {
        self.sum_where(|_| true)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollectorSnapshot> {
        self.snapshots.iter()
    }
}
