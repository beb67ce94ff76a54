//! Crawl loop port.
//!
//! The crawl engine owns the open task collectors and the URL queues behind
//! them. The admission controller only sees it through [`CrawlLoop`].

use crate::catalog::{ResidentTask, TaskCategory};
use crate::config::{EngineConfig, EngineKind};
use crate::error::EngineError;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub mod http;
pub mod memory;

pub use http::HttpCrawlLoop;
pub use memory::MemoryCrawlLoop;

/// Point-in-time view of one open collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorSnapshot {
    pub name: String,
    /// Category tag set by the engine at creation time, when it knows one.
    #[serde(default)]
    pub category: Option<TaskCategory>,
    /// Pending items not yet consumed.
    pub external_size: u64,
}

impl CollectorSnapshot {
    pub fn new(name: impl Into<String>, external_size: u64) -> Self {
        Self {
            name: name.into(),
            category: None,
            external_size,
        }
    }

    pub fn tagged(name: impl Into<String>, category: TaskCategory, external_size: u64) -> Self {
        Self {
            name: name.into(),
            category: Some(category),
            external_size,
        }
    }

    /// Whether this collector holds work for `category`.
    ///
    /// The explicit tag wins; untagged collectors are attributed by the
    /// category name appearing in the collector name.
    pub fn belongs_to(&self, category: TaskCategory) -> bool {
        match self.category {
            Some(tag) => tag == category,
            None => self.name.contains(&category.to_string()),
        }
    }
}

#[async_trait]
pub trait CrawlLoop: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Snapshot of the currently open collectors
    async fn open_collectors(&self) -> Result<Vec<CollectorSnapshot>, EngineError>;

    /// Enqueue a task batch. `force` asks the engine to regenerate even if it
    /// already fetched the batch's seeds today.
    async fn submit(&self, task: &ResidentTask, force: bool) -> Result<(), EngineError>;

    /// Close and drop the named collectors, returning how many were removed
    async fn retire(&self, names: &[String]) -> Result<usize, EngineError>;
}

/// Builds the crawl loop backend selected in config.
pub fn create_crawl_loop(config: &EngineConfig) -> anyhow::Result<Arc<dyn CrawlLoop>> {
    match config.kind {
        EngineKind::Memory => Ok(Arc::new(MemoryCrawlLoop::new())),
        EngineKind::Http => {
            let base_url = config
                .base_url
                .as_deref()
                .context("engine.base_url is required for the http engine")?;
            let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
            Ok(Arc::new(HttpCrawlLoop::new(base_url, timeout)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_collectors_fall_back_to_name_matching() {
        let snapshot = CollectorSnapshot::new("ASIN-asin-1", 3);
        assert!(snapshot.belongs_to(TaskCategory::Asin));
        assert!(!snapshot.belongs_to(TaskCategory::Review));
    }

    #[test]
    fn explicit_tag_overrides_name() {
        let snapshot = CollectorSnapshot::tagged("ASIN-lookalike", TaskCategory::Review, 1);
        assert!(snapshot.belongs_to(TaskCategory::Review));
        assert!(!snapshot.belongs_to(TaskCategory::Asin));
    }

    #[test]
    fn snapshot_decodes_engine_payload() {
        let raw = r#"{"name":"REVIEW-review-1","externalSize":7}"#;
        let snapshot: CollectorSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snapshot, CollectorSnapshot::new("REVIEW-review-1", 7));
    }

    #[test]
    fn factory_selects_backend_by_kind() {
        let memory = create_crawl_loop(&EngineConfig::default()).unwrap();
        assert_eq!(memory.name(), "memory");

        let http = create_crawl_loop(&EngineConfig {
            kind: EngineKind::Http,
            base_url: Some("http://127.0.0.1:9000/".into()),
            request_timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(http.name(), "http");

        let missing_url = EngineConfig {
            kind: EngineKind::Http,
            ..EngineConfig::default()
        };
        assert!(create_crawl_loop(&missing_url).is_err());
    }
}
