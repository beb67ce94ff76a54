//! REST client for a crawl engine that exposes its collectors over HTTP.
//!
//! Endpoints (relative to the configured base URL):
//! - `GET  /api/collectors`         → `[CollectorSnapshot]`
//! - `POST /api/tasks`              ← `{ "task": ResidentTask, "force": bool }`
//! - `POST /api/collectors/retire`  ← `{ "names": [..] }` → `{ "retired": n }`

use super::{CollectorSnapshot, CrawlLoop};
use crate::catalog::ResidentTask;
use crate::error::EngineError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct HttpCrawlLoop {
    client: Client,
    collectors_url: String,
    tasks_url: String,
    retire_url: String,
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    task: &'a ResidentTask,
    force: bool,
}

#[derive(Debug, Serialize)]
struct RetireRequest<'a> {
    names: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RetireResponse {
    retired: usize,
}

impl HttpCrawlLoop {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = base_url.trim_end_matches('/');
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            collectors_url: format!("{base_url}/api/collectors"),
            tasks_url: format!("{base_url}/api/tasks"),
            retire_url: format!("{base_url}/api/collectors/retire"),
        })
    }
}

fn transport(url: &str, error: &reqwest::Error) -> EngineError {
    EngineError::Transport {
        url: url.to_string(),
        message: error.to_string(),
    }
}

fn check_status(url: &str, response: Response) -> Result<Response, EngineError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(EngineError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl CrawlLoop for HttpCrawlLoop {
    fn name(&self) -> &str {
        "http"
    }

    async fn open_collectors(&self) -> Result<Vec<CollectorSnapshot>, EngineError> {
        let url = &self.collectors_url;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport(url, &e))?;
        check_status(url, response)?
            .json::<Vec<CollectorSnapshot>>()
            .await
            .map_err(|e| EngineError::Decode(e.to_string()))
    }

    async fn submit(&self, task: &ResidentTask, force: bool) -> Result<(), EngineError> {
        let url = &self.tasks_url;
        let response = self
            .client
            .post(url)
            .json(&SubmitRequest { task, force })
            .send()
            .await
            .map_err(|e| transport(url, &e))?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            return Err(EngineError::Rejected {
                task: task.name.clone(),
                reason: "batch already enqueued".into(),
            });
        }
        check_status(url, response)?;
        Ok(())
    }

    async fn retire(&self, names: &[String]) -> Result<usize, EngineError> {
        if names.is_empty() {
            return Ok(0);
        }

        let url = &self.retire_url;
        let response = self
            .client
            .post(url)
            .json(&RetireRequest { names })
            .send()
            .await
            .map_err(|e| transport(url, &e))?;
        let body = check_status(url, response)?
            .json::<RetireResponse>()
            .await
            .map_err(|e| EngineError::Decode(e.to_string()))?;
        Ok(body.retired)
    }
}
