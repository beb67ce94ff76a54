use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for the admission controller.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; application glue continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum AdmissionError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Task catalog ────────────────────────────────────────────────────
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),

    // ── Crawl engine ────────────────────────────────────────────────────
    #[error("engine: {0}")]
    Engine(#[from] EngineError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation failed: {0}")]
    Validation(String),
}

// ─── Catalog errors ──────────────────────────────────────────────────────────

/// Malformed static task catalog. Always fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("task catalog is empty")]
    Empty,

    #[error("duplicate task name: {0}")]
    DuplicateName(String),

    #[error("task {name} has a zero period")]
    ZeroPeriod { name: String },

    #[error("task {name} has an invalid run window bound {raw:?}")]
    InvalidWindow { name: String, raw: String },

    #[error("unknown task category {0:?}")]
    UnknownCategory(String),

    #[error("catalog must contain exactly one ASIN task, found {0}")]
    AsinTaskCount(usize),

    #[error("invalid utc offset {0:?} (expected +HH:MM or -HH:MM)")]
    InvalidOffset(String),
}

// ─── Crawl engine errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("crawl engine request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("crawl engine returned {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("crawl engine payload could not be decoded: {0}")]
    Decode(String),

    #[error("crawl engine rejected task {task}: {reason}")]
    Rejected { task: String, reason: String },

    #[error("generator state unavailable: {0}")]
    State(String),
}

pub type Result<T, E = AdmissionError> = std::result::Result<T, E>;
