use crate::catalog::{TaskCatalog, TaskConfig, parse_utc_offset};
use crate::error::{CatalogError, ConfigError};
use anyhow::{Context, Result};
use chrono::FixedOffset;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;

const CONFIG_DIR: &str = ".crawl-admission";

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Task catalog override; the built-in catalog is used when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<TaskConfig>,
}

// ── Generation ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Global toggle for every trigger (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// ASIN top-up fires when pending ASIN work is in `1..=min_asin_threshold`.
    #[serde(default = "default_min_asin_threshold")]
    pub min_asin_threshold: u64,
}

fn default_true() -> bool {
    true
}

fn default_min_asin_threshold() -> u64 {
    200
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_asin_threshold: default_min_asin_threshold(),
        }
    }
}

// ── Crawl engine ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// In-process engine, useful for dry runs
    #[default]
    Memory,
    /// Remote crawl engine REST API
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub kind: EngineKind,
    /// Base URL of the crawl engine (required for `kind = "http"`)
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Memory,
            base_url: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// ── Scheduler ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// UTC offset that cron triggers and run windows are evaluated in
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
    #[serde(default = "default_watchdog_initial_delay_secs")]
    pub watchdog_initial_delay_secs: u64,
    #[serde(default = "default_watchdog_interval_secs")]
    pub watchdog_interval_secs: u64,
    #[serde(default = "default_retire_initial_delay_secs")]
    pub retire_initial_delay_secs: u64,
    #[serde(default = "default_retire_interval_secs")]
    pub retire_interval_secs: u64,
}

fn default_utc_offset() -> String {
    "+00:00".into()
}

fn default_watchdog_initial_delay_secs() -> u64 {
    6 * 60
}

fn default_watchdog_interval_secs() -> u64 {
    2 * 60
}

fn default_retire_initial_delay_secs() -> u64 {
    3 * 60
}

fn default_retire_interval_secs() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
            watchdog_initial_delay_secs: default_watchdog_initial_delay_secs(),
            watchdog_interval_secs: default_watchdog_interval_secs(),
            retire_initial_delay_secs: default_retire_initial_delay_secs(),
            retire_interval_secs: default_retire_interval_secs(),
        }
    }
}

// ── Reliability ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    /// Initial backoff for trigger restarts.
    #[serde(default = "default_initial_backoff_secs")]
    pub initial_backoff_secs: u64,
    /// Max backoff for trigger restarts.
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
    /// Consecutive failures before a trigger's circuit opens (0 = never).
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
}

fn default_initial_backoff_secs() -> u64 {
    2
}

fn default_max_backoff_secs() -> u64 {
    60
}

fn default_max_restarts() -> u32 {
    10
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            initial_backoff_secs: default_initial_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            max_restarts: default_max_restarts(),
        }
    }
}

// ── Observability ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// "error", "warn", "info", "debug" or "trace"
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ObservabilityConfig {
    pub fn level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }
}

// ── Config impl ──────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());

        Self {
            config_path: home.join(CONFIG_DIR).join("config.toml"),
            generation: GenerationConfig::default(),
            engine: EngineConfig::default(),
            scheduler: SchedulerConfig::default(),
            reliability: ReliabilityConfig::default(),
            observability: ObservabilityConfig::default(),
            tasks: Vec::new(),
        }
    }
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let config_dir = home.join(CONFIG_DIR);

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .context("Failed to create .crawl-admission directory")?;
        }

        Self::load_or_init_at(&config_dir.join("config.toml"))
    }

    /// Loads `path`, or writes a default config there if it does not exist.
    pub fn load_or_init_at(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            // Set computed paths that are skipped during serialization
            config.config_path = path.to_path_buf();
            config
        } else {
            let config = Self {
                config_path: path.to_path_buf(),
                ..Self::default()
            };
            config.save()?;
            config
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var("CRAWL_ADMISSION_GENERATE_DEFAULT_TASKS") {
            match parse_bool(&raw) {
                Some(enabled) => self.generation.enabled = enabled,
                None => tracing::warn!(
                    "Ignoring CRAWL_ADMISSION_GENERATE_DEFAULT_TASKS={raw}: expected true/false"
                ),
            }
        }

        if let Ok(url) = std::env::var("CRAWL_ADMISSION_ENGINE_URL")
            && !url.is_empty()
        {
            self.engine.kind = EngineKind::Http;
            self.engine.base_url = Some(url);
        }

        if let Ok(level) = std::env::var("CRAWL_ADMISSION_LOG_LEVEL")
            && !level.is_empty()
        {
            self.observability.log_level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scheduler;
        if s.watchdog_interval_secs == 0 || s.retire_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "scheduler intervals must be greater than zero".into(),
            ));
        }

        parse_utc_offset(&s.utc_offset)
            .map_err(|e| ConfigError::Validation(format!("scheduler.utc_offset: {e}")))?;

        if self.engine.kind == EngineKind::Http
            && self
                .engine
                .base_url
                .as_deref()
                .is_none_or(|url| url.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "engine.base_url is required when engine.kind = \"http\"".into(),
            ));
        }

        if self.observability.log_level.parse::<Level>().is_err() {
            return Err(ConfigError::Validation(format!(
                "unknown observability.log_level {:?}",
                self.observability.log_level
            )));
        }

        Ok(())
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, CatalogError> {
        parse_utc_offset(&self.scheduler.utc_offset)
    }

    /// Builds the read-only task catalog. Errors here are fatal at startup.
    pub fn build_catalog(&self) -> Result<TaskCatalog, CatalogError> {
        let offset = self.utc_offset()?;
        if self.tasks.is_empty() {
            Ok(TaskCatalog::builtin(offset))
        } else {
            TaskCatalog::from_config(&self.tasks, offset)
        }
    }

    /// Daemon state snapshot lives next to the config file.
    pub fn state_file_path(&self) -> PathBuf {
        self.config_path
            .parent()
            .map_or_else(|| PathBuf::from("."), PathBuf::from)
            .join("daemon_state.json")
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
