//! Process configuration.
//!
//! Loaded once at startup and handed to [`Context::new`](crate::Context::new),
//! which applies the backend settings and sizes the worker pool.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [backend]
//! concurrency = 1           # Threads the backend may use inside one call
//! max_alloc = 536870912     # Decoder allocation cap in bytes (512 MiB)
//!
//! [workers]
//! max_workers = 4           # Batch pool size (omit for auto = CPU cores)
//!
//! [output]
//! quality = 90              # Default lossy quality (1-100)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::rust_backend::DEFAULT_MAX_ALLOC;
use crate::imaging::{Quality, RustBackend};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from TOML.
///
/// All fields have sensible defaults. Config files need only specify the
/// values they want to override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Process-wide backend settings.
    pub backend: BackendConfig,
    /// Batch worker pool settings.
    pub workers: WorkersConfig,
    /// Defaults for encoded output.
    pub output: OutputConfig,
}

impl Config {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.concurrency == 0 {
            return Err(ConfigError::Validation(
                "backend.concurrency must be at least 1".into(),
            ));
        }
        if self.backend.max_alloc == 0 {
            return Err(ConfigError::Validation(
                "backend.max_alloc must be non-zero".into(),
            ));
        }
        if self.workers.max_workers == Some(0) {
            return Err(ConfigError::Validation(
                "workers.max_workers must be at least 1".into(),
            ));
        }
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        Ok(())
    }
}

/// Backend settings applied once per process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Threads the backend may use inside a single call.
    pub concurrency: usize,
    /// Upper bound on bytes one decode may allocate.
    pub max_alloc: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            max_alloc: DEFAULT_MAX_ALLOC,
        }
    }
}

impl BackendConfig {
    /// Build the `image`-crate backend with these limits.
    pub fn rust_backend(&self) -> RustBackend {
        RustBackend::with_max_alloc(self.max_alloc)
    }
}

/// Batch worker pool settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkersConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_workers: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &WorkersConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_workers.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Defaults for encoded output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Lossy encoding quality used when a request does not set one.
    pub quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default().value(),
        }
    }
}

impl OutputConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }
}
