//! Configuration System
//!
//! Layered configuration: built-in defaults, the global user file, workspace
//! files and `SCRIBE__*` environment variables, in increasing precedence.

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::types::{ContentKind, MinLength, PROCEDURAL_SOURCE_ID};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub use crate::provider::{ProviderConfig, ProviderType};

mod facade;
mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod global_file;
    pub mod workspace_file;
}

pub use facade::ConfigLoader;

/// Upper bound for `run.min_length` overrides, in the kind's own unit.
pub const MAX_MIN_LENGTH: usize = 100_000;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScribeConfig {
    /// Generation providers keyed by provider id
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    #[default]
    Json,
    Sled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub backend: LedgerBackend,

    /// Ledger location, relative to the workspace root unless absolute
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("data/content_ledger.json")
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Json,
            path: default_ledger_path(),
        }
    }
}

impl LedgerConfig {
    pub fn resolved_path(&self, workspace_root: &Path) -> PathBuf {
        resolve(workspace_root, &self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Items generated per run; duplicates skipped before generation do not count
    #[serde(default = "default_max_items")]
    pub max_items_per_run: usize,

    /// Items processed concurrently
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Exercise the cascade without persisting ledger entries
    #[serde(default)]
    pub dry_run: bool,

    /// Where published artifacts are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Per-kind minimum length overrides, in the kind's default unit
    #[serde(default)]
    pub min_length: BTreeMap<String, usize>,
}

fn default_max_items() -> usize {
    10
}

fn default_parallelism() -> usize {
    4
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_items_per_run: default_max_items(),
            parallelism: default_parallelism(),
            dry_run: false,
            output_dir: default_output_dir(),
            min_length: BTreeMap::new(),
        }
    }
}

impl RunConfig {
    /// Minimum length for `kind`, honoring overrides.
    pub fn min_length_for(&self, kind: ContentKind) -> MinLength {
        let default = kind.default_min_length();
        match self.min_length.get(kind.as_str()) {
            Some(value) => MinLength {
                value: *value,
                unit: default.unit,
            },
            None => default,
        }
    }

    pub fn resolved_output_dir(&self, workspace_root: &Path) -> PathBuf {
        resolve(workspace_root, &self.output_dir)
    }
}

fn resolve(workspace_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Provider(String, String),
    Ledger(String),
    Run(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Provider(name, msg) => write!(f, "Provider '{}': {}", name, msg),
            ValidationError::Ledger(msg) => write!(f, "Ledger: {}", msg),
            ValidationError::Run(msg) => write!(f, "Run: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ScribeConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (name, provider) in &self.providers {
            if name == PROCEDURAL_SOURCE_ID {
                errors.push(ValidationError::Provider(
                    name.clone(),
                    "id is reserved for the procedural fallback".to_string(),
                ));
            }
            if let Err(e) = provider.validate() {
                errors.push(ValidationError::Provider(name.clone(), e));
            }
        }

        if self.ledger.path.as_os_str().is_empty() {
            errors.push(ValidationError::Ledger("Ledger path cannot be empty".to_string()));
        }

        if self.run.parallelism == 0 {
            errors.push(ValidationError::Run(
                "parallelism must be at least 1".to_string(),
            ));
        }
        for (kind, value) in &self.run.min_length {
            if kind.parse::<ContentKind>().is_err() {
                errors.push(ValidationError::Run(format!(
                    "Unknown content kind in min_length: {}",
                    kind
                )));
            }
            if *value > MAX_MIN_LENGTH {
                errors.push(ValidationError::Run(format!(
                    "min_length for {} is {}, above the maximum of {}",
                    kind, value, MAX_MIN_LENGTH
                )));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold every problem into one error.
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }
}
