//! Configuration types.
//!
//! Loaded from a YAML file (`config.yml` by default). The `io` section is
//! required; every `reconcile` knob has a default so a minimal config only
//! names its input and output paths.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Full application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Input/output paths.
    pub io: IoConfig,
    /// Reconciliation knobs.
    #[serde(default)]
    pub reconcile: ReconcileOptions,
}

/// Input/output paths for one reconciliation run.
#[derive(Debug, Clone, Deserialize)]
pub struct IoConfig {
    /// Normalized observation batch (`instances.normalized.json`).
    pub observations_path: PathBuf,
    /// Existing dataset document to reconcile into.
    pub dataset_path: PathBuf,
    /// Declarative process definition (YAML).
    pub process_definition_path: PathBuf,
    /// Where to write the result. Defaults to `dataset_path` (in-place).
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

impl IoConfig {
    /// Output path, falling back to overwriting the dataset in place.
    pub fn effective_output_path(&self) -> &Path {
        self.output_path.as_deref().unwrap_or(&self.dataset_path)
    }
}

/// Reconciliation behavior knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
    /// Observations below this normalization confidence are skipped.
    pub min_confidence: f64,
    /// Minimum per-field similarity for the instance matcher.
    pub match_threshold: f64,
    /// Whether unmatched observations may create new instances.
    pub create_new_instances: bool,
    /// Whether matched observations may update existing instances.
    pub update_existing: bool,
    /// Report only; skip persistence.
    pub dry_run: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            match_threshold: 0.8,
            create_new_instances: true,
            update_existing: true,
            dry_run: false,
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_yaml(&raw)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let value: serde_yaml::Value = serde_yaml::from_str(raw)?;
        if value.get("io").is_none() {
            return Err(ConfigError::MissingRequired {
                key: "io".to_string(),
                hint: "Expected observations_path, dataset_path and process_definition_path."
                    .to_string(),
            });
        }
        Ok(serde_yaml::from_value(value)?)
    }
}
