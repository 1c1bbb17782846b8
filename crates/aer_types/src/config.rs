//! Configuration types for datasets and the working directory

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::signal::SignalType;

/// Errors raised while reading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required parameter '{name}' for dataset '{dataset}'")]
    MissingParameter { dataset: String, name: String },

    #[error("unknown dataset key: {0}")]
    UnknownDataset(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("could not read configuration file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level configuration: the shared working directory plus one entry per dataset key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AerConfig {
    /// Root under which every dataset keeps its intermediate cache.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    #[serde(default)]
    pub datasets: BTreeMap<String, DatasetConfig>,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("/mnt/affectsai/aerds/")
}

impl Default for AerConfig {
    fn default() -> Self {
        let mut datasets = BTreeMap::new();
        datasets.insert(
            "ascertain".to_string(),
            DatasetConfig::new("/mnt/affectsai/datasets/ascertain")
                .with_param("raw_data_path", "ASCERTAIN_Raw")
                .with_param("features_data_path", "ASCERTAIN_Features"),
        );
        datasets.insert(
            "dreamer".to_string(),
            DatasetConfig::new("/mnt/affectsai/datasets/dreamer")
                .with_param("dreamer_data_filename", "DREAMER_Data.json"),
        );
        datasets.insert(
            "cuads".to_string(),
            DatasetConfig::new("/mnt/affectsai/datasets/cuads"),
        );
        Self {
            working_dir: default_working_dir(),
            datasets,
        }
    }
}

impl AerConfig {
    /// Loads configuration from a `.yaml`/`.yml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&contents)?,
            _ => Self::from_yaml_str(&contents)?,
        };
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AerConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AerConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the configuration for one dataset key.
    pub fn dataset(&self, key: &str) -> Result<&DatasetConfig, ConfigError> {
        self.datasets
            .get(key)
            .ok_or_else(|| ConfigError::UnknownDataset(key.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, dataset) in &self.datasets {
            dataset.validate(key)?;
        }
        Ok(())
    }
}

/// Options recognized for a single dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Location of the raw dataset.
    pub path: PathBuf,
    /// Requested signal types. Empty means "every signal the reader offers".
    #[serde(default)]
    pub signals: Vec<SignalType>,
    /// Added to every participant id reported by the dataset.
    #[serde(default)]
    pub participant_offset: u32,
    /// Added to every media id reported by the dataset.
    #[serde(default)]
    pub media_offset: u32,
    /// Keep raw signal arrays in memory after the first load of each trial.
    #[serde(default = "default_cache_raw_signals")]
    pub cache_raw_signals: bool,
    /// Dataset-specific parameters such as raw data subfolder names.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

fn default_cache_raw_signals() -> bool {
    true
}

impl DatasetConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            signals: Vec::new(),
            participant_offset: 0,
            media_offset: 0,
            cache_raw_signals: default_cache_raw_signals(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_signals<I, S>(mut self, signals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SignalType>,
    {
        self.signals = signals.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_offsets(mut self, participant_offset: u32, media_offset: u32) -> Self {
        self.participant_offset = participant_offset;
        self.media_offset = media_offset;
        self
    }

    pub fn with_raw_cache(mut self, enabled: bool) -> Self {
        self.cache_raw_signals = enabled;
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Returns a dataset-specific parameter or fails with [`ConfigError::MissingParameter`].
    pub fn require_param(&self, dataset: &str, name: &str) -> Result<&str, ConfigError> {
        self.param(name).ok_or_else(|| ConfigError::MissingParameter {
            dataset: dataset.to_string(),
            name: name.to_string(),
        })
    }

    /// Checks the options that do not depend on a concrete reader.
    pub fn validate(&self, dataset: &str) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingParameter {
                dataset: dataset.to_string(),
                name: "path".to_string(),
            });
        }

        let mut seen = BTreeSet::new();
        for signal in &self.signals {
            if signal.as_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "dataset '{}' lists an empty signal type",
                    dataset
                )));
            }
            if !seen.insert(signal) {
                return Err(ConfigError::Invalid(format!(
                    "dataset '{}' lists signal type '{}' more than once",
                    dataset, signal
                )));
            }
        }
        Ok(())
    }
}
