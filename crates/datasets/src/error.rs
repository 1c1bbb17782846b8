//! Error types for the dataset layer

use aer_pipeline::PipelineError;
use aer_types::{ConfigError, SignalType};
use thiserror::Error;

/// Dataset-specific error types
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown signal type '{signal_type}' for dataset '{dataset}'")]
    UnknownSignalType {
        dataset: String,
        signal_type: SignalType,
    },

    #[error("Signal type '{signal_type}' has not been preloaded for dataset '{dataset}'")]
    PreloadState {
        dataset: String,
        signal_type: SignalType,
    },

    #[error("Malformed dataset content: {0}")]
    DataFormat(String),

    #[error("Preprocessing error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DatasetError {
    /// True for errors that point at a configuration mistake rather than at data or I/O.
    pub fn is_configuration(&self) -> bool {
        match self {
            DatasetError::Configuration(_) | DatasetError::Config(_) => true,
            DatasetError::Pipeline(e) => e.is_configuration(),
            _ => false,
        }
    }
}

/// Result type for dataset operations
pub type DatasetResult<T> = Result<T, DatasetError>;
