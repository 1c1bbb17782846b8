//! Error types for the preprocessing pipeline

use thiserror::Error;

/// Pipeline-specific error types
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Circular preprocessor chain: linking '{node}' to '{target}' would create a cycle")]
    CircularDependency { node: String, target: String },

    #[error("Preprocessor node not found: {name}")]
    NodeNotFound { name: String },

    #[error("Invalid preprocessor configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Preprocessor type not registered: {preprocessor_type}")]
    UnknownPreprocessorType { preprocessor_type: String },

    #[error("Invalid input to '{preprocessor}': {message}")]
    InvalidInput {
        preprocessor: String,
        message: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl PipelineError {
    /// True for errors raised while building a chain rather than while running one.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, PipelineError::InvalidInput { .. })
    }

    pub(crate) fn invalid_input(preprocessor: &str, message: impl Into<String>) -> Self {
        PipelineError::InvalidInput {
            preprocessor: preprocessor.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        PipelineError::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
