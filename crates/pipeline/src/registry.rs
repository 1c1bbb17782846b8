//! Preprocessor registry for creating preprocessor instances from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{PipelineError, PipelineResult};
use crate::preprocessor::SignalPreprocessor;

/// Preprocessor parameters as a flexible key-value map
pub type PreprocessorParams = HashMap<String, serde_json::Value>;

/// A factory for creating instances of a specific preprocessor type.
pub trait PreprocessorFactory: Send + Sync {
    /// Creates a new preprocessor instance from its parameters.
    fn create(&self, params: &PreprocessorParams) -> PipelineResult<Arc<dyn SignalPreprocessor>>;

    /// Get the preprocessor type this factory creates
    fn preprocessor_type(&self) -> &'static str;

    /// Get parameter schema for this preprocessor type
    fn parameter_schema(&self) -> serde_json::Value {
        serde_json::json!({})
    }
}

/// A registry for preprocessor factories.
#[derive(Default)]
pub struct PreprocessorRegistry {
    factories: HashMap<String, Box<dyn PreprocessorFactory>>,
}

impl PreprocessorRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in preprocessor.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::preprocessors::register_builtin_preprocessors(&mut registry);
        registry
    }

    /// Registers a factory under its preprocessor type, replacing any previous one.
    pub fn register<F>(&mut self, factory: F)
    where
        F: PreprocessorFactory + 'static,
    {
        let preprocessor_type = factory.preprocessor_type().to_string();
        self.factories.insert(preprocessor_type, Box::new(factory));
    }

    /// Creates a preprocessor instance from configuration.
    pub fn create(
        &self,
        preprocessor_type: &str,
        params: &PreprocessorParams,
    ) -> PipelineResult<Arc<dyn SignalPreprocessor>> {
        let factory = self.factories.get(preprocessor_type).ok_or_else(|| {
            PipelineError::UnknownPreprocessorType {
                preprocessor_type: preprocessor_type.to_string(),
            }
        })?;

        factory.create(params)
    }

    /// Get all registered preprocessor types, sorted by name.
    pub fn preprocessor_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }

    /// Get parameter schema for a preprocessor type
    pub fn parameter_schema(&self, preprocessor_type: &str) -> Option<serde_json::Value> {
        self.factories
            .get(preprocessor_type)
            .map(|f| f.parameter_schema())
    }
}

/// Deserializes a parameter map into a typed parameter struct.
pub fn parse_params<T: DeserializeOwned>(
    preprocessor_type: &str,
    params: &PreprocessorParams,
) -> PipelineResult<T> {
    let value = serde_json::Value::Object(
        params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    );
    serde_json::from_value(value).map_err(|e| PipelineError::InvalidConfiguration {
        message: format!("bad parameters for '{}': {}", preprocessor_type, e),
    })
}
