//! Elementwise preprocessors: scale, offset, clip and the identity

use std::sync::Arc;

use aer_types::Signal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{PipelineError, PipelineResult};
use crate::preprocessor::SignalPreprocessor;
use crate::registry::{parse_params, PreprocessorFactory, PreprocessorParams};

/// Multiplies every element by a constant factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub factor: f64,
}

impl Scale {
    pub fn new(factor: f64) -> Self {
        Self { factor }
    }
}

impl SignalPreprocessor for Scale {
    fn process_signal(&self, signal: Signal) -> PipelineResult<Signal> {
        Ok(signal * self.factor)
    }

    fn preprocessor_type(&self) -> &'static str {
        "scale"
    }

    fn description(&self) -> &'static str {
        "Multiplies every sample by a constant"
    }
}

/// Adds a constant to every element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub offset: f64,
}

impl Offset {
    pub fn new(offset: f64) -> Self {
        Self { offset }
    }
}

impl SignalPreprocessor for Offset {
    fn process_signal(&self, signal: Signal) -> PipelineResult<Signal> {
        Ok(signal + self.offset)
    }

    fn preprocessor_type(&self) -> &'static str {
        "offset"
    }

    fn description(&self) -> &'static str {
        "Adds a constant to every sample"
    }
}

/// Clamps every element into `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub min: f64,
    pub max: f64,
}

impl Clip {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.min > self.max {
            return Err(PipelineError::invalid_config(format!(
                "clip: min {} is greater than max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

impl SignalPreprocessor for Clip {
    fn process_signal(&self, mut signal: Signal) -> PipelineResult<Signal> {
        signal.mapv_inplace(|v| v.clamp(self.min, self.max));
        Ok(signal)
    }

    fn preprocessor_type(&self) -> &'static str {
        "clip"
    }

    fn description(&self) -> &'static str {
        "Clamps every sample into a range"
    }
}

/// Returns the signal unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Identity;

impl SignalPreprocessor for Identity {
    fn process_signal(&self, signal: Signal) -> PipelineResult<Signal> {
        Ok(signal)
    }

    fn preprocessor_type(&self) -> &'static str {
        "identity"
    }
}

#[derive(Default)]
pub struct ScaleFactory;

impl PreprocessorFactory for ScaleFactory {
    fn create(&self, params: &PreprocessorParams) -> PipelineResult<Arc<dyn SignalPreprocessor>> {
        let scale: Scale = parse_params(self.preprocessor_type(), params)?;
        Ok(Arc::new(scale))
    }

    fn preprocessor_type(&self) -> &'static str {
        "scale"
    }

    fn parameter_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["factor"],
            "properties": { "factor": { "type": "number" } }
        })
    }
}

#[derive(Default)]
pub struct OffsetFactory;

impl PreprocessorFactory for OffsetFactory {
    fn create(&self, params: &PreprocessorParams) -> PipelineResult<Arc<dyn SignalPreprocessor>> {
        let offset: Offset = parse_params(self.preprocessor_type(), params)?;
        Ok(Arc::new(offset))
    }

    fn preprocessor_type(&self) -> &'static str {
        "offset"
    }

    fn parameter_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["offset"],
            "properties": { "offset": { "type": "number" } }
        })
    }
}

#[derive(Default)]
pub struct ClipFactory;

impl PreprocessorFactory for ClipFactory {
    fn create(&self, params: &PreprocessorParams) -> PipelineResult<Arc<dyn SignalPreprocessor>> {
        let clip: Clip = parse_params(self.preprocessor_type(), params)?;
        clip.validate()?;
        Ok(Arc::new(clip))
    }

    fn preprocessor_type(&self) -> &'static str {
        "clip"
    }

    fn parameter_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["min", "max"],
            "properties": {
                "min": { "type": "number" },
                "max": { "type": "number" }
            }
        })
    }
}

#[derive(Default)]
pub struct IdentityFactory;

impl PreprocessorFactory for IdentityFactory {
    fn create(&self, _params: &PreprocessorParams) -> PipelineResult<Arc<dyn SignalPreprocessor>> {
        Ok(Arc::new(Identity))
    }

    fn preprocessor_type(&self) -> &'static str {
        "identity"
    }
}
