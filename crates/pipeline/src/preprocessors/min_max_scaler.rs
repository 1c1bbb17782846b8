//! Per-channel min/max scaling into a feature range

use std::sync::Arc;

use aer_types::Signal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{PipelineError, PipelineResult};
use crate::preprocessor::SignalPreprocessor;
use crate::registry::{parse_params, PreprocessorFactory, PreprocessorParams};

/// Rescales each row independently so its minimum maps to `feature_range.0` and its maximum to
/// `feature_range.1`. A constant row maps to the lower bound.
///
/// Statistics are taken per channel over time. This differs from column-wise scalers that
/// normalise each sample across channels; transpose the signal first if that is what is wanted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    #[serde(default = "default_feature_range")]
    pub feature_range: (f64, f64),
}

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

impl Default for MinMaxScaler {
    fn default() -> Self {
        Self {
            feature_range: default_feature_range(),
        }
    }
}

impl MinMaxScaler {
    pub fn new(low: f64, high: f64) -> Self {
        Self {
            feature_range: (low, high),
        }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        let (low, high) = self.feature_range;
        if !(low < high) {
            return Err(PipelineError::invalid_config(format!(
                "min_max_scaler: feature range ({}, {}) is empty",
                low, high
            )));
        }
        Ok(())
    }
}

impl SignalPreprocessor for MinMaxScaler {
    fn process_signal(&self, mut signal: Signal) -> PipelineResult<Signal> {
        let (low, high) = self.feature_range;
        for mut row in signal.rows_mut() {
            let min = row.iter().copied().fold(f64::INFINITY, f64::min);
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let span = max - min;
            if span > 0.0 {
                row.mapv_inplace(|v| low + (v - min) / span * (high - low));
            } else {
                row.fill(low);
            }
        }
        Ok(signal)
    }

    fn preprocessor_type(&self) -> &'static str {
        "min_max_scaler"
    }

    fn description(&self) -> &'static str {
        "Scales each channel into a fixed range"
    }
}

#[derive(Default)]
pub struct MinMaxScalerFactory;

impl PreprocessorFactory for MinMaxScalerFactory {
    fn create(&self, params: &PreprocessorParams) -> PipelineResult<Arc<dyn SignalPreprocessor>> {
        let scaler: MinMaxScaler = parse_params(self.preprocessor_type(), params)?;
        scaler.validate()?;
        Ok(Arc::new(scaler))
    }

    fn preprocessor_type(&self) -> &'static str {
        "min_max_scaler"
    }

    fn parameter_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "feature_range": {
                    "type": "array",
                    "items": { "type": "number" },
                    "minItems": 2,
                    "maxItems": 2,
                    "default": [0.0, 1.0]
                }
            }
        })
    }
}
