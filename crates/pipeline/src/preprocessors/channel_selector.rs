//! Row selection, mostly used to strip the timestamp row or narrow high-channel signals

use std::sync::Arc;

use aer_types::{Signal, TIMESTAMP_ROW};
use ndarray::Axis;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{PipelineError, PipelineResult};
use crate::preprocessor::SignalPreprocessor;
use crate::registry::{parse_params, PreprocessorFactory, PreprocessorParams};

/// Keeps only the listed rows, in the listed order.
///
/// Without an explicit list every row except the timestamp row is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSelector {
    #[serde(default)]
    pub retain: Option<Vec<usize>>,
}

impl ChannelSelector {
    pub fn new(retain: Vec<usize>) -> Self {
        Self {
            retain: Some(retain),
        }
    }

    /// Drops the timestamp row and keeps every channel.
    pub fn without_timestamps() -> Self {
        Self { retain: None }
    }
}

impl SignalPreprocessor for ChannelSelector {
    fn process_signal(&self, signal: Signal) -> PipelineResult<Signal> {
        let rows = signal.nrows();
        let indices: Vec<usize> = match &self.retain {
            Some(retain) => retain.clone(),
            None => (0..rows).filter(|&r| r != TIMESTAMP_ROW).collect(),
        };

        if let Some(&bad) = indices.iter().find(|&&r| r >= rows) {
            return Err(PipelineError::invalid_input(
                self.preprocessor_type(),
                format!("row {} requested but signal has {} rows", bad, rows),
            ));
        }

        Ok(signal.select(Axis(0), &indices))
    }

    fn preprocessor_type(&self) -> &'static str {
        "channel_selector"
    }

    fn description(&self) -> &'static str {
        "Keeps a subset of rows; by default removes the timestamp row"
    }
}

#[derive(Default)]
pub struct ChannelSelectorFactory;

impl PreprocessorFactory for ChannelSelectorFactory {
    fn create(&self, params: &PreprocessorParams) -> PipelineResult<Arc<dyn SignalPreprocessor>> {
        let selector: ChannelSelector = parse_params(self.preprocessor_type(), params)?;
        Ok(Arc::new(selector))
    }

    fn preprocessor_type(&self) -> &'static str {
        "channel_selector"
    }

    fn parameter_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "retain": {
                    "type": "array",
                    "items": { "type": "integer", "minimum": 0 },
                    "description": "Rows to keep; omit to drop only the timestamp row"
                }
            }
        })
    }
}
