//! Fixed-duration reshaping: truncate or left-pad a signal to `duration * sample_rate` samples

use aer_types::{Signal, TIMESTAMP_ROW};
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{PipelineError, PipelineResult};
use crate::preprocessor::SignalPreprocessor;
use crate::registry::{parse_params, PreprocessorFactory, PreprocessorParams};

/// Value written into padded samples of the channel rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Padding {
    /// The same constant for every row.
    Constant(f64),
    /// Each row is padded with its own mean (0.0 for an empty signal).
    RowMean,
}

impl Default for Padding {
    fn default() -> Self {
        Padding::Constant(0.0)
    }
}

/// How row 0 is treated when padding.
///
/// The default pads every row with the same fill, which is correct for signals whose timestamp
/// row was already removed. Use [`FixedDuration::with_timestamp_row`] for raw signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampPolicy {
    /// Row 0 is a timestamp row; padded entries continue the sampling clock backwards from the
    /// first real sample using the mean observed step. With fewer than two samples the step is
    /// `1 / sample_rate` and an empty signal is anchored at 0.
    Extrapolate,
    /// Row 0 is padded like any other row.
    #[default]
    Pad,
    /// The signal has no timestamp row; every row is a channel.
    Absent,
}

/// Reshapes a signal to a fixed number of samples.
///
/// With a target of `T = duration * sample_rate` samples: longer signals keep only their most
/// recent `T` samples (the oldest are dropped from the front); shorter signals are left-padded so
/// the input data occupies the trailing samples. By default every row is padded with the same
/// fill; a timestamp row is only treated specially when [`TimestampPolicy::Extrapolate`] is
/// selected. The policy favours recent samples for all signal types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedDuration {
    /// Target length in seconds.
    pub duration: f64,
    /// Sample rate in Hz used to convert the duration into samples.
    pub sample_rate: f64,
    #[serde(default)]
    pub padding: Padding,
    #[serde(default)]
    pub timestamps: TimestampPolicy,
}

impl FixedDuration {
    pub fn new(duration: f64, sample_rate: f64) -> Self {
        Self {
            duration,
            sample_rate,
            padding: Padding::default(),
            timestamps: TimestampPolicy::default(),
        }
    }

    /// Reshapes raw `(channels + 1) x samples` arrays, extrapolating the timestamp row.
    pub fn with_timestamp_row(duration: f64, sample_rate: f64) -> Self {
        Self::new(duration, sample_rate).with_timestamps(TimestampPolicy::Extrapolate)
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_timestamps(mut self, timestamps: TimestampPolicy) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Number of samples every output row will have.
    pub fn target_samples(&self) -> usize {
        (self.duration * self.sample_rate).round() as usize
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(PipelineError::invalid_config(format!(
                "fixed_duration: duration must be positive, got {}",
                self.duration
            )));
        }
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(PipelineError::invalid_config(format!(
                "fixed_duration: sample_rate must be positive, got {}",
                self.sample_rate
            )));
        }
        Ok(())
    }

    fn row_fill(&self, signal: &Signal, row: usize) -> f64 {
        match self.padding {
            Padding::Constant(value) => value,
            Padding::RowMean => signal.row(row).mean().unwrap_or(0.0),
        }
    }

    fn extrapolated_timestamps(&self, signal: &Signal, pad: usize) -> Vec<f64> {
        let ts = signal.row(TIMESTAMP_ROW);
        let samples = ts.len();
        let step = if samples >= 2 {
            (ts[samples - 1] - ts[0]) / (samples - 1) as f64
        } else {
            1.0 / self.sample_rate
        };
        let anchor = if samples >= 1 { ts[0] } else { 0.0 };
        (0..pad)
            .map(|i| anchor - (pad - i) as f64 * step)
            .collect()
    }
}

impl SignalPreprocessor for FixedDuration {
    fn process_signal(&self, signal: Signal) -> PipelineResult<Signal> {
        let (rows, samples) = signal.dim();
        let target = self.target_samples();

        if samples >= target {
            return Ok(signal.slice(s![.., samples - target..]).to_owned());
        }

        let pad = target - samples;
        let mut out = Array2::<f64>::zeros((rows, target));
        out.slice_mut(s![.., pad..]).assign(&signal);

        for row in 0..rows {
            if row == TIMESTAMP_ROW && self.timestamps == TimestampPolicy::Extrapolate {
                let stamps = self.extrapolated_timestamps(&signal, pad);
                for (i, t) in stamps.into_iter().enumerate() {
                    out[[row, i]] = t;
                }
            } else {
                let fill = self.row_fill(&signal, row);
                out.slice_mut(s![row, ..pad]).fill(fill);
            }
        }

        Ok(out)
    }

    fn preprocessor_type(&self) -> &'static str {
        "fixed_duration"
    }

    fn description(&self) -> &'static str {
        "Truncates or left-pads a signal to a fixed duration, keeping the most recent samples"
    }
}

/// Factory for creating fixed_duration preprocessors
#[derive(Default)]
pub struct FixedDurationFactory;

impl PreprocessorFactory for FixedDurationFactory {
    fn create(&self, params: &PreprocessorParams) -> PipelineResult<std::sync::Arc<dyn SignalPreprocessor>> {
        let preprocessor: FixedDuration = parse_params(self.preprocessor_type(), params)?;
        preprocessor.validate()?;
        Ok(std::sync::Arc::new(preprocessor))
    }

    fn preprocessor_type(&self) -> &'static str {
        "fixed_duration"
    }

    fn parameter_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["duration", "sample_rate"],
            "properties": {
                "duration": { "type": "number", "description": "Target duration in seconds" },
                "sample_rate": { "type": "number", "description": "Sample rate in Hz" },
                "padding": {
                    "description": "Either \"row_mean\" or {\"constant\": <value>}",
                    "default": { "constant": 0.0 }
                },
                "timestamps": {
                    "type": "string",
                    "enum": ["extrapolate", "pad", "absent"],
                    "default": "pad"
                }
            }
        })
    }
}
