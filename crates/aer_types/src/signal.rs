//! Signal types, arrays, metadata and ground-truth labels.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use ndarray::{concatenate, Array1, Array2, Axis, ShapeError};
use serde::{Deserialize, Serialize};

/// A signal array shaped `rows x samples`.
///
/// Raw signals loaded from a dataset are `(channels + 1) x samples`: row 0 holds the per-sample
/// timestamp and rows `1..` hold channel values. Preprocessors may change the row count (for example
/// by dropping the timestamp row).
pub type Signal = Array2<f64>;

/// Index of the timestamp row in a raw signal.
pub const TIMESTAMP_ROW: usize = 0;

/// A category of recorded sensor data, e.g. `ECG` or `EEG`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalType(String);

impl SignalType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SignalType {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for SignalType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for SignalType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Builds a raw signal from a timestamp vector and a `channels x samples` block.
///
/// Fails when the number of timestamps does not match the number of samples.
pub fn with_timestamps(timestamps: Array1<f64>, channels: &Array2<f64>) -> Result<Signal, ShapeError> {
    let ts = timestamps.insert_axis(Axis(0));
    concatenate(Axis(0), &[ts.view(), channels.view()])
}

/// Metadata describing one signal type.
///
/// `sample_rate` and `n_channels` are always present. Trials may fill in `duration`; datasets may
/// attach implementation-specific keys in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMetadata {
    pub signal_type: SignalType,
    /// Samples per second.
    pub sample_rate: f64,
    /// Number of channels, not counting the timestamp row.
    pub n_channels: usize,
    /// Measured duration in seconds, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl SignalMetadata {
    pub fn new(signal_type: impl Into<SignalType>, sample_rate: f64, n_channels: usize) -> Self {
        Self {
            signal_type: signal_type.into(),
            sample_rate,
            n_channels,
            duration: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// The fixed classification label of a trial.
///
/// The taxonomy is dataset-defined; the common case is an arousal/valence [`Quadrant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroundTruth(pub u8);

impl GroundTruth {
    pub fn label(self) -> u8 {
        self.0
    }
}

impl From<Quadrant> for GroundTruth {
    fn from(q: Quadrant) -> Self {
        GroundTruth(q as u8)
    }
}

/// Quadrant of the arousal/valence plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Quadrant {
    HighArousalHighValence = 0,
    HighArousalLowValence = 1,
    LowArousalLowValence = 2,
    LowArousalHighValence = 3,
}

impl Quadrant {
    /// Classifies a self-assessment pair. Scores at or above `midpoint` count as high.
    pub fn from_scores(arousal: f64, valence: f64, midpoint: f64) -> Self {
        match (arousal >= midpoint, valence >= midpoint) {
            (true, true) => Quadrant::HighArousalHighValence,
            (true, false) => Quadrant::HighArousalLowValence,
            (false, false) => Quadrant::LowArousalLowValence,
            (false, true) => Quadrant::LowArousalHighValence,
        }
    }

    pub fn from_label(label: u8) -> Option<Self> {
        match label {
            0 => Some(Quadrant::HighArousalHighValence),
            1 => Some(Quadrant::HighArousalLowValence),
            2 => Some(Quadrant::LowArousalLowValence),
            3 => Some(Quadrant::LowArousalHighValence),
            _ => None,
        }
    }
}
