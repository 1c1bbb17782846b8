//! Deterministic generated dataset for tests and demos

use std::f64::consts::PI;

use aer_types::{with_timestamps, GroundTruth, Quadrant, Signal, SignalMetadata, SignalType};
use ndarray::{Array1, Array2};
use tracing::{debug, trace};

use crate::error::{DatasetError, DatasetResult};
use crate::reader::{DatasetReader, TrialRecord};
use crate::store::{Recording, WorkingStore};

/// Reader that generates sine-wave recordings instead of parsing files.
///
/// Channel `c` of every signal is a sine at `2 + 4c` Hz whose amplitude depends on the participant.
/// Row 0 holds elapsed milliseconds. Recording lengths differ between trials so fixed-duration
/// preprocessing has something to do. Labels come from self-assessment scores derived from the
/// participant and media ids, so they are stable across runs. With [`with_baseline`] every trial
/// also gets a shorter resting recording.
///
/// [`with_baseline`]: SyntheticReader::with_baseline
#[derive(Debug, Clone)]
pub struct SyntheticReader {
    name: String,
    participants: u32,
    media: u32,
    duration: f64,
    baseline: Option<f64>,
    signals: Vec<SignalMetadata>,
}

impl SyntheticReader {
    pub fn new(name: impl Into<String>, participants: u32, media: u32) -> Self {
        Self {
            name: name.into(),
            participants,
            media,
            duration: 2.0,
            baseline: None,
            signals: Vec::new(),
        }
    }

    /// Adds a signal type recorded at `sample_rate` Hz with `n_channels` data channels.
    pub fn with_signal(mut self, signal_type: &str, sample_rate: f64, n_channels: usize) -> Self {
        self.signals.retain(|m| m.signal_type.as_str() != signal_type);
        self.signals
            .push(SignalMetadata::new(signal_type, sample_rate, n_channels));
        self
    }

    /// Base recording length in seconds.
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = seconds;
        self
    }

    /// Also writes a baseline recording of `seconds` per trial.
    pub fn with_baseline(mut self, seconds: f64) -> Self {
        self.baseline = Some(seconds);
        self
    }

    pub fn participants(&self) -> u32 {
        self.participants
    }

    pub fn media(&self) -> u32 {
        self.media
    }

    /// The trial list this reader enumerates.
    pub fn records(&self) -> Vec<TrialRecord> {
        (1..=self.participants)
            .flat_map(|p| (1..=self.media).map(move |m| (p, m)))
            .map(|(p, m)| TrialRecord::new(p, m, self.ground_truth(p, m)))
            .collect()
    }

    /// Number of samples recorded for one trial.
    pub fn sample_count(&self, participant_id: u32, media_id: u32, sample_rate: f64) -> usize {
        let stretch = 1.0 + f64::from((participant_id * 7 + media_id * 3) % 5) * 0.1;
        (self.duration * stretch * sample_rate).round() as usize
    }

    /// Number of samples in one trial's baseline, if baselines are generated.
    pub fn baseline_sample_count(&self, sample_rate: f64) -> Option<usize> {
        self.baseline
            .map(|seconds| (seconds * sample_rate).round() as usize)
    }

    /// Generates one raw `(channels + 1) x samples` array.
    pub fn generate(&self, participant_id: u32, media_id: u32, meta: &SignalMetadata) -> DatasetResult<Signal> {
        let n = self.sample_count(participant_id, media_id, meta.sample_rate);
        self.generate_samples(participant_id, media_id, meta, n)
    }

    fn generate_samples(
        &self,
        participant_id: u32,
        media_id: u32,
        meta: &SignalMetadata,
        n: usize,
    ) -> DatasetResult<Signal> {
        let amplitude = 1.0 + f64::from(participant_id) * 0.1;
        let phase = f64::from(media_id) * 0.25 * PI;

        let timestamps = Array1::from_shape_fn(n, |i| i as f64 * 1000.0 / meta.sample_rate);
        let channels = Array2::from_shape_fn((meta.n_channels, n), |(c, i)| {
            let freq = 2.0 + c as f64 * 4.0;
            let t = i as f64 / meta.sample_rate;
            amplitude * (2.0 * PI * freq * t + phase).sin()
        });

        with_timestamps(timestamps, &channels)
            .map_err(|e| DatasetError::DataFormat(format!("synthetic signal: {}", e)))
    }

    fn ground_truth(&self, participant_id: u32, media_id: u32) -> GroundTruth {
        let arousal = f64::from((participant_id * 3 + media_id * 5) % 9 + 1);
        let valence = f64::from((participant_id * 5 + media_id * 2) % 9 + 1);
        Quadrant::from_scores(arousal, valence, 5.0).into()
    }

    fn metadata(&self, signal_type: &SignalType) -> Option<&SignalMetadata> {
        self.signals.iter().find(|m| &m.signal_type == signal_type)
    }
}

impl DatasetReader for SyntheticReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn available_signals(&self) -> Vec<SignalType> {
        self.signals.iter().map(|m| m.signal_type.clone()).collect()
    }

    fn signal_metadata(&self, signal_type: &SignalType) -> Option<SignalMetadata> {
        self.metadata(signal_type).cloned()
    }

    fn convert(&self, signal_type: &SignalType, store: &WorkingStore) -> DatasetResult<()> {
        let meta = self.metadata(signal_type).ok_or_else(|| DatasetError::UnknownSignalType {
            dataset: self.name.clone(),
            signal_type: signal_type.clone(),
        })?;

        // one trial in memory at a time
        for record in self.records() {
            let signal = self.generate(record.participant_id, record.media_id, meta)?;
            trace!(
                "Generated {} for participant {} media {}",
                signal_type,
                record.participant_id,
                record.media_id
            );
            store.write_signal(record.participant_id, record.media_id, signal_type, &signal)?;

            if let Some(n) = self.baseline_sample_count(meta.sample_rate) {
                let baseline = self.generate_samples(record.participant_id, record.media_id, meta, n)?;
                store.write_recording(
                    record.participant_id,
                    record.media_id,
                    signal_type,
                    Recording::Baseline,
                    &baseline,
                )?;
            }
        }
        store.write_trial_index(&self.records())?;

        debug!(
            "Converted {} trials of {} for '{}'",
            self.participants * self.media,
            signal_type,
            self.name
        );
        Ok(())
    }

    fn media_name(&self, media_id: u32) -> Option<String> {
        (1..=self.media)
            .contains(&media_id)
            .then(|| format!("stimulus_{:02}", media_id))
    }

    fn expected_response(&self, media_id: u32) -> Option<GroundTruth> {
        (1..=self.media)
            .contains(&media_id)
            .then(|| GroundTruth((media_id % 4) as u8))
    }
}
