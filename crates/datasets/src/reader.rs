//! Capability interface implemented once per concrete dataset

use aer_types::{GroundTruth, Signal, SignalMetadata, SignalType};
use serde::{Deserialize, Serialize};

use crate::error::DatasetResult;
use crate::store::{Recording, WorkingStore};

/// Metadata for one trial as enumerated by a reader.
///
/// Identifiers are the dataset's own, numbered from 1 without gaps; offsets are applied by the
/// owning [`crate::AerDataset`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub participant_id: u32,
    pub media_id: u32,
    pub ground_truth: GroundTruth,
}

impl TrialRecord {
    pub fn new(participant_id: u32, media_id: u32, ground_truth: GroundTruth) -> Self {
        Self {
            participant_id,
            media_id,
            ground_truth,
        }
    }
}

/// Everything the dataset core needs from a concrete dataset.
///
/// A reader knows the on-disk layout of one raw dataset. The core calls [`convert`] during
/// preload, [`enumerate_trials`] during trial loading and [`load_signal`] when a trial first needs
/// a signal array. Readers are shared behind an `Arc` and must not hold mutable state that changes
/// their answers.
///
/// [`convert`]: DatasetReader::convert
/// [`enumerate_trials`]: DatasetReader::enumerate_trials
/// [`load_signal`]: DatasetReader::load_signal
pub trait DatasetReader: Send + Sync {
    /// Short name of the dataset; also names its working directory.
    fn name(&self) -> &str;

    /// Signal types this dataset can provide.
    fn available_signals(&self) -> Vec<SignalType>;

    /// Dataset-level metadata for a signal type, or `None` if the type is not offered.
    fn signal_metadata(&self, signal_type: &SignalType) -> Option<SignalMetadata>;

    /// Converts the raw source for one signal type into the working store.
    ///
    /// Implementations must stream: memory use may not grow with the total raw dataset size.
    fn convert(&self, signal_type: &SignalType, store: &WorkingStore) -> DatasetResult<()>;

    /// Lists every participant x stimulus trial. Called only after preload.
    fn enumerate_trials(&self, store: &WorkingStore) -> DatasetResult<Vec<TrialRecord>> {
        store.read_trial_index()
    }

    /// Loads one raw `(channels + 1) x samples` array; row 0 holds timestamps.
    fn load_signal(
        &self,
        store: &WorkingStore,
        participant_id: u32,
        media_id: u32,
        signal_type: &SignalType,
    ) -> DatasetResult<Signal> {
        store.read_signal(participant_id, media_id, signal_type)
    }

    /// Loads the pre-stimulus baseline recording, or `None` if the dataset has none for this trial.
    fn load_baseline(
        &self,
        store: &WorkingStore,
        participant_id: u32,
        media_id: u32,
        signal_type: &SignalType,
    ) -> DatasetResult<Option<Signal>> {
        if !store.has_recording(participant_id, media_id, signal_type, Recording::Baseline) {
            return Ok(None);
        }
        store
            .read_recording(participant_id, media_id, signal_type, Recording::Baseline)
            .map(Some)
    }

    /// Human-readable name of a stimulus, when the dataset has one.
    fn media_name(&self, _media_id: u32) -> Option<String> {
        None
    }

    /// Label the stimulus was designed to elicit, when published with the dataset.
    fn expected_response(&self, _media_id: u32) -> Option<GroundTruth> {
        None
    }
}
