//! Trials: one participant's session with one stimulus

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use aer_types::{GroundTruth, Signal, SignalMetadata, SignalType};
use once_cell::sync::OnceCell;
use tracing::trace;

use crate::dataset::AerDataset;
use crate::error::DatasetResult;
use crate::reader::TrialRecord;

/// Trial metadata plus the per-signal raw array cache.
///
/// Trials are created by [`AerDataset::load_trials`] and hold no signal data until one is
/// requested. Only raw arrays are cached, never preprocessed output: the dataset's chain is run
/// on every [`TrialRef::load_signal_data`] call, so a chain assigned later applies to cached trials
/// as well.
#[derive(Debug)]
pub struct AerTrial {
    record: TrialRecord,
    raw_cache: HashMap<SignalType, OnceCell<Arc<Signal>>>,
}

impl AerTrial {
    pub(crate) fn new(record: TrialRecord, signal_types: &BTreeSet<SignalType>) -> Self {
        Self {
            record,
            raw_cache: signal_types
                .iter()
                .map(|s| (s.clone(), OnceCell::new()))
                .collect(),
        }
    }

    /// Participant id as numbered by the dataset itself, without offset.
    pub fn dataset_participant_id(&self) -> u32 {
        self.record.participant_id
    }

    /// Media id as numbered by the dataset itself, without offset.
    pub fn dataset_media_id(&self) -> u32 {
        self.record.media_id
    }

    pub fn ground_truth(&self) -> GroundTruth {
        self.record.ground_truth
    }

    pub fn is_cached(&self, signal_type: &SignalType) -> bool {
        self.raw_cache
            .get(signal_type)
            .is_some_and(|cell| cell.get().is_some())
    }

    /// Drops every cached raw array.
    pub fn clear_cache(&mut self) {
        for cell in self.raw_cache.values_mut() {
            cell.take();
        }
    }

    fn cached_raw<F>(&self, signal_type: &SignalType, load: F) -> DatasetResult<Arc<Signal>>
    where
        F: FnOnce() -> DatasetResult<Signal>,
    {
        match self.raw_cache.get(signal_type) {
            Some(cell) => cell.get_or_try_init(|| load().map(Arc::new)).cloned(),
            None => load().map(Arc::new),
        }
    }
}

/// A trial together with the dataset that owns it.
///
/// This is the view handed out by [`AerDataset::trials`]. Holding one borrows the dataset, so
/// the preprocessor registry cannot be reassigned while trials are being read.
#[derive(Debug, Clone, Copy)]
pub struct TrialRef<'a> {
    dataset: &'a AerDataset,
    trial: &'a AerTrial,
}

impl<'a> TrialRef<'a> {
    pub(crate) fn new(dataset: &'a AerDataset, trial: &'a AerTrial) -> Self {
        Self { dataset, trial }
    }

    pub fn dataset(&self) -> &'a AerDataset {
        self.dataset
    }

    pub fn trial(&self) -> &'a AerTrial {
        self.trial
    }

    /// Participant id including the dataset's participant offset, saturating at `u32::MAX`.
    pub fn participant_id(&self) -> u32 {
        self.trial
            .dataset_participant_id()
            .saturating_add(self.dataset.participant_offset())
    }

    /// Media id including the dataset's media offset, saturating at `u32::MAX`.
    pub fn media_id(&self) -> u32 {
        self.trial
            .dataset_media_id()
            .saturating_add(self.dataset.media_offset())
    }

    /// The stimulus name if the dataset has one, otherwise the dataset's own media id.
    pub fn media_name(&self) -> String {
        let media_id = self.trial.dataset_media_id();
        self.dataset
            .reader()
            .media_name(media_id)
            .unwrap_or_else(|| media_id.to_string())
    }

    /// The trial's fixed ground-truth label.
    pub fn load_ground_truth(&self) -> GroundTruth {
        self.trial.ground_truth()
    }

    /// The label the stimulus was designed to elicit, if the dataset publishes one.
    pub fn expected_response(&self) -> Option<GroundTruth> {
        self.dataset
            .reader()
            .expected_response(self.trial.dataset_media_id())
    }

    /// Loads the raw `(channels + 1) x samples` array without preprocessing.
    pub fn load_raw_signal_data(&self, signal_type: &SignalType) -> DatasetResult<Arc<Signal>> {
        self.dataset.ensure_preloaded(signal_type)?;

        let load = || {
            trace!(
                "Loading {} for participant {} media {}",
                signal_type,
                self.participant_id(),
                self.media_id()
            );
            self.dataset.reader().load_signal(
                self.dataset.store(),
                self.trial.dataset_participant_id(),
                self.trial.dataset_media_id(),
                signal_type,
            )
        };

        if self.dataset.config().cache_raw_signals {
            self.trial.cached_raw(signal_type, load)
        } else {
            load().map(Arc::new)
        }
    }

    /// Loads a signal and runs it through the dataset's chain for that signal type.
    pub fn load_signal_data(&self, signal_type: &SignalType) -> DatasetResult<Signal> {
        let raw = self.load_raw_signal_data(signal_type)?;
        match self.dataset.preprocessor(signal_type) {
            Some(chain) => Ok(chain.apply(Signal::clone(&raw))?),
            None => Ok(Signal::clone(&raw)),
        }
    }

    /// Loads the raw baseline recording taken before the stimulus, if the dataset provides one.
    ///
    /// Baselines are not cached and have the same preload requirement as stimulus recordings.
    pub fn load_raw_baseline_data(&self, signal_type: &SignalType) -> DatasetResult<Option<Signal>> {
        self.dataset.ensure_preloaded(signal_type)?;
        trace!(
            "Loading {} baseline for participant {} media {}",
            signal_type,
            self.participant_id(),
            self.media_id()
        );
        self.dataset.reader().load_baseline(
            self.dataset.store(),
            self.trial.dataset_participant_id(),
            self.trial.dataset_media_id(),
            signal_type,
        )
    }

    /// Loads the baseline recording and runs it through the signal type's chain.
    pub fn load_baseline_data(&self, signal_type: &SignalType) -> DatasetResult<Option<Signal>> {
        let Some(raw) = self.load_raw_baseline_data(signal_type)? else {
            return Ok(None);
        };
        match self.dataset.preprocessor(signal_type) {
            Some(chain) => Ok(Some(chain.apply(raw)?)),
            None => Ok(Some(raw)),
        }
    }

    /// Dataset metadata for the signal type plus the measured duration of this trial's recording.
    pub fn get_signal_metadata(&self, signal_type: &SignalType) -> DatasetResult<SignalMetadata> {
        let metadata = self.dataset.get_signal_metadata(signal_type)?;
        let raw = self.load_raw_signal_data(signal_type)?;
        let duration = raw.ncols() as f64 / metadata.sample_rate;
        Ok(metadata.with_duration(duration))
    }
}
