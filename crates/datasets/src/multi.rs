//! Several datasets presented as one trial collection

use std::collections::BTreeSet;

use aer_pipeline::PreprocessorNode;
use aer_types::{SignalMetadata, SignalType};
use rand::Rng;
use tracing::info;

use crate::dataset::AerDataset;
use crate::error::{DatasetError, DatasetResult};
use crate::splits::split_by_participant;
use crate::trial::TrialRef;

/// A sequence of datasets whose trials are iterated together.
///
/// [`MultiDataset::load_trials`] shifts each member's participant and media ids past those of the
/// members before it, so ids stay unique across the combined collection.
#[derive(Debug, Default)]
pub struct MultiDataset {
    datasets: Vec<AerDataset>,
}

impl MultiDataset {
    pub fn new(datasets: Vec<AerDataset>) -> Self {
        Self { datasets }
    }

    pub fn push(&mut self, dataset: AerDataset) {
        self.datasets.push(dataset);
    }

    pub fn datasets(&self) -> &[AerDataset] {
        &self.datasets
    }

    pub fn datasets_mut(&mut self) -> &mut [AerDataset] {
        &mut self.datasets
    }

    /// Preloads every member. Returns the number of signal types converted.
    pub fn preload(&mut self) -> DatasetResult<usize> {
        let mut converted = 0;
        for dataset in &mut self.datasets {
            converted += dataset.preload()?.len();
        }
        Ok(converted)
    }

    /// Assigns cumulative offsets and loads every member's trials.
    pub fn load_trials(&mut self) -> DatasetResult<usize> {
        let mut participant_offset: u32 = 0;
        let mut media_offset: u32 = 0;

        for dataset in &mut self.datasets {
            dataset.set_offsets(participant_offset, media_offset);
            dataset.load_trials()?;

            let participants = distinct(dataset.trials().map(|t| t.trial().dataset_participant_id()));
            let media = distinct(dataset.trials().map(|t| t.trial().dataset_media_id()));
            info!(
                "'{}': participants {}..={}, media {}..={}",
                dataset.name(),
                participant_offset.saturating_add(1),
                participant_offset.saturating_add(participants),
                media_offset.saturating_add(1),
                media_offset.saturating_add(media)
            );
            participant_offset = participant_offset.saturating_add(participants);
            media_offset = media_offset.saturating_add(media);
        }
        Ok(self.len())
    }

    /// Trials of every member, in member order.
    pub fn trials(&self) -> impl Iterator<Item = TrialRef<'_>> + '_ {
        self.datasets.iter().flat_map(|d| d.trials())
    }

    pub fn len(&self) -> usize {
        self.datasets.iter().map(AerDataset::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn participant_ids(&self) -> BTreeSet<u32> {
        self.trials().map(|t| t.participant_id()).collect()
    }

    pub fn media_ids(&self) -> BTreeSet<u32> {
        self.trials().map(|t| t.media_id()).collect()
    }

    /// Metadata from the first member that provides `signal_type`.
    pub fn get_signal_metadata(&self, signal_type: &SignalType) -> DatasetResult<SignalMetadata> {
        self.datasets
            .iter()
            .find(|d| d.signal_types().contains(signal_type))
            .ok_or_else(|| self.unknown(signal_type))?
            .get_signal_metadata(signal_type)
    }

    /// Installs `chain` on every member that provides `signal_type`.
    pub fn set_preprocessor(
        &mut self,
        signal_type: &SignalType,
        chain: PreprocessorNode,
    ) -> DatasetResult<()> {
        let mut installed = false;
        for dataset in &mut self.datasets {
            if dataset.signal_types().contains(signal_type) {
                dataset.set_preprocessor(signal_type, chain.clone())?;
                installed = true;
            }
        }
        if installed {
            Ok(())
        } else {
            Err(self.unknown(signal_type))
        }
    }

    /// Participant-level splits across all members.
    pub fn trial_splits<R: Rng + ?Sized>(
        &self,
        fractions: &[f64],
        rng: &mut R,
    ) -> DatasetResult<Vec<Vec<TrialRef<'_>>>> {
        split_by_participant(self.trials(), fractions, rng)
    }

    fn unknown(&self, signal_type: &SignalType) -> DatasetError {
        DatasetError::UnknownSignalType {
            dataset: self
                .datasets
                .iter()
                .map(AerDataset::name)
                .collect::<Vec<_>>()
                .join("+"),
            signal_type: signal_type.clone(),
        }
    }
}

fn distinct(ids: impl Iterator<Item = u32>) -> u32 {
    ids.collect::<BTreeSet<_>>().len() as u32
}
