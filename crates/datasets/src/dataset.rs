//! The dataset: signal-type universe, preload/load lifecycle and preprocessor registry

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use aer_pipeline::{PreprocessingConfig, PreprocessorNode, PreprocessorRegistry};
use aer_types::{AerConfig, DatasetConfig, SignalMetadata, SignalType};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::error::{DatasetError, DatasetResult};
use crate::preload::PreloadMarker;
use crate::reader::{DatasetReader, TrialRecord};
use crate::splits::split_by_participant;
use crate::store::WorkingStore;
use crate::trial::{AerTrial, TrialRef};

/// Lifecycle of a dataset instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DatasetState {
    /// Constructed; at least one requested signal type is not preloaded.
    Unconfigured,
    /// Every requested signal type has been preloaded.
    Preloaded,
    /// Trial metadata has been loaded.
    Loaded,
}

/// A dataset backed by a [`DatasetReader`].
///
/// Typical use:
///
/// ```no_run
/// # use std::sync::Arc;
/// # use aer_datasets::{AerDataset, SyntheticReader};
/// # use aer_pipeline::{FixedDuration, PreprocessorNode};
/// # use aer_types::{DatasetConfig, SignalType};
/// # fn main() -> Result<(), aer_datasets::DatasetError> {
/// let reader = Arc::new(SyntheticReader::new("Synthetic", 4, 3).with_signal("ECG", 256.0, 2));
/// let config = DatasetConfig::new("/data/synthetic").with_signals(["ECG"]);
/// let mut dataset = AerDataset::new(reader, "/tmp/aer", config)?;
///
/// let ecg = SignalType::from("ECG");
/// dataset.set_preprocessor(&ecg, PreprocessorNode::new(FixedDuration::new(2.0, 256.0)))?;
/// dataset.preload()?;
/// dataset.load_trials()?;
///
/// for trial in dataset.trials() {
///     let signal = trial.load_signal_data(&ecg)?;
///     println!("{} {:?}", trial.participant_id(), signal.dim());
/// }
/// # Ok(())
/// # }
/// ```
///
/// The requested signal types are fixed at construction. Trials borrow the dataset, so the
/// preprocessor registry can only change between iterations, never during one.
pub struct AerDataset {
    reader: Arc<dyn DatasetReader>,
    config: DatasetConfig,
    signal_types: BTreeSet<SignalType>,
    metadata: BTreeMap<SignalType, SignalMetadata>,
    store: WorkingStore,
    preprocessors: HashMap<SignalType, PreprocessorNode>,
    preloaded: BTreeSet<SignalType>,
    participant_offset: u32,
    media_offset: u32,
    trials: Vec<AerTrial>,
    state: DatasetState,
}

impl AerDataset {
    /// Creates a dataset whose intermediate cache lives in `<working_dir>/<reader name>/`.
    ///
    /// An empty `config.signals` requests every signal type the reader offers.
    pub fn new(
        reader: Arc<dyn DatasetReader>,
        working_dir: impl Into<PathBuf>,
        config: DatasetConfig,
    ) -> DatasetResult<Self> {
        let name = reader.name().to_string();
        config.validate(&name)?;

        let available: BTreeSet<SignalType> = reader.available_signals().into_iter().collect();
        let signal_types: BTreeSet<SignalType> = if config.signals.is_empty() {
            available.clone()
        } else {
            config.signals.iter().cloned().collect()
        };
        if signal_types.is_empty() {
            return Err(DatasetError::Configuration(format!(
                "dataset '{}' has no signal types to load",
                name
            )));
        }

        let mut metadata = BTreeMap::new();
        for signal_type in &signal_types {
            if !available.contains(signal_type) {
                return Err(DatasetError::UnknownSignalType {
                    dataset: name,
                    signal_type: signal_type.clone(),
                });
            }
            let meta = reader.signal_metadata(signal_type).ok_or_else(|| {
                DatasetError::Configuration(format!(
                    "reader '{}' offers {} but has no metadata for it",
                    name, signal_type
                ))
            })?;
            metadata.insert(signal_type.clone(), meta);
        }

        let store = WorkingStore::open(working_dir.into(), &name)?;
        let marker = PreloadMarker::load(&store)?;
        let preloaded: BTreeSet<SignalType> = marker
            .signals()
            .intersection(&signal_types)
            .cloned()
            .collect();
        let state = if preloaded.len() == signal_types.len() {
            DatasetState::Preloaded
        } else {
            DatasetState::Unconfigured
        };

        info!(
            "Opened dataset '{}' at {} with signals {:?} ({:?})",
            name,
            store.root().display(),
            signal_types,
            state
        );

        Ok(Self {
            reader,
            participant_offset: config.participant_offset,
            media_offset: config.media_offset,
            config,
            signal_types,
            metadata,
            store,
            preprocessors: HashMap::new(),
            preloaded,
            trials: Vec::new(),
            state,
        })
    }

    /// Creates a dataset from the entry `key` of a loaded configuration.
    pub fn from_config(
        reader: Arc<dyn DatasetReader>,
        config: &AerConfig,
        key: &str,
    ) -> DatasetResult<Self> {
        let dataset_config = config.dataset(key)?.clone();
        Self::new(reader, config.working_dir.clone(), dataset_config)
    }

    pub fn name(&self) -> &str {
        self.reader.name()
    }

    pub fn reader(&self) -> &dyn DatasetReader {
        self.reader.as_ref()
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn store(&self) -> &WorkingStore {
        &self.store
    }

    pub fn state(&self) -> DatasetState {
        self.state
    }

    /// The signal types requested at construction.
    pub fn signal_types(&self) -> &BTreeSet<SignalType> {
        &self.signal_types
    }

    pub fn is_preloaded(&self, signal_type: &SignalType) -> bool {
        self.preloaded.contains(signal_type)
    }

    /// Converts every requested signal type that the preload marker does not list yet.
    ///
    /// Returns the signal types converted by this call; an empty list means everything was
    /// already preloaded. Each type is recorded in the marker as soon as its conversion
    /// finishes.
    pub fn preload(&mut self) -> DatasetResult<Vec<SignalType>> {
        let mut marker = PreloadMarker::load(&self.store)?;
        let missing = marker.missing(&self.signal_types);

        if missing.is_empty() {
            info!("Dataset '{}' already preloaded, skipping", self.name());
        }

        for signal_type in &missing {
            info!("Preloading {} for dataset '{}'", signal_type, self.name());
            self.reader.convert(signal_type, &self.store)?;
            marker.mark(signal_type.clone());
            marker.save(&self.store)?;
            self.preloaded.insert(signal_type.clone());
            debug!("Finished preloading {}", signal_type);
        }

        self.preloaded.extend(
            marker
                .signals()
                .intersection(&self.signal_types)
                .cloned(),
        );
        if self.state == DatasetState::Unconfigured {
            self.state = DatasetState::Preloaded;
        }
        Ok(missing)
    }

    /// Populates the trial list with metadata only.
    ///
    /// Fails with [`DatasetError::PreloadState`] until every requested signal type is preloaded.
    /// Calling it again after a successful load leaves the trial list unchanged.
    pub fn load_trials(&mut self) -> DatasetResult<usize> {
        if self.state == DatasetState::Loaded {
            debug!("Trials for '{}' already loaded", self.name());
            return Ok(self.trials.len());
        }

        if let Some(missing) = self
            .signal_types
            .iter()
            .find(|s| !self.preloaded.contains(*s))
        {
            return Err(DatasetError::PreloadState {
                dataset: self.name().to_string(),
                signal_type: missing.clone(),
            });
        }

        let mut records = self.reader.enumerate_trials(&self.store)?;
        validate_trial_records(self.name(), &records)?;
        records.sort_by_key(|r| (r.participant_id, r.media_id));

        self.trials = records
            .into_iter()
            .map(|r| AerTrial::new(r, &self.signal_types))
            .collect();
        self.state = DatasetState::Loaded;

        info!("Loaded {} trials for dataset '{}'", self.trials.len(), self.name());
        Ok(self.trials.len())
    }

    /// Trials in participant, then media order.
    pub fn trials(&self) -> impl ExactSizeIterator<Item = TrialRef<'_>> + '_ {
        self.trials.iter().map(move |t| TrialRef::new(self, t))
    }

    pub fn trial(&self, index: usize) -> Option<TrialRef<'_>> {
        self.trials.get(index).map(|t| TrialRef::new(self, t))
    }

    /// Finds a trial by offset participant and media ids.
    pub fn find_trial(&self, participant_id: u32, media_id: u32) -> Option<TrialRef<'_>> {
        self.trials()
            .find(|t| t.participant_id() == participant_id && t.media_id() == media_id)
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Offset participant ids of all loaded trials.
    pub fn participant_ids(&self) -> BTreeSet<u32> {
        self.trials().map(|t| t.participant_id()).collect()
    }

    /// Offset media ids of all loaded trials.
    pub fn media_ids(&self) -> BTreeSet<u32> {
        self.trials().map(|t| t.media_id()).collect()
    }

    /// Groups trials by participant into splits sized by `fractions`.
    ///
    /// See [`split_by_participant`].
    pub fn trial_splits<R: Rng + ?Sized>(
        &self,
        fractions: &[f64],
        rng: &mut R,
    ) -> DatasetResult<Vec<Vec<TrialRef<'_>>>> {
        split_by_participant(self.trials(), fractions, rng)
    }

    pub fn participant_offset(&self) -> u32 {
        self.participant_offset
    }

    pub fn media_offset(&self) -> u32 {
        self.media_offset
    }

    /// Shifts reported ids so trials from several datasets do not collide.
    pub fn set_offsets(&mut self, participant_offset: u32, media_offset: u32) {
        self.participant_offset = participant_offset;
        self.media_offset = media_offset;
    }

    /// Dataset-level metadata for a requested signal type. Available right after construction.
    pub fn get_signal_metadata(&self, signal_type: &SignalType) -> DatasetResult<SignalMetadata> {
        self.check_signal_type(signal_type)?;
        self.metadata
            .get(signal_type)
            .cloned()
            .ok_or_else(|| self.unknown(signal_type))
    }

    /// Installs the chain run on every future `load_signal_data` for `signal_type`.
    ///
    /// Returns the chain it replaced, if any.
    pub fn set_preprocessor(
        &mut self,
        signal_type: &SignalType,
        chain: PreprocessorNode,
    ) -> DatasetResult<Option<PreprocessorNode>> {
        self.check_signal_type(signal_type)?;
        info!("{} preprocessing for '{}': {:?}", signal_type, self.name(), chain.resolve());
        Ok(self.preprocessors.insert(signal_type.clone(), chain))
    }

    /// Restores the identity transformation for `signal_type`.
    pub fn clear_preprocessor(
        &mut self,
        signal_type: &SignalType,
    ) -> DatasetResult<Option<PreprocessorNode>> {
        self.check_signal_type(signal_type)?;
        Ok(self.preprocessors.remove(signal_type))
    }

    /// The installed chain, or `None` for the identity transformation.
    pub fn preprocessor(&self, signal_type: &SignalType) -> Option<&PreprocessorNode> {
        self.preprocessors.get(signal_type)
    }

    /// Builds and installs every chain in `config`.
    ///
    /// Nothing is installed unless all chains build and name requested signal types.
    pub fn configure_preprocessing(
        &mut self,
        config: &PreprocessingConfig,
        registry: &PreprocessorRegistry,
    ) -> DatasetResult<()> {
        for signal_type in config.chains.keys() {
            self.check_signal_type(signal_type)?;
        }
        let chains = config.build_all(registry)?;
        for (signal_type, chain) in chains {
            self.set_preprocessor(&signal_type, chain)?;
        }
        Ok(())
    }

    /// Drops the raw arrays cached by every trial.
    pub fn clear_signal_caches(&mut self) {
        for trial in &mut self.trials {
            trial.clear_cache();
        }
    }

    pub(crate) fn check_signal_type(&self, signal_type: &SignalType) -> DatasetResult<()> {
        if self.signal_types.contains(signal_type) {
            Ok(())
        } else {
            Err(self.unknown(signal_type))
        }
    }

    pub(crate) fn ensure_preloaded(&self, signal_type: &SignalType) -> DatasetResult<()> {
        self.check_signal_type(signal_type)?;
        if self.preloaded.contains(signal_type) {
            Ok(())
        } else {
            Err(DatasetError::PreloadState {
                dataset: self.name().to_string(),
                signal_type: signal_type.clone(),
            })
        }
    }

    fn unknown(&self, signal_type: &SignalType) -> DatasetError {
        DatasetError::UnknownSignalType {
            dataset: self.name().to_string(),
            signal_type: signal_type.clone(),
        }
    }
}

impl fmt::Debug for AerDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AerDataset")
            .field("name", &self.name())
            .field("signal_types", &self.signal_types)
            .field("state", &self.state)
            .field("trials", &self.trials.len())
            .finish_non_exhaustive()
    }
}

/// Checks that ids are unique per trial and number participants and media 1..N without gaps.
fn validate_trial_records(dataset: &str, records: &[TrialRecord]) -> DatasetResult<()> {
    let mut seen = HashSet::new();
    let mut participants = BTreeSet::new();
    let mut media = BTreeSet::new();

    for record in records {
        if !seen.insert((record.participant_id, record.media_id)) {
            return Err(DatasetError::DataFormat(format!(
                "dataset '{}' lists participant {} media {} twice",
                dataset, record.participant_id, record.media_id
            )));
        }
        participants.insert(record.participant_id);
        media.insert(record.media_id);
    }

    check_contiguous(dataset, "participant", &participants)?;
    check_contiguous(dataset, "media", &media)?;

    if records.is_empty() {
        warn!("Dataset '{}' has no trials", dataset);
    }
    Ok(())
}

fn check_contiguous(dataset: &str, kind: &str, ids: &BTreeSet<u32>) -> DatasetResult<()> {
    let expected = 1..=ids.len() as u32;
    if !ids.iter().copied().eq(expected) {
        return Err(DatasetError::DataFormat(format!(
            "dataset '{}' {} ids are not numbered 1..{}: {:?}",
            dataset,
            kind,
            ids.len(),
            ids
        )));
    }
    Ok(())
}
