//! Lifecycle tests for a single dataset: preload, trial loading and lazy signal access.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use aer_datasets::{AerDataset, DatasetError, DatasetState, PreloadMarker, WorkingStore};
use aer_pipeline::{
    ChannelSelector, FixedDuration, PipelineError, PreprocessingConfig, PreprocessorNode,
    PreprocessorRegistry, Scale,
};
use aer_types::{DatasetConfig, GroundTruth, SignalType};
use common::{init_tracing, synthetic, CountingReader};
use tempfile::TempDir;

fn ecg() -> SignalType {
    SignalType::from("ECG")
}

fn eeg() -> SignalType {
    SignalType::from("EEG")
}

fn open(
    reader: &Arc<CountingReader>,
    dir: &TempDir,
    config: DatasetConfig,
) -> AerDataset {
    AerDataset::new(reader.clone(), dir.path(), config).unwrap()
}

fn loaded(reader: &Arc<CountingReader>, dir: &TempDir, config: DatasetConfig) -> AerDataset {
    let mut dataset = open(reader, dir, config);
    dataset.preload().unwrap();
    dataset.load_trials().unwrap();
    dataset
}

#[test]
fn metadata_is_available_before_any_loading() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let reader = CountingReader::new(synthetic("Synthetic"));
    let dataset = open(&reader, &dir, DatasetConfig::new("/raw"));

    let meta = dataset.get_signal_metadata(&eeg()).unwrap();
    assert_eq!(meta.sample_rate, 128.0);
    assert_eq!(meta.n_channels, 4);
    assert_eq!(dataset.state(), DatasetState::Unconfigured);
    assert_eq!(reader.total_converts(), 0);
    assert!(dataset.is_empty());
}

#[test]
fn empty_signal_list_requests_every_available_type() {
    let dir = tempfile::tempdir().unwrap();
    let reader = CountingReader::new(synthetic("Synthetic"));
    let dataset = open(&reader, &dir, DatasetConfig::new("/raw"));
    let expected: BTreeSet<SignalType> = [ecg(), eeg()].into_iter().collect();
    assert_eq!(dataset.signal_types(), &expected);
}

#[test]
fn unknown_signal_types_are_rejected_everywhere() {
    let dir = tempfile::tempdir().unwrap();
    let reader = CountingReader::new(synthetic("Synthetic"));

    let err = AerDataset::new(
        reader.clone(),
        dir.path(),
        DatasetConfig::new("/raw").with_signals(["ECG", "GSR"]),
    )
    .unwrap_err();
    assert!(matches!(err, DatasetError::UnknownSignalType { .. }));

    let mut dataset = loaded(&reader, &dir, DatasetConfig::new("/raw").with_signals(["ECG"]));
    let gsr = SignalType::from("GSR");
    let is_unknown = |e: DatasetError| matches!(e, DatasetError::UnknownSignalType { .. });

    assert!(is_unknown(dataset.get_signal_metadata(&gsr).unwrap_err()));
    // EEG exists in the reader but was not requested
    assert!(is_unknown(dataset.get_signal_metadata(&eeg()).unwrap_err()));

    let trial = dataset.trial(0).unwrap();
    assert!(is_unknown(trial.load_signal_data(&gsr).unwrap_err()));
    assert!(is_unknown(trial.load_raw_signal_data(&eeg()).unwrap_err()));
    assert!(is_unknown(trial.get_signal_metadata(&gsr).unwrap_err()));

    let chain = PreprocessorNode::new(Scale::new(2.0));
    assert!(is_unknown(dataset.set_preprocessor(&gsr, chain).unwrap_err()));
}

#[test]
fn preload_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let reader = CountingReader::new(synthetic("Synthetic"));

    let mut dataset = open(&reader, &dir, DatasetConfig::new("/raw"));
    let converted = dataset.preload().unwrap();
    assert_eq!(converted, vec![ecg(), eeg()]);
    assert_eq!(dataset.state(), DatasetState::Preloaded);

    assert!(dataset.preload().unwrap().is_empty());
    assert_eq!(reader.converts("ECG"), 1);
    assert_eq!(reader.converts("EEG"), 1);

    // a fresh instance over the same working directory sees the marker
    let mut reopened = open(&reader, &dir, DatasetConfig::new("/raw"));
    assert_eq!(reopened.state(), DatasetState::Preloaded);
    assert!(reopened.preload().unwrap().is_empty());
    assert_eq!(reader.total_converts(), 2);
}

#[test]
fn preload_converts_only_newly_requested_types() {
    let dir = tempfile::tempdir().unwrap();
    let reader = CountingReader::new(synthetic("Synthetic"));

    let mut ecg_only = open(&reader, &dir, DatasetConfig::new("/raw").with_signals(["ECG"]));
    ecg_only.preload().unwrap();
    assert_eq!(reader.converts("ECG"), 1);
    assert_eq!(reader.converts("EEG"), 0);

    let mut both = open(
        &reader,
        &dir,
        DatasetConfig::new("/raw").with_signals(["ECG", "EEG"]),
    );
    assert_eq!(both.state(), DatasetState::Unconfigured);
    assert!(both.is_preloaded(&ecg()));
    assert!(!both.is_preloaded(&eeg()));

    assert_eq!(both.preload().unwrap(), vec![eeg()]);
    assert_eq!(reader.converts("ECG"), 1);
    assert_eq!(reader.converts("EEG"), 1);

    let store = WorkingStore::open(dir.path(), "Synthetic").unwrap();
    let marker = PreloadMarker::load(&store).unwrap();
    assert!(marker.contains(&ecg()) && marker.contains(&eeg()));
    assert!(store.has_signal(3, 4, &ecg()));
    assert!(store.has_signal(3, 4, &eeg()));
}

#[test]
fn load_before_preload_is_a_state_error() {
    let dir = tempfile::tempdir().unwrap();
    let reader = CountingReader::new(synthetic("Synthetic"));
    let mut dataset = open(&reader, &dir, DatasetConfig::new("/raw"));

    let err = dataset.load_trials().unwrap_err();
    assert!(matches!(err, DatasetError::PreloadState { .. }));
    assert!(!err.is_configuration());
    assert!(dataset.is_empty());
}

#[test]
fn trials_have_contiguous_ids_and_stable_labels() {
    let dir = tempfile::tempdir().unwrap();
    let reader = CountingReader::new(synthetic("Synthetic"));
    let mut dataset = loaded(&reader, &dir, DatasetConfig::new("/raw"));

    assert_eq!(dataset.len(), 12);
    assert_eq!(dataset.participant_ids(), BTreeSet::from([1, 2, 3]));
    assert_eq!(dataset.media_ids(), BTreeSet::from([1, 2, 3, 4]));
    assert_eq!(dataset.state(), DatasetState::Loaded);

    let labels = |d: &AerDataset| -> Vec<(u32, u32, GroundTruth)> {
        d.trials()
            .map(|t| (t.participant_id(), t.media_id(), t.load_ground_truth()))
            .collect()
    };
    let first = labels(&dataset);
    assert!(first.windows(2).all(|w| (w[0].0, w[0].1) < (w[1].0, w[1].1)));

    // reloading neither duplicates trials nor changes labels
    assert_eq!(dataset.load_trials().unwrap(), 12);
    assert_eq!(labels(&dataset), first);

    let reopened = loaded(&reader, &dir, DatasetConfig::new("/raw"));
    assert_eq!(labels(&reopened), first);
    assert_eq!(reader.loads(), 0);
}

#[test]
fn trials_expose_media_names_and_expected_responses() {
    let dir = tempfile::tempdir().unwrap();
    let reader = CountingReader::new(synthetic("Synthetic"));
    let dataset = loaded(&reader, &dir, DatasetConfig::new("/raw"));

    let trial = dataset.find_trial(2, 3).unwrap();
    assert_eq!(trial.media_name(), "stimulus_03");
    assert_eq!(trial.expected_response(), Some(GroundTruth(3)));
    assert!(dataset.find_trial(4, 1).is_none());
}

#[test]
fn raw_signals_are_loaded_lazily_and_cached() {
    let dir = tempfile::tempdir().unwrap();
    let reader = CountingReader::new(synthetic("Synthetic"));
    let mut dataset = loaded(&reader, &dir, DatasetConfig::new("/raw"));
    assert_eq!(reader.loads(), 0);

    let trial = dataset.trial(0).unwrap();
    let raw = trial.load_raw_signal_data(&ecg()).unwrap();
    assert_eq!(raw.nrows(), 3);
    assert!(trial.trial().is_cached(&ecg()));
    assert!(!trial.trial().is_cached(&eeg()));

    let again = trial.load_raw_signal_data(&ecg()).unwrap();
    assert!(Arc::ptr_eq(&raw, &again));
    assert_eq!(reader.loads(), 1);

    let meta = trial.get_signal_metadata(&ecg()).unwrap();
    assert_eq!(meta.duration, Some(raw.ncols() as f64 / 256.0));
    assert_eq!(reader.loads(), 1);

    dataset.clear_signal_caches();
    let trial = dataset.trial(0).unwrap();
    assert!(!trial.trial().is_cached(&ecg()));
    trial.load_raw_signal_data(&ecg()).unwrap();
    assert_eq!(reader.loads(), 2);
}

#[test]
fn raw_cache_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let reader = CountingReader::new(synthetic("Synthetic"));
    let dataset = loaded(
        &reader,
        &dir,
        DatasetConfig::new("/raw").with_raw_cache(false),
    );

    let trial = dataset.trial(5).unwrap();
    let a = trial.load_signal_data(&eeg()).unwrap();
    let b = trial.load_signal_data(&eeg()).unwrap();
    assert_eq!(a, b);
    assert!(!trial.trial().is_cached(&eeg()));
    assert_eq!(reader.loads(), 2);
}

#[test]
fn chains_apply_on_every_load_including_after_reassignment() {
    let dir = tempfile::tempdir().unwrap();
    let reader = CountingReader::new(synthetic("Synthetic"));
    let mut dataset = loaded(&reader, &dir, DatasetConfig::new("/raw"));

    // no chain: identity
    let raw = dataset.trial(0).unwrap().load_signal_data(&ecg()).unwrap();
    assert_eq!(raw.nrows(), 3);

    // 1 second at 256 Hz, dropping the timestamp row
    let chain = PreprocessorNode::new(ChannelSelector::without_timestamps())
        .with_child(PreprocessorNode::new(FixedDuration::new(1.0, 256.0).with_timestamps(
            aer_pipeline::TimestampPolicy::Absent,
        )));
    assert!(dataset.set_preprocessor(&ecg(), chain).unwrap().is_none());

    let shaped = dataset.trial(0).unwrap().load_signal_data(&ecg()).unwrap();
    assert_eq!(shaped.dim(), (2, 256));
    // most recent samples are kept
    let n = raw.ncols();
    assert_eq!(shaped.row(1), raw.slice(ndarray::s![2, n - 256..]));

    let doubled = PreprocessorNode::new(Scale::new(2.0));
    assert!(dataset.set_preprocessor(&ecg(), doubled).unwrap().is_some());
    let scaled = dataset.trial(0).unwrap().load_signal_data(&ecg()).unwrap();
    assert_eq!(scaled, &raw * 2.0);

    // the cached raw array was reused throughout
    assert_eq!(reader.loads(), 1);

    dataset.clear_preprocessor(&ecg()).unwrap();
    assert_eq!(dataset.trial(0).unwrap().load_signal_data(&ecg()).unwrap(), raw);
}

#[test]
fn fixed_duration_pads_short_recordings_at_the_front() {
    let dir = tempfile::tempdir().unwrap();
    let reader = CountingReader::new(synthetic("Synthetic"));
    let mut dataset = loaded(&reader, &dir, DatasetConfig::new("/raw"));

    // participant 1 / media 1 records exactly 2 seconds
    dataset
        .set_preprocessor(
            &ecg(),
            PreprocessorNode::new(FixedDuration::with_timestamp_row(3.0, 256.0)),
        )
        .unwrap();
    let trial = dataset.find_trial(1, 1).unwrap();
    let raw = trial.load_raw_signal_data(&ecg()).unwrap();
    assert_eq!(raw.ncols(), 512);

    let padded = trial.load_signal_data(&ecg()).unwrap();
    assert_eq!(padded.dim(), (3, 768));
    assert!(padded.slice(ndarray::s![1.., ..256]).iter().all(|v| *v == 0.0));
    assert_eq!(padded.slice(ndarray::s![.., 256..]), raw.view());
    // timestamps continue backwards in milliseconds
    assert!((padded[[0, 0]] + 1000.0).abs() < 1e-9);
    assert!(padded[[0, 255]] < padded[[0, 256]]);
}

#[test]
fn preprocessing_errors_surface_from_signal_loads() {
    let dir = tempfile::tempdir().unwrap();
    let reader = CountingReader::new(synthetic("Synthetic"));
    let mut dataset = loaded(&reader, &dir, DatasetConfig::new("/raw"));

    dataset
        .set_preprocessor(&ecg(), PreprocessorNode::new(ChannelSelector::new(vec![0, 9])))
        .unwrap();
    let err = dataset.trial(0).unwrap().load_signal_data(&ecg()).unwrap_err();
    assert!(matches!(
        err,
        DatasetError::Pipeline(PipelineError::InvalidInput { .. })
    ));
}

#[test]
fn chains_can_be_configured_from_json() {
    let dir = tempfile::tempdir().unwrap();
    let reader = CountingReader::new(synthetic("Synthetic"));
    let mut dataset = loaded(&reader, &dir, DatasetConfig::new("/raw"));

    let json = r#"
    {
        "EEG": {
            "head": "shape",
            "nodes": [
                { "name": "shape", "type": "fixed_duration",
                  "params": { "duration": 1.5, "sample_rate": 128.0 },
                  "child": "scale" },
                { "name": "scale", "type": "min_max_scaler" }
            ]
        }
    }
    "#;
    let config = PreprocessingConfig::from_json(json).unwrap();
    dataset
        .configure_preprocessing(&config, &PreprocessorRegistry::with_builtins())
        .unwrap();
    assert_eq!(
        dataset.preprocessor(&eeg()).unwrap().resolve(),
        vec!["fixed_duration", "min_max_scaler"]
    );

    let signal = dataset.trial(3).unwrap().load_signal_data(&eeg()).unwrap();
    assert_eq!(signal.dim(), (5, 192));
    assert!(signal.iter().all(|v| (0.0..=1.0).contains(v)));

    // unknown signal types in the config install nothing
    let bad = PreprocessingConfig::from_json(
        r#"{ "GSR": { "head": "a", "nodes": [{ "name": "a", "type": "identity" }] } }"#,
    )
    .unwrap();
    dataset.clear_preprocessor(&eeg()).unwrap();
    assert!(dataset
        .configure_preprocessing(&bad, &PreprocessorRegistry::with_builtins())
        .is_err());
    assert!(dataset.preprocessor(&eeg()).is_none());
}

#[test]
fn offsets_near_the_id_limit_saturate() {
    let dir = tempfile::tempdir().unwrap();
    let reader = CountingReader::new(synthetic("Synthetic"));
    let dataset = loaded(
        &reader,
        &dir,
        DatasetConfig::new("/raw").with_offsets(u32::MAX - 1, u32::MAX),
    );

    let first = dataset.find_trial(1, 1).unwrap();
    assert_eq!(first.participant_id(), u32::MAX);
    assert_eq!(first.media_id(), u32::MAX);
    let last = dataset.find_trial(3, 4).unwrap();
    assert_eq!(last.participant_id(), u32::MAX);
    assert_eq!(last.trial().dataset_participant_id(), 3);
}

#[test]
fn baseline_recordings_load_through_the_same_checks() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let reader = CountingReader::new(synthetic("Synthetic").with_baseline(0.5));
    let mut dataset = loaded(&reader, &dir, DatasetConfig::new("/raw").with_signals(["ECG"]));

    let trial = dataset.find_trial(2, 3).unwrap();
    let baseline = trial.load_raw_baseline_data(&ecg()).unwrap().unwrap();
    let stimulus = trial.load_raw_signal_data(&ecg()).unwrap();
    assert_eq!(baseline.dim(), (3, 128));
    assert_eq!(baseline.nrows(), stimulus.nrows());
    assert_ne!(baseline.ncols(), stimulus.ncols());

    assert!(matches!(
        trial.load_raw_baseline_data(&eeg()),
        Err(DatasetError::UnknownSignalType { .. })
    ));

    dataset
        .set_preprocessor(&ecg(), PreprocessorNode::new(ChannelSelector::without_timestamps()))
        .unwrap();
    let trial = dataset.find_trial(2, 3).unwrap();
    let processed = trial.load_baseline_data(&ecg()).unwrap().unwrap();
    assert_eq!(processed.dim(), (2, 128));
}

#[test]
fn datasets_without_baselines_report_none() {
    let dir = tempfile::tempdir().unwrap();
    let reader = CountingReader::new(synthetic("Synthetic"));
    let dataset = loaded(&reader, &dir, DatasetConfig::new("/raw"));

    let trial = dataset.find_trial(1, 1).unwrap();
    assert!(trial.load_raw_baseline_data(&ecg()).unwrap().is_none());
    assert!(trial.load_baseline_data(&eeg()).unwrap().is_none());
    assert!(trial.load_raw_signal_data(&ecg()).is_ok());
}
