#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use aer_datasets::{
    DatasetReader, DatasetResult, SyntheticReader, TrialRecord, WorkingStore,
};
use aer_types::{GroundTruth, Signal, SignalMetadata, SignalType};

/// Routes `tracing` output through the test harness. Set `RUST_LOG=debug` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Synthetic reader that records how often the dataset core calls into it.
#[derive(Debug)]
pub struct CountingReader {
    inner: SyntheticReader,
    converts: Mutex<HashMap<SignalType, usize>>,
    loads: AtomicUsize,
}

impl CountingReader {
    pub fn new(inner: SyntheticReader) -> Arc<Self> {
        Arc::new(Self {
            inner,
            converts: Mutex::new(HashMap::new()),
            loads: AtomicUsize::new(0),
        })
    }

    pub fn converts(&self, signal_type: &str) -> usize {
        self.converts
            .lock()
            .unwrap()
            .get(signal_type)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_converts(&self) -> usize {
        self.converts.lock().unwrap().values().sum()
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl DatasetReader for CountingReader {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn available_signals(&self) -> Vec<SignalType> {
        self.inner.available_signals()
    }

    fn signal_metadata(&self, signal_type: &SignalType) -> Option<SignalMetadata> {
        self.inner.signal_metadata(signal_type)
    }

    fn convert(&self, signal_type: &SignalType, store: &WorkingStore) -> DatasetResult<()> {
        *self
            .converts
            .lock()
            .unwrap()
            .entry(signal_type.clone())
            .or_insert(0) += 1;
        self.inner.convert(signal_type, store)
    }

    fn enumerate_trials(&self, store: &WorkingStore) -> DatasetResult<Vec<TrialRecord>> {
        self.inner.enumerate_trials(store)
    }

    fn load_signal(
        &self,
        store: &WorkingStore,
        participant_id: u32,
        media_id: u32,
        signal_type: &SignalType,
    ) -> DatasetResult<Signal> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner
            .load_signal(store, participant_id, media_id, signal_type)
    }

    fn load_baseline(
        &self,
        store: &WorkingStore,
        participant_id: u32,
        media_id: u32,
        signal_type: &SignalType,
    ) -> DatasetResult<Option<Signal>> {
        self.inner
            .load_baseline(store, participant_id, media_id, signal_type)
    }

    fn media_name(&self, media_id: u32) -> Option<String> {
        self.inner.media_name(media_id)
    }

    fn expected_response(&self, media_id: u32) -> Option<GroundTruth> {
        self.inner.expected_response(media_id)
    }
}

/// Three participants, four stimuli, ECG (2 channels @ 256 Hz) and EEG (4 channels @ 128 Hz).
pub fn synthetic(name: &str) -> SyntheticReader {
    SyntheticReader::new(name, 3, 4)
        .with_signal("ECG", 256.0, 2)
        .with_signal("EEG", 128.0, 4)
}
