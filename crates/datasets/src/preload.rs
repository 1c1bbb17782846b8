//! Persisted record of which signal types have been preloaded into a working store

use std::collections::BTreeSet;

use aer_types::SignalType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DatasetResult;
use crate::store::WorkingStore;

/// File name of the marker inside the dataset's working directory.
pub const PRELOAD_MARKER_FILE: &str = ".preload.json";

/// Set of signal types whose intermediate files are complete.
///
/// A type is added only after its conversion finished, so an interrupted preload is resumed by
/// converting just the types that are still missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreloadMarker {
    signals: BTreeSet<SignalType>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl PreloadMarker {
    /// Reads the marker, or returns an empty one if none has been written yet.
    pub fn load(store: &WorkingStore) -> DatasetResult<Self> {
        if !store.exists(PRELOAD_MARKER_FILE) {
            debug!("No preload marker in {}", store.root().display());
            return Ok(Self::default());
        }
        store.read_json(PRELOAD_MARKER_FILE)
    }

    pub fn save(&mut self, store: &WorkingStore) -> DatasetResult<()> {
        self.updated_at = Some(Utc::now());
        store.write_json(PRELOAD_MARKER_FILE, &*self)
    }

    pub fn contains(&self, signal_type: &SignalType) -> bool {
        self.signals.contains(signal_type)
    }

    pub fn mark(&mut self, signal_type: SignalType) {
        self.signals.insert(signal_type);
    }

    pub fn signals(&self) -> &BTreeSet<SignalType> {
        &self.signals
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Requested types that still need converting, in sorted order.
    pub fn missing<'a, I>(&self, requested: I) -> Vec<SignalType>
    where
        I: IntoIterator<Item = &'a SignalType>,
    {
        requested
            .into_iter()
            .filter(|s| !self.signals.contains(*s))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_marker_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkingStore::open(dir.path(), "ds").unwrap();
        let marker = PreloadMarker::load(&store).unwrap();
        assert!(marker.signals().is_empty());
        assert!(marker.updated_at().is_none());
    }

    #[test]
    fn test_marker_persists_and_reports_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkingStore::open(dir.path(), "ds").unwrap();

        let mut marker = PreloadMarker::default();
        marker.mark(SignalType::from("ECG"));
        marker.save(&store).unwrap();

        let reloaded = PreloadMarker::load(&store).unwrap();
        assert!(reloaded.contains(&SignalType::from("ECG")));
        assert!(reloaded.updated_at().is_some());

        let requested = [SignalType::from("ECG"), SignalType::from("EEG")];
        assert_eq!(reloaded.missing(&requested), vec![SignalType::from("EEG")]);
    }

    #[test]
    fn test_similar_names_are_distinct() {
        let mut marker = PreloadMarker::default();
        marker.mark(SignalType::from("ECG"));
        let requested = [SignalType::from("ECGHR")];
        assert_eq!(marker.missing(&requested), vec![SignalType::from("ECGHR")]);
    }
}
