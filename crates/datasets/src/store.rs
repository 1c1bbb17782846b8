//! On-disk intermediate cache for a single dataset.
//!
//! Layout under `<working_dir>/<dataset name>/`:
//!
//! ```text
//! .preload.json                       preload marker
//! trials.json                         trial index written by the reader
//! Participant_01/Media_01/ECG_stimuli.bin
//! Participant_01/Media_01/ECG_baseline.bin  optional pre-stimulus recording
//! ```
//!
//! Signal files are keyed by signal type, so converting a new type never overwrites or
//! masquerades as an existing one.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use aer_types::{Signal, SignalType};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{DatasetError, DatasetResult};
use crate::reader::TrialRecord;

const TRIAL_INDEX_FILE: &str = "trials.json";

/// Which part of a trial session a signal file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recording {
    /// Recorded while the stimulus was presented.
    #[default]
    Stimuli,
    /// Resting recording taken before the stimulus.
    Baseline,
}

impl Recording {
    pub fn suffix(self) -> &'static str {
        match self {
            Recording::Stimuli => "stimuli",
            Recording::Baseline => "baseline",
        }
    }
}

/// Handle on one dataset's working directory.
#[derive(Debug, Clone)]
pub struct WorkingStore {
    root: PathBuf,
}

impl WorkingStore {
    /// Opens (creating if needed) `<working_dir>/<dataset_name>`.
    pub fn open(working_dir: impl AsRef<Path>, dataset_name: &str) -> DatasetResult<Self> {
        if dataset_name.is_empty() || dataset_name.contains(['/', '\\']) {
            return Err(DatasetError::Configuration(format!(
                "invalid dataset name for working directory: '{}'",
                dataset_name
            )));
        }
        let root = working_dir.as_ref().join(dataset_name);
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn participant_dir(&self, participant_id: u32) -> PathBuf {
        self.root.join(format!("Participant_{:02}", participant_id))
    }

    pub fn media_dir(&self, participant_id: u32, media_id: u32) -> PathBuf {
        self.participant_dir(participant_id)
            .join(format!("Media_{:02}", media_id))
    }

    /// Path of the intermediate file holding one recording of a trial's signal.
    pub fn recording_path(
        &self,
        participant_id: u32,
        media_id: u32,
        signal_type: &SignalType,
        recording: Recording,
    ) -> PathBuf {
        self.media_dir(participant_id, media_id)
            .join(format!("{}_{}.bin", signal_type, recording.suffix()))
    }

    /// Path of the stimulus recording for one trial.
    pub fn trial_path(&self, participant_id: u32, media_id: u32, signal_type: &SignalType) -> PathBuf {
        self.recording_path(participant_id, media_id, signal_type, Recording::Stimuli)
    }

    pub fn has_recording(
        &self,
        participant_id: u32,
        media_id: u32,
        signal_type: &SignalType,
        recording: Recording,
    ) -> bool {
        self.recording_path(participant_id, media_id, signal_type, recording)
            .is_file()
    }

    pub fn has_signal(&self, participant_id: u32, media_id: u32, signal_type: &SignalType) -> bool {
        self.has_recording(participant_id, media_id, signal_type, Recording::Stimuli)
    }

    pub fn write_recording(
        &self,
        participant_id: u32,
        media_id: u32,
        signal_type: &SignalType,
        recording: Recording,
        signal: &Signal,
    ) -> DatasetResult<()> {
        let path = self.recording_path(participant_id, media_id, signal_type, recording);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_atomic(&path, |w| Ok(bincode::serialize_into(w, signal)?))?;
        trace!("Wrote {} ({:?})", path.display(), signal.dim());
        Ok(())
    }

    pub fn write_signal(
        &self,
        participant_id: u32,
        media_id: u32,
        signal_type: &SignalType,
        signal: &Signal,
    ) -> DatasetResult<()> {
        self.write_recording(participant_id, media_id, signal_type, Recording::Stimuli, signal)
    }

    pub fn read_recording(
        &self,
        participant_id: u32,
        media_id: u32,
        signal_type: &SignalType,
        recording: Recording,
    ) -> DatasetResult<Signal> {
        let path = self.recording_path(participant_id, media_id, signal_type, recording);
        let file = open_existing(&path)?;
        let signal: Signal = bincode::deserialize_from(BufReader::new(file)).map_err(|e| {
            DatasetError::DataFormat(format!("corrupt signal file {}: {}", path.display(), e))
        })?;
        Ok(signal)
    }

    pub fn read_signal(
        &self,
        participant_id: u32,
        media_id: u32,
        signal_type: &SignalType,
    ) -> DatasetResult<Signal> {
        self.read_recording(participant_id, media_id, signal_type, Recording::Stimuli)
    }

    pub fn write_trial_index(&self, records: &[TrialRecord]) -> DatasetResult<()> {
        self.write_json(TRIAL_INDEX_FILE, &records)
    }

    pub fn read_trial_index(&self) -> DatasetResult<Vec<TrialRecord>> {
        self.read_json(TRIAL_INDEX_FILE)
    }

    /// Writes a JSON document at `name` relative to the store root, replacing it atomically.
    pub fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> DatasetResult<()> {
        let path = self.root.join(name);
        write_atomic(&path, |w| Ok(serde_json::to_writer_pretty(w, value)?))
    }

    /// Reads a JSON document at `name` relative to the store root.
    pub fn read_json<T: DeserializeOwned>(&self, name: &str) -> DatasetResult<T> {
        let path = self.root.join(name);
        let file = open_existing(&path)?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            DatasetError::DataFormat(format!("corrupt JSON file {}: {}", path.display(), e))
        })
    }

    /// Returns whether a file exists at `name` relative to the store root.
    pub fn exists(&self, name: &str) -> bool {
        self.root.join(name).exists()
    }
}

fn open_existing(path: &Path) -> DatasetResult<File> {
    File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            DatasetError::DataFormat(format!("missing intermediate file {}", path.display()))
        }
        _ => DatasetError::Io(e),
    })
}

/// Writes through a temporary sibling file and renames it into place.
fn write_atomic<F>(path: &Path, write: F) -> DatasetResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> DatasetResult<()>,
{
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut writer = BufWriter::new(File::create(&tmp)?);
    write(&mut writer)?;
    writer.flush()?;
    drop(writer);
    fs::rename(&tmp, path)?;
    Ok(())
}
