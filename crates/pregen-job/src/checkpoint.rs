//! Durable job progress record.
//!
//! The record is a flat TOML table whose keys match the job fields
//! (`running`, `cminX`, `curX`, `thisStep`, ...). Older `fill_job.properties`
//! files use the same `key=value` lines with `#` comments, so they parse
//! with the same reader and are picked up when no TOML record exists.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{JobError, JobResult};
use crate::state::{JobState, CHECKPOINT_FORMAT};

/// File name of records written before the TOML layout.
pub const LEGACY_CHECKPOINT_FILE: &str = "fill_job.properties";

const RECORD_HEADER: &str = "# Pregen fill job state\n";

/// Reads and writes the job record at a fixed path.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
    legacy_path: Option<PathBuf>,
}

impl CheckpointStore {
    /// Store backed by a single file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            legacy_path: None,
        }
    }

    /// Store for `file_name` inside `dir`, falling back to a legacy
    /// properties record in the same directory.
    pub fn in_dir(dir: &Path, file_name: &str) -> Self {
        Self {
            path: dir.join(file_name),
            legacy_path: Some(dir.join(LEGACY_CHECKPOINT_FILE)),
        }
    }

    /// Path of the record.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether any record (current or legacy) is present.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists() || self.legacy_path.as_deref().is_some_and(Path::exists)
    }

    /// Writes the full record. A crash leaves either the previous record or
    /// this one, never a mix: the bytes go to a sibling temp file which is
    /// synced and then renamed over the record.
    pub fn save(&self, state: &JobState) -> JobResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let record = JobState {
            format: CHECKPOINT_FORMAT,
            ..state.clone()
        };
        let body = toml::to_string(&record)?;

        let temp_path = self.temp_path();
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(RECORD_HEADER.as_bytes())?;
            file.write_all(body.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;

        debug!(cur_x = state.cur_x, cur_z = state.cur_z, done = state.done, "Checkpoint saved");
        Ok(())
    }

    /// Reads the record, reporting why it could not be used.
    ///
    /// `Ok(None)` means there is no record at all.
    pub fn try_load(&self) -> JobResult<Option<JobState>> {
        let path = match self.existing_path() {
            Some(path) => path,
            None => return Ok(None),
        };

        let text = fs::read_to_string(path)?;
        let state: JobState = toml::from_str(&text)?;
        if state.format > CHECKPOINT_FORMAT {
            return Err(JobError::UnsupportedFormat {
                found: state.format,
                supported: CHECKPOINT_FORMAT,
            });
        }
        state.validate()?;
        Ok(Some(state))
    }

    /// Reads the record. Anything unreadable counts as "no job" and is
    /// logged, never raised.
    #[must_use]
    pub fn load(&self) -> Option<JobState> {
        match self.try_load() {
            Ok(state) => state,
            Err(e) => {
                warn!("Ignoring fill job record at {}: {e}", self.path.display());
                None
            },
        }
    }

    /// Removes the record (and any legacy record). A missing file is fine.
    pub fn clear(&self) -> JobResult<()> {
        remove_if_present(&self.path)?;
        if let Some(legacy) = &self.legacy_path {
            remove_if_present(legacy)?;
        }
        Ok(())
    }

    fn existing_path(&self) -> Option<&Path> {
        if self.path.exists() {
            return Some(&self.path);
        }
        self.legacy_path.as_deref().filter(|p| p.exists())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
