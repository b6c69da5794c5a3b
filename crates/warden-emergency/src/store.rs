//! Durable state persistence.
//!
//! One record per process, written atomically: serialize to a temporary
//! file next to the target, flush and fsync, then rename over the previous
//! record. A crash at any point leaves either the old record or the new
//! one on disk, never a partially-written file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{EmergencyError, EmergencyResult};
use crate::state::{StateRecord, STATE_RECORD_VERSION};

/// File-backed store for the emergency state record.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Create a store for the given record path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The record path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a record atomically.
    pub fn persist(&self, record: &StateRecord) -> EmergencyResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.tmp_path();
        let json = serde_json::to_vec_pretty(record)?;

        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&json)?;
            file.flush()?;
            // The rename is only atomic if the content reached the disk first.
            file.sync_all()?;
        }

        fs::rename(&tmp_path, &self.path)?;

        debug!(path = %self.path.display(), "Emergency state persisted");
        Ok(())
    }

    /// Load the last persisted record.
    ///
    /// Returns `Ok(None)` if no record exists yet. An unreadable or
    /// version-mismatched record is an error; the caller decides how to
    /// fail safe (the state machine starts Halted).
    pub fn load(&self) -> EmergencyResult<Option<StateRecord>> {
        // A leftover temp file is an interrupted write; the target file is
        // still the authoritative record.
        let tmp_path = self.tmp_path();
        if tmp_path.exists() {
            warn!(path = %tmp_path.display(), "Removing interrupted state write");
            let _ = fs::remove_file(&tmp_path);
        }

        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let record: StateRecord = serde_json::from_str(&content)
            .map_err(|e| EmergencyError::CorruptState(e.to_string()))?;

        if record.version != STATE_RECORD_VERSION {
            return Err(EmergencyError::CorruptState(format!(
                "unsupported record version {}",
                record.version
            )));
        }

        info!(
            path = %self.path.display(),
            halted = record.state.is_halted(),
            "Emergency state recovered"
        );
        Ok(Some(record))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut p = self.path.clone().into_os_string();
        p.push(".tmp");
        PathBuf::from(p)
    }
}
