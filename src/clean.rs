//! Cleanup stage: clear the local working area after publishing.
//!
//! Unlike the tolerant download/upload stages, a failed deletion is fatal: a
//! working area that cannot be emptied leaks state into the next invocation
//! sharing it.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CleanError {
    #[error("failed to scan working area {path}: {source}")]
    Scan {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Delete everything remaining in `work_dir`. Returns the number of entries
/// removed.
pub fn clear_working_area(work_dir: &Path) -> Result<usize, CleanError> {
    let entries = fs::read_dir(work_dir).map_err(|source| CleanError::Scan {
        path: work_dir.to_path_buf(),
        source,
    })?;

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|source| CleanError::Scan {
            path: work_dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.map_err(|source| CleanError::Remove {
            path: path.clone(),
            source,
        })?;
        removed += 1;
    }
    debug!(removed, path = %work_dir.display(), "cleared working area");
    Ok(removed)
}
