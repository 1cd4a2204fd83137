//! Rolling waitlist snapshots.
//!
//! One `waitlist_current.csv` holds the latest Waiting bucket; before each
//! write the previous current file is rotated into a timestamp-named slot,
//! and the oldest slots are pruned so at most 10 remain. Entries older than
//! that are gone for good; this is a bounded backup, not a history.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use handoff_common::{HandoffError, OutreachDecision};
use tracing::{info, warn};

use crate::assembler::decisions_to_csv;
use crate::util::atomic_write;

/// Historical snapshots retained after pruning.
pub const MAX_HISTORY: usize = 10;

const CURRENT_NAME: &str = "waitlist_current.csv";

/// What one snapshot write did, for the run log.
#[derive(Debug)]
pub struct SnapshotOutcome {
    pub current: PathBuf,
    pub rotated_to: Option<PathBuf>,
    pub pruned: usize,
}

pub struct WaitlistArchive {
    dir: PathBuf,
}

impl WaitlistArchive {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Rotate the previous snapshot aside, write the new Waiting bucket as
    /// current, and prune history down to [`MAX_HISTORY`].
    pub fn write_snapshot(
        &self,
        waiting: &[OutreachDecision],
        now: DateTime<Utc>,
    ) -> Result<SnapshotOutcome, HandoffError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| HandoffError::Persistence(e.to_string()))?;

        let current = self.dir.join(CURRENT_NAME);

        // Timestamp names sort chronologically, so "oldest by creation
        // time" is plain name order.
        let rotated_to = if current.exists() {
            let slot = self
                .dir
                .join(format!("waitlist_{}.csv", now.format("%Y%m%d-%H%M%S")));
            std::fs::rename(&current, &slot)
                .map_err(|e| HandoffError::Persistence(e.to_string()))?;
            Some(slot)
        } else {
            None
        };

        let csv = decisions_to_csv(waiting).map_err(|e| HandoffError::Persistence(e.to_string()))?;
        atomic_write(&current, csv.as_bytes())
            .map_err(|e| HandoffError::Persistence(e.to_string()))?;

        let pruned = self.prune()?;

        info!(
            path = %current.display(),
            transcripts = waiting.len(),
            pruned,
            "Waitlist snapshot written"
        );

        Ok(SnapshotOutcome {
            current,
            rotated_to,
            pruned,
        })
    }

    /// Delete oldest historical snapshots until at most [`MAX_HISTORY`]
    /// remain. Returns how many were removed.
    fn prune(&self) -> Result<usize, HandoffError> {
        let mut history = list_history(&self.dir)?;
        history.sort();

        let mut pruned = 0;
        while history.len() > MAX_HISTORY {
            let oldest = history.remove(0);
            match std::fs::remove_file(&oldest) {
                Ok(()) => pruned += 1,
                Err(e) => {
                    // A vanished file still achieves the cap; anything else
                    // is a real persistence problem.
                    if e.kind() == std::io::ErrorKind::NotFound {
                        warn!(path = %oldest.display(), "Snapshot already gone while pruning");
                    } else {
                        return Err(HandoffError::Persistence(e.to_string()));
                    }
                }
            }
        }
        Ok(pruned)
    }
}

/// Timestamp-named snapshots in `dir`, excluding the current file.
fn list_history(dir: &Path) -> Result<Vec<PathBuf>, HandoffError> {
    let entries = std::fs::read_dir(dir).map_err(|e| HandoffError::Persistence(e.to_string()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| HandoffError::Persistence(e.to_string()))?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("waitlist_") && name.ends_with(".csv") && name != CURRENT_NAME {
            paths.push(entry.path());
        }
    }
    Ok(paths)
}
