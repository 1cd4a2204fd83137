//! Content-length fingerprints for transcript sources.
//!
//! Maps each source URL to the byte length of the last successfully
//! processed response body. A re-fetched body of identical length is
//! treated as unchanged and skipped. Length is the whole test: two
//! different payloads of equal length read as unchanged (see DESIGN.md).

use std::collections::HashMap;
use std::path::PathBuf;

use handoff_common::HandoffError;
use tracing::{info, warn};

use crate::util::atomic_write;

pub struct FingerprintStore {
    path: PathBuf,
    entries: HashMap<String, usize>,
}

impl FingerprintStore {
    /// Load the store from disk. Fails soft: a missing file means a first
    /// run, a corrupt file costs one full refetch; both start empty.
    pub fn load(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => {
                    info!(path = %path.display(), "Fingerprint store loaded");
                    entries
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Fingerprint store corrupt, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "No fingerprint store found, starting empty");
                HashMap::new()
            }
        };
        Self { path, entries }
    }

    /// True when `body` has the same length last recorded for `url`.
    /// A URL never seen before is always a change.
    pub fn check(&self, url: &str, body: &str) -> bool {
        self.entries.get(url) == Some(&body.len())
    }

    /// Record a freshly processed length. Overwrites only on difference.
    /// Call this after the source's content was extracted successfully, so
    /// a failed source keeps its old fingerprint and retries next run.
    pub fn record(&mut self, url: &str, len: usize) {
        match self.entries.get(url) {
            Some(prior) if *prior == len => {}
            _ => {
                self.entries.insert(url.to_string(), len);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist the map atomically. An interrupted run leaves the previous
    /// store file intact.
    pub fn save(&self) -> Result<(), HandoffError> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| HandoffError::Persistence(e.to_string()))?;
        atomic_write(&self.path, json.as_bytes())
            .map_err(|e| HandoffError::Persistence(e.to_string()))?;
        info!(path = %self.path.display(), entries = self.entries.len(), "Fingerprint store saved");
        Ok(())
    }
}
