//! Snapshot history collaborator
//!
//! Prior runs, as seen by the two finders that look back in time:
//! `chronic_problem` asks how many snapshots already contained a finding, and
//! `architecture_erosion` reads the layer-violation rate series.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::Finding;
use crate::signals::SignalField;

/// Read access to prior analysis snapshots.
pub trait HistoryStore: Send + Sync {
    /// Number of prior snapshots that contained a finding with this signature.
    fn lookup_persistence(&self, signature: &str) -> usize;

    /// Violation rates of the most recent `limit` snapshots, oldest first.
    fn violation_rate_series(&self, limit: usize) -> Vec<f64>;
}

/// What is kept of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unix seconds
    pub timestamp: i64,
    #[serde(default)]
    pub finding_signatures: Vec<String>,
    #[serde(default)]
    pub violation_rate: Option<f64>,
}

impl Snapshot {
    pub fn from_run(field: &SignalField, findings: &[Finding], timestamp: i64) -> Self {
        let mut finding_signatures: Vec<String> = findings.iter().map(Finding::signature).collect();
        finding_signatures.sort();
        finding_signatures.dedup();
        Self {
            timestamp,
            finding_signatures,
            violation_rate: field.global.violation_rate,
        }
    }
}

/// Snapshots held in memory, oldest first.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    snapshots: Vec<Snapshot>,
}

impl InMemoryHistory {
    pub fn new(snapshots: Vec<Snapshot>) -> Self {
        Self { snapshots }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl HistoryStore for InMemoryHistory {
    fn lookup_persistence(&self, signature: &str) -> usize {
        self.snapshots
            .iter()
            .filter(|s| s.finding_signatures.iter().any(|sig| sig == signature))
            .count()
    }

    fn violation_rate_series(&self, limit: usize) -> Vec<f64> {
        let rates: Vec<f64> = self
            .snapshots
            .iter()
            .filter_map(|s| s.violation_rate)
            .collect();
        let start = rates.len().saturating_sub(limit);
        rates[start..].to_vec()
    }
}

/// Snapshots persisted as one JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonHistoryStore {
    path: PathBuf,
    history: InMemoryHistory,
}

impl JsonHistoryStore {
    /// Open a history file. A missing file is an empty history.
    pub fn open(path: &Path) -> Result<Self> {
        let snapshots = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read history file {}", path.display()))?;
            serde_json::from_str::<Vec<Snapshot>>(&raw)
                .with_context(|| format!("failed to parse history file {}", path.display()))?
        } else {
            Vec::new()
        };
        debug!("Loaded {} snapshot(s) from {}", snapshots.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            history: InMemoryHistory::new(snapshots),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Append a snapshot and rewrite the file.
    pub fn record(&mut self, snapshot: Snapshot) -> Result<()> {
        self.history.push(snapshot);
        let json = serde_json::to_string_pretty(self.history.snapshots())
            .context("failed to serialize history")?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write history file {}", self.path.display()))?;
        Ok(())
    }
}

impl HistoryStore for JsonHistoryStore {
    fn lookup_persistence(&self, signature: &str) -> usize {
        self.history.lookup_persistence(signature)
    }

    fn violation_rate_series(&self, limit: usize) -> Vec<f64> {
        self.history.violation_rate_series(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn snapshot(signatures: &[&str], rate: Option<f64>) -> Snapshot {
        Snapshot {
            timestamp: 0,
            finding_signatures: signatures.iter().map(|s| s.to_string()).collect(),
            violation_rate: rate,
        }
    }

    #[test]
    fn test_persistence_counts_snapshots() {
        let history = InMemoryHistory::new(vec![
            snapshot(&["god_file:a.py"], Some(0.1)),
            snapshot(&["god_file:a.py", "orphan_code:b.py"], None),
            snapshot(&["god_file:a.py"], Some(0.2)),
        ]);
        assert_eq!(history.lookup_persistence("god_file:a.py"), 3);
        assert_eq!(history.lookup_persistence("orphan_code:b.py"), 1);
        assert_eq!(history.lookup_persistence("weak_link:c.py"), 0);
    }

    #[test]
    fn test_violation_series_keeps_latest() {
        let history = InMemoryHistory::new(vec![
            snapshot(&[], Some(0.1)),
            snapshot(&[], Some(0.2)),
            snapshot(&[], None),
            snapshot(&[], Some(0.3)),
        ]);
        assert_eq!(history.violation_rate_series(2), vec![0.2, 0.3]);
        assert_eq!(history.violation_rate_series(10), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_json_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("history.json");

        let mut store = JsonHistoryStore::open(&path).unwrap();
        assert!(store.is_empty());
        store.record(snapshot(&["god_file:a.py"], Some(0.1))).unwrap();
        store.record(snapshot(&["god_file:a.py"], Some(0.2))).unwrap();

        let reopened = JsonHistoryStore::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.lookup_persistence("god_file:a.py"), 2);
        assert_eq!(reopened.violation_rate_series(5), vec![0.1, 0.2]);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(JsonHistoryStore::open(&path).is_err());
    }
}
