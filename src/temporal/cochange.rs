//! Co-change association mining
//!
//! For files A and B over the N non-bulk commits that touch scanned files:
//!
//! ```text
//!   support     = commits touching both
//!   conf(A→B)   = support / changes(A)
//!   lift        = support · N / (changes(A) · changes(B))
//! ```
//!
//! Commits touching more than `max_files_per_commit` scanned files are bulk
//! changes (reformats, renames) and are ignored entirely.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TemporalConfig;
use crate::models::GitHistory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoChangePair {
    /// Lexicographically smaller path
    pub file_a: String,
    pub file_b: String,
    pub count: usize,
    /// P(B changed | A changed)
    pub confidence_a_b: f64,
    /// P(A changed | B changed)
    pub confidence_b_a: f64,
    pub lift: f64,
    pub total_a: usize,
    pub total_b: usize,
}

impl CoChangePair {
    pub fn max_confidence(&self) -> f64 {
        self.confidence_a_b.max(self.confidence_b_a)
    }

    /// Mutual information (bits) between the two files' change indicators.
    pub fn mutual_information(&self, total_commits: usize) -> f64 {
        mutual_information(self.count, self.total_a, self.total_b, total_commits)
    }
}

/// Mutual information of two binary variables from a 2×2 contingency table.
pub fn mutual_information(joint: usize, total_a: usize, total_b: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n_f = n as f64;
    let only_a = total_a.saturating_sub(joint);
    let only_b = total_b.saturating_sub(joint);
    let neither = n.saturating_sub(joint + only_a + only_b);

    let p_a = total_a as f64 / n_f;
    let p_b = total_b as f64 / n_f;
    let cells = [
        (joint, p_a, p_b),
        (only_a, p_a, 1.0 - p_b),
        (only_b, 1.0 - p_a, p_b),
        (neither, 1.0 - p_a, 1.0 - p_b),
    ];
    cells
        .iter()
        .filter(|(count, px, py)| *count > 0 && *px > 0.0 && *py > 0.0)
        .map(|(count, px, py)| {
            let p_xy = *count as f64 / n_f;
            p_xy * (p_xy / (px * py)).log2()
        })
        .sum::<f64>()
        .max(0.0)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoChangeMatrix {
    pub pairs: BTreeMap<(String, String), CoChangePair>,
    /// Changes per file within the counted commits
    pub file_change_counts: BTreeMap<String, usize>,
    /// Non-bulk commits that touched at least one scanned file
    pub total_commits: usize,
}

impl CoChangeMatrix {
    /// Pair lookup in either order.
    pub fn pair(&self, a: &str, b: &str) -> Option<&CoChangePair> {
        let key = if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        };
        self.pairs.get(&key)
    }

    pub fn changes(&self, file: &str) -> usize {
        self.file_change_counts.get(file).copied().unwrap_or(0)
    }
}

/// Build the co-change matrix over the scanned files.
pub fn build_cochange_matrix(
    history: &GitHistory,
    scanned: &BTreeSet<String>,
    config: &TemporalConfig,
) -> CoChangeMatrix {
    let mut joint: FxHashMap<(&str, &str), usize> = FxHashMap::default();
    let mut file_change_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_commits = 0usize;
    let mut bulk = 0usize;

    for commit in &history.commits {
        let mut files: Vec<&str> = commit
            .files
            .iter()
            .map(String::as_str)
            .filter(|f| scanned.contains(*f))
            .collect();
        files.sort_unstable();
        files.dedup();
        if files.is_empty() {
            continue;
        }
        if files.len() > config.max_files_per_commit {
            bulk += 1;
            continue;
        }

        total_commits += 1;
        for f in &files {
            *file_change_counts.entry((*f).to_string()).or_insert(0) += 1;
        }
        for i in 0..files.len() {
            for j in (i + 1)..files.len() {
                *joint.entry((files[i], files[j])).or_insert(0) += 1;
            }
        }
    }

    let min_count = config.min_cochanges.max(1);
    let mut pairs = BTreeMap::new();
    for ((a, b), count) in joint {
        if count < min_count {
            continue;
        }
        let total_a = file_change_counts.get(a).copied().unwrap_or(0);
        let total_b = file_change_counts.get(b).copied().unwrap_or(0);
        if total_a == 0 || total_b == 0 {
            continue;
        }
        let lift = (count * total_commits) as f64 / (total_a * total_b) as f64;
        pairs.insert(
            (a.to_string(), b.to_string()),
            CoChangePair {
                file_a: a.to_string(),
                file_b: b.to_string(),
                count,
                confidence_a_b: count as f64 / total_a as f64,
                confidence_b_a: count as f64 / total_b as f64,
                lift,
                total_a,
                total_b,
            },
        );
    }

    debug!(
        "Co-change: {} commits ({} bulk skipped), {} pairs",
        total_commits,
        bulk,
        pairs.len()
    );

    CoChangeMatrix {
        pairs,
        file_change_counts,
        total_commits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CommitRecord;

    fn commit(id: usize, files: &[&str]) -> CommitRecord {
        CommitRecord {
            id: format!("c{}", id),
            timestamp: id as i64 * 3600,
            author: "dev".to_string(),
            message: String::new(),
            files: files.iter().map(|f| f.to_string()).collect(),
            intent: None,
        }
    }

    fn scanned(files: &[&str]) -> BTreeSet<String> {
        files.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_basic_pair_statistics() {
        let history = GitHistory::new(vec![
            commit(1, &["a.py", "b.py"]),
            commit(2, &["a.py", "b.py"]),
            commit(3, &["a.py"]),
            commit(4, &["c.py"]),
        ]);
        let m = build_cochange_matrix(
            &history,
            &scanned(&["a.py", "b.py", "c.py"]),
            &TemporalConfig::default(),
        );
        assert_eq!(m.total_commits, 4);
        let pair = m.pair("b.py", "a.py").unwrap();
        assert_eq!(pair.count, 2);
        assert!((pair.confidence_a_b - 2.0 / 3.0).abs() < 1e-9);
        assert!((pair.confidence_b_a - 1.0).abs() < 1e-9);
        // 2 * 4 / (3 * 2)
        assert!((pair.lift - 4.0 / 3.0).abs() < 1e-9);
        assert!(m.pair("a.py", "c.py").is_none());
    }

    #[test]
    fn test_min_cochange_count() {
        let history = GitHistory::new(vec![commit(1, &["a.py", "b.py"])]);
        let m = build_cochange_matrix(
            &history,
            &scanned(&["a.py", "b.py"]),
            &TemporalConfig::default(),
        );
        assert!(m.pairs.is_empty());
    }

    #[test]
    fn test_bulk_commits_excluded() {
        let many: Vec<String> = (0..60).map(|i| format!("f{}.py", i)).collect();
        let refs: Vec<&str> = many.iter().map(String::as_str).collect();
        let history = GitHistory::new(vec![commit(1, &refs), commit(2, &refs)]);
        let m = build_cochange_matrix(&history, &scanned(&refs), &TemporalConfig::default());
        assert!(m.pairs.is_empty());
        assert_eq!(m.total_commits, 0);
    }

    #[test]
    fn test_unscanned_files_ignored() {
        let history = GitHistory::new(vec![
            commit(1, &["a.py", "README.md"]),
            commit(2, &["a.py", "README.md"]),
        ]);
        let m = build_cochange_matrix(&history, &scanned(&["a.py"]), &TemporalConfig::default());
        assert!(m.pairs.is_empty());
        assert_eq!(m.changes("a.py"), 2);
        assert_eq!(m.changes("README.md"), 0);
    }

    #[test]
    fn test_mutual_information() {
        // independent: joint = ta * tb / n
        assert!(mutual_information(25, 50, 50, 100).abs() < 1e-9);
        // perfectly dependent, half the commits
        assert!((mutual_information(50, 50, 50, 100) - 1.0).abs() < 1e-9);
        assert_eq!(mutual_information(0, 0, 0, 0), 0.0);
    }
}
