//! Compression-based clone detection
//!
//! Normalized compression distance between two files:
//!
//! ```text
//!   NCD(a, b) = (C(ab) − min(C(a), C(b))) / max(C(a), C(b))
//! ```
//!
//! where `C` is the zlib-compressed size. Near-duplicates compress well
//! together, so a low NCD means a likely copy-paste clone.
//!
//! The pairwise pass is O(n²) compressions, so it is capped: only the
//! `max_files` largest eligible files take part, and a pair is pruned when
//! the size pre-filter already proves its NCD is at or above the threshold.
//! Each file's row of comparisons runs with a deadline that is checked before
//! every pair; a file that runs out of time is withheld, not fatal, and the
//! pairs it never compared are counted.

use std::collections::BTreeMap;
use std::io::Write;
use std::time::{Duration, Instant};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CloneConfig;
use crate::models::{FileFact, FileRole};

/// Files smaller than this get compression_ratio 0 (zlib overhead dominates).
const MIN_RATIO_BYTES: usize = 512;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClonePair {
    pub file_a: String,
    pub file_b: String,
    pub ncd: f64,
    pub size_a: usize,
    pub size_b: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloneAnalysis {
    /// Pairs with NCD below the threshold, `file_a < file_b`
    pub pairs: Vec<ClonePair>,
    /// Per-file compressed/raw size ratio
    pub compression_ratios: BTreeMap<String, f64>,
    /// Files whose measurement exceeded the per-file deadline
    pub timed_out: Vec<String>,
    /// Candidate pairs never compared because their row ran out of time
    #[serde(default)]
    pub skipped_pairs: usize,
}

impl CloneAnalysis {
    /// Number of distinct files taking part in at least one clone pair.
    pub fn files_in_clones(&self) -> usize {
        let mut files: Vec<&str> = self
            .pairs
            .iter()
            .flat_map(|p| [p.file_a.as_str(), p.file_b.as_str()])
            .collect();
        files.sort_unstable();
        files.dedup();
        files.len()
    }
}

/// zlib level-9 compressed size.
pub fn compressed_size(data: &[u8]) -> usize {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(9));
    if encoder.write_all(data).is_err() {
        return data.len();
    }
    encoder.finish().map_or(data.len(), |out| out.len())
}

/// Compressed/raw size ratio; 0 for tiny inputs, capped at 1.0.
pub fn compression_ratio(data: &[u8]) -> f64 {
    if data.len() < MIN_RATIO_BYTES {
        return 0.0;
    }
    (compressed_size(data) as f64 / data.len() as f64).min(1.0)
}

/// Normalized compression distance, clamped to [0, 1].
pub fn ncd(a: &[u8], b: &[u8]) -> f64 {
    ncd_with_sizes(a, b, compressed_size(a), compressed_size(b))
}

fn ncd_with_sizes(a: &[u8], b: &[u8], ca: usize, cb: usize) -> f64 {
    let c_max = ca.max(cb);
    if c_max == 0 {
        return 0.0;
    }
    let mut joined = Vec::with_capacity(a.len() + b.len());
    joined.extend_from_slice(a);
    joined.extend_from_slice(b);
    let cab = compressed_size(&joined);
    let c_min = ca.min(cb);
    ((cab as f64 - c_min as f64) / c_max as f64).clamp(0.0, 1.0)
}

struct Candidate<'a> {
    path: &'a str,
    role: FileRole,
    bytes: &'a [u8],
    compressed: usize,
}

fn is_test_or_migration(role: FileRole) -> bool {
    matches!(role, FileRole::Test | FileRole::Migration)
}

/// Pairwise NCD over path-sorted candidates, one deadline per row.
///
/// Returns the clone pairs, the files whose row timed out, and how many
/// pairs were skipped because of it.
fn compare_candidates(
    candidates: &[Candidate<'_>],
    threshold: f64,
    timeout: Duration,
) -> (Vec<ClonePair>, Vec<String>, usize) {
    let rows: Vec<(Vec<ClonePair>, usize)> = (0..candidates.len())
        .into_par_iter()
        .map(|i| {
            let a = &candidates[i];
            let rest = &candidates[i + 1..];
            let started = Instant::now();
            let mut found = Vec::new();
            for (offset, b) in rest.iter().enumerate() {
                if started.elapsed() >= timeout {
                    return (found, rest.len() - offset);
                }
                if is_test_or_migration(a.role) && is_test_or_migration(b.role) {
                    continue;
                }
                let c_max = a.compressed.max(b.compressed);
                let c_min = a.compressed.min(b.compressed);
                if c_max == 0 || (c_max - c_min) as f64 / c_max as f64 >= threshold {
                    continue;
                }
                let distance = ncd_with_sizes(a.bytes, b.bytes, a.compressed, b.compressed);
                if distance < threshold {
                    found.push(ClonePair {
                        file_a: a.path.to_string(),
                        file_b: b.path.to_string(),
                        ncd: distance,
                        size_a: a.bytes.len(),
                        size_b: b.bytes.len(),
                    });
                }
            }
            (found, 0)
        })
        .collect();

    let mut pairs = Vec::new();
    let mut timed_out = Vec::new();
    let mut skipped = 0;
    for (i, (found, row_skipped)) in rows.into_iter().enumerate() {
        pairs.extend(found);
        if row_skipped > 0 {
            timed_out.push(candidates[i].path.to_string());
            skipped += row_skipped;
        }
    }
    (pairs, timed_out, skipped)
}

/// Measure compression ratios and find clone pairs.
pub fn detect_clones(facts: &[FileFact], config: &CloneConfig) -> CloneAnalysis {
    let timeout = Duration::from_millis(config.file_timeout_ms);

    // Per-file compression, each with its own deadline
    let measured: Vec<(&FileFact, Option<usize>)> = facts
        .par_iter()
        .filter(|f| f.content.is_some())
        .map(|f| {
            let bytes = f.content.as_deref().unwrap_or("").as_bytes();
            let started = Instant::now();
            let size = compressed_size(bytes);
            if started.elapsed() > timeout {
                (f, None)
            } else {
                (f, Some(size))
            }
        })
        .collect();

    let mut analysis = CloneAnalysis::default();
    let mut candidates: Vec<Candidate> = Vec::new();
    for (fact, size) in &measured {
        let bytes = fact.content.as_deref().unwrap_or("").as_bytes();
        let Some(compressed) = *size else {
            warn!("Compression of {} timed out, withholding its signals", fact.path);
            analysis.timed_out.push(fact.path.clone());
            continue;
        };
        let ratio = if bytes.len() < MIN_RATIO_BYTES {
            0.0
        } else {
            (compressed as f64 / bytes.len() as f64).min(1.0)
        };
        analysis.compression_ratios.insert(fact.path.clone(), ratio);

        if fact.lines >= config.min_lines && bytes.len() >= config.min_bytes {
            candidates.push(Candidate {
                path: &fact.path,
                role: fact.role(),
                bytes,
                compressed,
            });
        }
    }

    if candidates.len() > config.max_files {
        debug!(
            "Clone detection limited to the {} largest of {} files",
            config.max_files,
            candidates.len()
        );
        candidates.sort_by(|a, b| b.bytes.len().cmp(&a.bytes.len()).then(a.path.cmp(b.path)));
        candidates.truncate(config.max_files);
    }
    candidates.sort_by(|a, b| a.path.cmp(b.path));

    let (pairs, timed_out, skipped) =
        compare_candidates(&candidates, config.ncd_threshold, timeout);
    analysis.pairs = pairs;
    for path in timed_out {
        warn!("Clone comparison for {} timed out", path);
        analysis.timed_out.push(path);
    }
    if skipped > 0 {
        warn!("Clone detection skipped {} pairs after timeouts", skipped);
    }
    analysis.skipped_pairs = skipped;
    analysis.timed_out.sort();
    analysis.timed_out.dedup();

    debug!(
        "Clone detection: {} candidates, {} pairs",
        candidates.len(),
        analysis.pairs.len()
    );
    analysis
}
