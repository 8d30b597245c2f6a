//! Shared finder helpers

use std::path::Path;

use crate::models::FileRole;
use crate::signals::{Polarity, SignalField};

/// Mean normalized margin past threshold over the triggering conditions.
///
/// Each condition is `(actual, threshold, polarity)`. For `HighIsBad` the
/// margin is `(actual − t) / (1 − t)` on unit-scale thresholds and
/// `(actual − t) / t` on thresholds of 1 or more (counts, lifts, ratios of
/// means). For `HighIsGood` it is `(t − actual) / t`. Margins are clamped to
/// [0, 1]; neutral conditions count as zero. No conditions gives 0.
pub fn margin_confidence(conditions: &[(f64, f64, Polarity)]) -> f64 {
    if conditions.is_empty() {
        return 0.0;
    }
    let total: f64 = conditions
        .iter()
        .map(|&(actual, threshold, polarity)| {
            let margin = match polarity {
                Polarity::HighIsBad if threshold < 1.0 => (actual - threshold) / (1.0 - threshold),
                Polarity::HighIsBad => (actual - threshold) / threshold,
                Polarity::HighIsGood if threshold > 0.0 => (threshold - actual) / threshold,
                _ => 0.0,
            };
            if margin.is_finite() {
                margin.clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
        .sum();
    total / conditions.len() as f64
}

/// File name without extension.
pub fn file_stem(path: &str) -> &str {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
}

/// File name with extension.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Whether any test file's stem mentions this file's stem.
pub fn has_test_file(field: &SignalField, path: &str) -> bool {
    let stem = file_stem(path).to_ascii_lowercase();
    if stem.is_empty() {
        return false;
    }
    field.files.values().any(|fs| {
        fs.role == FileRole::Test
            && fs.path != path
            && file_stem(&fs.path).to_ascii_lowercase().contains(&stem)
    })
}

/// `__init__.py` style package markers, which are expected to be thin.
pub fn is_package_marker(path: &str) -> bool {
    matches!(file_name(path), "__init__.py" | "mod.rs" | "index.ts" | "index.js")
}

pub fn percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}
