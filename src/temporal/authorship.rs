//! Authorship statistics: entropy, bus factor and author distances.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::TemporalAnalysis;
use crate::graph::ArchitectureAnalysis;

/// Shannon entropy in bits of per-author touch counts.
pub fn author_entropy(counts: &BTreeMap<String, usize>) -> f64 {
    let total: usize = counts.values().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .values()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum::<f64>()
        .max(0.0)
}

/// Effective number of equally contributing authors, 2^H, within [1, authors].
pub fn bus_factor(counts: &BTreeMap<String, usize>) -> f64 {
    let authors = counts.values().filter(|&&c| c > 0).count();
    if authors <= 1 {
        return 1.0;
    }
    2f64.powf(author_entropy(counts)).clamp(1.0, authors as f64)
}

/// Weighted Jaccard distance `1 − Σmin / Σmax` between two distributions.
pub fn weighted_jaccard_distance(a: &BTreeMap<String, f64>, b: &BTreeMap<String, f64>) -> f64 {
    let mut min_sum = 0.0;
    let mut max_sum = 0.0;
    for key in a.keys().chain(b.keys().filter(|k| !a.contains_key(*k))) {
        let x = a.get(key).copied().unwrap_or(0.0);
        let y = b.get(key).copied().unwrap_or(0.0);
        min_sum += x.min(y);
        max_sum += x.max(y);
    }
    if max_sum <= 0.0 {
        return 1.0;
    }
    1.0 - min_sum / max_sum
}

/// Distance between the author populations of two modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorDistance {
    pub module_a: String,
    pub module_b: String,
    pub distance: f64,
    pub shared_authors: usize,
}

/// Per-module author share distributions.
pub fn module_author_shares(
    temporal: &TemporalAnalysis,
    architecture: &ArchitectureAnalysis,
) -> BTreeMap<String, BTreeMap<String, f64>> {
    let mut shares = BTreeMap::new();
    for (path, module) in &architecture.modules {
        let mut counts: BTreeMap<String, f64> = BTreeMap::new();
        for file in &module.files {
            if let Some(ft) = temporal.files.get(file) {
                for (author, &n) in &ft.authors {
                    *counts.entry(author.clone()).or_insert(0.0) += n as f64;
                }
            }
        }
        let total: f64 = counts.values().sum();
        if total > 0.0 {
            for v in counts.values_mut() {
                *v /= total;
            }
            shares.insert(path.clone(), counts);
        }
    }
    shares
}

/// Author distances for every module pair sharing at least one author.
///
/// Returns `None` when fewer than two authors contributed.
pub fn module_author_distances(
    temporal: &TemporalAnalysis,
    architecture: &ArchitectureAnalysis,
) -> Option<Vec<AuthorDistance>> {
    if temporal.authors.len() < 2 {
        return None;
    }
    let shares = module_author_shares(temporal, architecture);
    let modules: Vec<(&String, &BTreeMap<String, f64>)> = shares.iter().collect();

    let mut distances = Vec::new();
    for i in 0..modules.len() {
        for j in (i + 1)..modules.len() {
            let (ma, da) = modules[i];
            let (mb, db) = modules[j];
            let shared = da.keys().filter(|k| db.contains_key(*k)).count();
            if shared == 0 {
                continue;
            }
            distances.push(AuthorDistance {
                module_a: ma.clone(),
                module_b: mb.clone(),
                distance: weighted_jaccard_distance(da, db),
                shared_authors: shared,
            });
        }
    }
    Some(distances)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, usize)]) -> BTreeMap<String, usize> {
        pairs.iter().map(|(a, c)| (a.to_string(), *c)).collect()
    }

    fn shares(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(a, c)| (a.to_string(), *c)).collect()
    }

    #[test]
    fn test_single_author_bus_factor_is_one() {
        let c = counts(&[("alice", 12)]);
        assert_eq!(author_entropy(&c), 0.0);
        assert_eq!(bus_factor(&c), 1.0);
    }

    #[test]
    fn test_equal_authors() {
        let c = counts(&[("alice", 5), ("bob", 5), ("carol", 5), ("dan", 5)]);
        assert!((author_entropy(&c) - 2.0).abs() < 1e-9);
        assert!((bus_factor(&c) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_skewed_authors_between_bounds() {
        let c = counts(&[("alice", 18), ("bob", 1), ("carol", 1)]);
        let bf = bus_factor(&c);
        assert!(bf > 1.0 && bf < 3.0);
    }

    #[test]
    fn test_weighted_jaccard() {
        let a = shares(&[("alice", 0.5), ("bob", 0.5)]);
        assert_eq!(weighted_jaccard_distance(&a, &a), 0.0);
        let b = shares(&[("carol", 1.0)]);
        assert_eq!(weighted_jaccard_distance(&a, &b), 1.0);
        let c = shares(&[("alice", 1.0)]);
        // min sum 0.5, max sum 1.5
        assert!((weighted_jaccard_distance(&a, &c) - (1.0 - 1.0 / 3.0)).abs() < 1e-9);
    }
}
