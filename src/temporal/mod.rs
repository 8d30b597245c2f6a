//! Temporal analysis of the version-control history
//!
//! ```text
//!   GitHistory ──► churn series, trajectory     (churn)
//!              ──► co-change matrix             (cochange)
//!              ──► author entropy, bus factor   (authorship)
//!              ──► fix / refactor ratios        (intent)
//! ```
//!
//! Skipped entirely (returns `None`) when the history has fewer than
//! `min_commits` commits.

pub mod authorship;
pub mod churn;
pub mod cochange;
pub mod intent;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TemporalConfig;
use crate::models::{CommitIntent, GitHistory};

pub use authorship::AuthorDistance;
pub use churn::{ChurnSeries, Trajectory};
pub use cochange::{CoChangeMatrix, CoChangePair};

/// Temporal signals of one scanned file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileTemporal {
    pub churn: ChurnSeries,
    /// Touch count per author
    pub authors: BTreeMap<String, usize>,
    pub author_entropy: f64,
    pub bus_factor: f64,
    pub fix_ratio: f64,
    pub refactor_ratio: f64,
    pub last_change: i64,
}

impl FileTemporal {
    pub fn total_changes(&self) -> usize {
        self.churn.total_changes
    }
}

/// Temporal module-level aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleTemporal {
    /// Commits per week touching the module
    pub velocity: f64,
    /// Distinct authors per commit touching the module
    pub coordination_cost: f64,
    /// Gini of per-author commit counts
    pub knowledge_gini: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalAnalysis {
    /// Scanned files touched by at least one commit
    pub files: BTreeMap<String, FileTemporal>,
    pub modules: BTreeMap<String, ModuleTemporal>,
    pub total_commits: usize,
    pub span_days: i64,
    pub authors: BTreeSet<String>,
    pub num_windows: usize,
}

impl TemporalAnalysis {
    /// Total changes of a scanned file, 0 when never touched.
    pub fn changes(&self, file: &str) -> usize {
        self.files.get(file).map_or(0, FileTemporal::total_changes)
    }
}

/// Run the temporal analyzer over the scanned file set.
pub fn analyze_temporal(
    history: &GitHistory,
    scanned: &BTreeSet<String>,
    config: &TemporalConfig,
) -> Option<TemporalAnalysis> {
    if history.total_commits() < config.min_commits {
        info!(
            "Temporal analysis disabled: {} commits (minimum {})",
            history.total_commits(),
            config.min_commits
        );
        return None;
    }

    let origin = history.commits.iter().map(|c| c.timestamp).min()?;
    let newest = history.commits.iter().map(|c| c.timestamp).max()?;
    let window_secs = churn::window_seconds(config.window_weeks);
    if window_secs <= 0 {
        return None;
    }
    let num_windows = ((newest - origin) / window_secs + 1) as usize;

    #[derive(Default)]
    struct Accumulator {
        windows: Vec<u32>,
        authors: BTreeMap<String, usize>,
        fixes: usize,
        refactors: usize,
        commits: usize,
        last_change: i64,
    }

    let mut acc: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for commit in &history.commits {
        let window = churn::window_index(commit.timestamp, origin, window_secs, num_windows);
        let intent = intent::resolve_intent(commit);
        for file in commit.files.iter().filter(|f| scanned.contains(*f)) {
            let entry = acc.entry(file.as_str()).or_insert_with(|| Accumulator {
                windows: vec![0; num_windows],
                ..Default::default()
            });
            entry.windows[window] += 1;
            *entry.authors.entry(commit.author.clone()).or_insert(0) += 1;
            entry.commits += 1;
            entry.last_change = entry.last_change.max(commit.timestamp);
            match intent {
                CommitIntent::Fix => entry.fixes += 1,
                CommitIntent::Refactor => entry.refactors += 1,
                _ => {}
            }
        }
    }

    let files: BTreeMap<String, FileTemporal> = acc
        .into_iter()
        .map(|(path, a)| {
            let commits = a.commits.max(1) as f64;
            (
                path.to_string(),
                FileTemporal {
                    churn: ChurnSeries::from_counts(a.windows),
                    author_entropy: authorship::author_entropy(&a.authors),
                    bus_factor: authorship::bus_factor(&a.authors),
                    fix_ratio: a.fixes as f64 / commits,
                    refactor_ratio: a.refactors as f64 / commits,
                    last_change: a.last_change,
                    authors: a.authors,
                },
            )
        })
        .collect();

    let modules = module_temporal(history, scanned);
    let authors: BTreeSet<String> = history.commits.iter().map(|c| c.author.clone()).collect();

    debug!(
        "Temporal analysis: {} commits, {} files touched, {} authors",
        history.total_commits(),
        files.len(),
        authors.len()
    );

    Some(TemporalAnalysis {
        files,
        modules,
        total_commits: history.total_commits(),
        span_days: history.span_days(),
        authors,
        num_windows,
    })
}

fn module_temporal(
    history: &GitHistory,
    scanned: &BTreeSet<String>,
) -> BTreeMap<String, ModuleTemporal> {
    let weeks = (history.span_days() as f64 / 7.0).max(1.0);
    // module -> (commit count, author -> commits)
    let mut per_module: BTreeMap<String, (usize, BTreeMap<&str, usize>)> = BTreeMap::new();
    for commit in &history.commits {
        let touched: BTreeSet<String> = commit
            .files
            .iter()
            .filter(|f| scanned.contains(*f))
            .map(|f| crate::models::parent_dir(f))
            .collect();
        for module in touched {
            let entry = per_module.entry(module).or_default();
            entry.0 += 1;
            *entry.1.entry(commit.author.as_str()).or_insert(0) += 1;
        }
    }

    per_module
        .into_iter()
        .map(|(module, (commits, authors))| {
            let counts: Vec<f64> = authors.values().map(|&c| c as f64).collect();
            let knowledge_gini = if counts.len() > 1 {
                crate::graph::algorithms::gini(&counts)
            } else {
                0.0
            };
            (
                module,
                ModuleTemporal {
                    velocity: commits as f64 / weeks,
                    coordination_cost: authors.len() as f64 / commits.max(1) as f64,
                    knowledge_gini,
                },
            )
        })
        .collect()
}
