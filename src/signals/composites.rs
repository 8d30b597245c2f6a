//! Module and codebase composites
//!
//! ```text
//!   module health   = 0.20·cohesion + 0.15·(1−coupling) + 0.20·(1−D)
//!                   + 0.15·alignment + 0.15·role_consistency + 0.15·(1−stub)
//!   wiring_score    = 1 − (0.25·orphan + 0.25·phantom + 0.20·glue_deficit
//!                   + 0.15·stub + 0.15·clone)
//!   arch health     = 0.25·(1−violations) + 0.20·cohesion + 0.20·(1−coupling)
//!                   + 0.20·(1−D) + 0.15·alignment
//!   team_risk       = 1 − (0.30·bus/3 + 0.25·(1−knowledge_gini)
//!                   + 0.25·(1−coordination/5) + 0.20·conway)
//!   codebase_health = 0.30·arch + 0.30·wiring + 0.20·team + 0.20·modularity
//! ```
//!
//! Terms whose inputs are unavailable are dropped and the remaining weights
//! renormalized.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::fusion::{FileSignals, FusionInputs, ModuleSignals};
use super::registry::Signal;
use crate::graph::algorithms::gini;
use crate::graph::ModuleMetrics;

/// Pagerank percentile above which a file is central.
const CENTRAL_PERCENTILE: f64 = 0.75;

/// Codebase-wide scalars.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalSignals {
    pub total_files: usize,
    pub modularity: f64,
    pub community_count: usize,
    pub cycle_count: usize,
    pub centrality_gini: f64,
    pub fiedler_value: Option<f64>,
    pub spectral_gap: Option<f64>,
    pub num_components: Option<usize>,
    pub orphan_ratio: f64,
    pub phantom_ratio: f64,
    pub glue_deficit: f64,
    pub clone_ratio: Option<f64>,
    pub violation_rate: Option<f64>,
    pub layer_count: Option<usize>,
    pub conway_alignment: Option<f64>,
    pub team_size: Option<usize>,
    pub total_commits: Option<usize>,
    pub min_bus_factor_critical: Option<f64>,
    pub max_knowledge_gini: Option<f64>,
    pub mean_coordination_cost: Option<f64>,
    pub wiring_score: f64,
    pub architecture_health: Option<f64>,
    pub team_risk: Option<f64>,
    pub codebase_health: f64,
}

/// Weighted mean over the terms that are present.
fn weighted_available(terms: &[(f64, Option<f64>)]) -> Option<f64> {
    let (sum, weight) = terms
        .iter()
        .filter_map(|(w, v)| v.map(|v| (w * v, *w)))
        .fold((0.0, 0.0), |(s, ws), (v, w)| (s + v, ws + w));
    (weight > 0.0).then(|| sum / weight)
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn upper_median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    values[values.len() / 2]
}

fn is_central(fs: &FileSignals) -> bool {
    fs.percentile(Signal::Pagerank)
        .is_some_and(|p| p > CENTRAL_PERCENTILE)
}

/// Health of one module in [0,1]. Without instability the distance term is
/// dropped and the other weights scaled up.
pub fn module_health(m: &ModuleMetrics, mean_stub: f64) -> f64 {
    let base = 0.20 * m.cohesion
        + 0.15 * (1.0 - m.coupling)
        + 0.15 * m.boundary_alignment
        + 0.15 * m.role_consistency
        + 0.15 * (1.0 - mean_stub);
    let health = match m.instability {
        Some(_) => base + 0.20 * (1.0 - m.main_seq_distance),
        None => base * 1.25,
    };
    health.clamp(0.0, 1.0)
}

/// Minimum bus factor over the module's central files, else the mean.
pub fn module_bus_factor(members: &[&FileSignals]) -> Option<f64> {
    let central = members
        .iter()
        .filter(|fs| is_central(fs))
        .filter_map(|fs| fs.bus_factor)
        .reduce(f64::min);
    central.or_else(|| mean(members.iter().filter_map(|fs| fs.bus_factor)))
}

/// Share of modules without a glue file, where glue files sit above the
/// median in both betweenness and out-degree.
pub fn glue_deficit(files: &BTreeMap<String, FileSignals>) -> f64 {
    if files.is_empty() {
        return 0.0;
    }
    let betweenness_median = upper_median(files.values().map(|fs| fs.betweenness).collect());
    let out_median = upper_median(files.values().map(|fs| fs.out_degree as f64).collect());
    let glue = files
        .values()
        .filter(|fs| fs.betweenness > betweenness_median && fs.out_degree as f64 > out_median)
        .count();
    let num_modules = files
        .values()
        .map(|fs| fs.module.as_str())
        .collect::<BTreeSet<_>>()
        .len();
    let expected = (num_modules as f64).sqrt().max(1.0);
    (1.0 - glue as f64 / expected).clamp(0.0, 1.0)
}

/// Lowest bus factor among central files, else among all files.
pub fn min_bus_factor_critical(files: &BTreeMap<String, FileSignals>) -> Option<f64> {
    files
        .values()
        .filter(|fs| is_central(fs))
        .filter_map(|fs| fs.bus_factor)
        .reduce(f64::min)
        .or_else(|| files.values().filter_map(|fs| fs.bus_factor).reduce(f64::min))
}

pub(super) fn global_signals(
    files: &BTreeMap<String, FileSignals>,
    modules: &BTreeMap<String, ModuleSignals>,
    inputs: &FusionInputs<'_>,
) -> GlobalSignals {
    let structural = inputs.structural;
    let total = files.len();
    let ratio = |count: usize| {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    };

    let pageranks: Vec<f64> = files.values().map(|fs| fs.pagerank).collect();
    let mut g = GlobalSignals {
        total_files: total,
        modularity: structural.modularity,
        community_count: structural.community_count,
        cycle_count: structural.cycles.len(),
        centrality_gini: gini(&pageranks),
        orphan_ratio: ratio(files.values().filter(|fs| fs.is_orphan).count()),
        phantom_ratio: ratio(files.values().filter(|fs| fs.phantom_import_count > 0).count()),
        glue_deficit: glue_deficit(files),
        ..Default::default()
    };

    if let Some(spectral) = inputs.spectral {
        g.fiedler_value = spectral.fiedler_value;
        g.spectral_gap = spectral.spectral_gap;
        g.num_components = Some(spectral.num_components);
    }
    if let Some(clones) = inputs.clones {
        g.clone_ratio = Some(ratio(clones.files_in_clones()));
    }

    let mean_stub = mean(files.values().map(|fs| fs.stub_ratio)).unwrap_or(0.0);
    g.wiring_score = (1.0
        - (0.25 * g.orphan_ratio
            + 0.25 * g.phantom_ratio
            + 0.20 * g.glue_deficit
            + 0.15 * mean_stub
            + 0.15 * g.clone_ratio.unwrap_or(0.0)))
    .clamp(0.0, 1.0);

    if let Some(arch) = inputs.architecture {
        g.violation_rate = Some(arch.violation_rate);
        g.layer_count = Some(arch.layer_count);
        let metrics: Vec<&ModuleMetrics> = arch.modules.values().collect();
        g.architecture_health = weighted_available(&[
            (0.25, Some(1.0 - arch.violation_rate)),
            (0.20, mean(metrics.iter().map(|m| m.cohesion))),
            (0.20, mean(metrics.iter().map(|m| 1.0 - m.coupling))),
            (
                0.20,
                mean(
                    metrics
                        .iter()
                        .filter(|m| m.instability.is_some())
                        .map(|m| 1.0 - m.main_seq_distance),
                ),
            ),
            (0.15, mean(metrics.iter().map(|m| m.boundary_alignment))),
        ])
        .map(|h| h.clamp(0.0, 1.0));

        if let Some(distances) = inputs.author_distances {
            let coupled: Vec<f64> = distances
                .iter()
                .filter(|d| arch.edges_between(&d.module_a, &d.module_b) > 0)
                .map(|d| d.distance)
                .collect();
            g.conway_alignment = Some(mean(coupled).map_or(1.0, |d| (1.0 - d).clamp(0.0, 1.0)));
        }
    }

    if let Some(temporal) = inputs.temporal {
        let team = temporal.authors.len();
        g.team_size = Some(team);
        g.total_commits = Some(temporal.total_commits);
        g.min_bus_factor_critical = min_bus_factor_critical(files);
        g.max_knowledge_gini = modules
            .values()
            .filter_map(|m| m.knowledge_gini)
            .reduce(f64::max);
        g.mean_coordination_cost = mean(modules.values().filter_map(|m| m.coordination_cost));

        let protection = weighted_available(&[
            (0.30, g.min_bus_factor_critical.map(|b| b.min(3.0) / 3.0)),
            (0.25, g.max_knowledge_gini.map(|k| 1.0 - k)),
            (0.25, g.mean_coordination_cost.map(|c| 1.0 - c.min(5.0) / 5.0)),
            (0.20, Some(g.conway_alignment.unwrap_or(1.0))),
        ]);
        g.team_risk = protection.map(|p| (1.0 - p).clamp(0.0, 1.0));
    }

    let team_term = match (g.team_size, g.min_bus_factor_critical) {
        (Some(team), Some(bus)) => Some((bus.min(team as f64) / team.max(1) as f64).clamp(0.0, 1.0)),
        _ => None,
    };
    g.codebase_health = weighted_available(&[
        (0.30, g.architecture_health),
        (0.30, Some(g.wiring_score)),
        (0.20, team_term),
        (0.20, Some(g.modularity.clamp(0.0, 1.0))),
    ])
    .unwrap_or(0.0);

    g
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, module: &str) -> FileSignals {
        FileSignals {
            path: path.to_string(),
            module: module.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_weighted_available_renormalizes() {
        assert_eq!(weighted_available(&[(0.5, Some(1.0)), (0.5, None)]), Some(1.0));
        assert_eq!(weighted_available(&[(0.5, None)]), None);
    }

    #[test]
    fn test_module_health_without_instability() {
        let m = ModuleMetrics {
            cohesion: 1.0,
            coupling: 0.0,
            boundary_alignment: 1.0,
            role_consistency: 1.0,
            instability: None,
            ..Default::default()
        };
        // 0.80 * 1.25
        assert!((module_health(&m, 0.0) - 1.0).abs() < 1e-9);
        let with_i = ModuleMetrics {
            instability: Some(0.5),
            main_seq_distance: 0.5,
            ..m
        };
        assert!((module_health(&with_i, 0.0) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_module_bus_factor_falls_back_to_mean() {
        let mut a = file("m/a.py", "m");
        a.bus_factor = Some(1.0);
        let mut b = file("m/b.py", "m");
        b.bus_factor = Some(3.0);
        assert_eq!(module_bus_factor(&[&a, &b]), Some(2.0));
        b.percentiles.insert(Signal::Pagerank, 0.9);
        assert_eq!(module_bus_factor(&[&a, &b]), Some(3.0));
        assert_eq!(module_bus_factor(&[]), None);
    }

    #[test]
    fn test_glue_deficit() {
        let mut files = BTreeMap::new();
        for (i, m) in ["a", "b", "c", "d"].iter().enumerate() {
            let fs = file(&format!("{}/f{}.py", m, i), m);
            files.insert(fs.path.clone(), fs);
        }
        // no glue at all
        assert_eq!(glue_deficit(&files), 1.0);

        let hub = FileSignals {
            betweenness: 0.5,
            out_degree: 3,
            ..file("a/hub.py", "a")
        };
        files.insert(hub.path.clone(), hub);
        // one glue file against sqrt(4) expected
        assert!((glue_deficit(&files) - 0.5).abs() < 1e-9);
    }
}
