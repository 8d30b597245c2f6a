//! Module-level architecture: Martin metrics, layering and boundaries
//!
//! A module is the parent directory of a file. The file graph is contracted
//! onto modules, then:
//!
//! 1. Ca/Ce, instability, abstractness and main-sequence distance per module
//! 2. A greedy minimum feedback-arc-set ordering of the module graph. Edges
//!    running against the order are layer violations; the rest form a DAG
//!    whose longest-path depth is the layer (0 = foundation).
//! 3. Boundary alignment against the Louvain communities, with misplaced
//!    files for poorly aligned modules.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::StructuralAnalysis;
use crate::models::{parent_dir, FileFact, FileRole};

/// Alignment below which a module is a boundary-mismatch candidate.
const ALIGNMENT_THRESHOLD: f64 = 0.7;

/// Martin metrics and boundary data of one module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleMetrics {
    pub path: String,
    pub files: Vec<String>,
    pub file_count: usize,
    /// Incoming cross-module file edges
    pub afferent: usize,
    /// Outgoing cross-module file edges
    pub efferent: usize,
    /// Ce / (Ca + Ce); `None` for isolated modules
    pub instability: Option<f64>,
    pub abstractness: f64,
    /// |A + I − 1|, 0 when instability is undefined
    pub main_seq_distance: f64,
    pub cohesion: f64,
    pub coupling: f64,
    pub role_consistency: f64,
    pub dominant_role: FileRole,
    pub boundary_alignment: f64,
    pub dominant_community: usize,
    pub layer: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationKind {
    /// A lower layer depends on a higher one
    Backward,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationKind::Backward => write!(f, "backward"),
        }
    }
}

/// A module dependency running against the inferred layering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerViolation {
    pub source_module: String,
    pub target_module: String,
    pub source_layer: usize,
    pub target_layer: usize,
    pub kind: ViolationKind,
    /// File-level edges behind this module edge
    pub edge_count: usize,
}

/// A module whose files cluster into communities owned by other modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryMismatch {
    pub module_path: String,
    pub alignment: f64,
    /// (file, module where the file's community is dominant)
    pub misplaced_files: Vec<(String, String)>,
    /// community id -> files of this module in it
    pub community_distribution: BTreeMap<usize, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureAnalysis {
    pub modules: BTreeMap<String, ModuleMetrics>,
    /// (source module, target module) -> file edge count
    pub module_edges: BTreeMap<(String, String), usize>,
    pub violations: Vec<LayerViolation>,
    /// Violating cross-module file edges / all cross-module file edges
    pub violation_rate: f64,
    pub layer_count: usize,
    pub boundary_mismatches: Vec<BoundaryMismatch>,
}

impl ArchitectureAnalysis {
    pub fn module_of<'a>(&'a self, file: &str) -> Option<&'a ModuleMetrics> {
        self.modules.get(&parent_dir(file))
    }

    /// File edges between two modules, both directions.
    pub fn edges_between(&self, a: &str, b: &str) -> usize {
        let key = |s: &str, t: &str| (s.to_string(), t.to_string());
        self.module_edges.get(&key(a, b)).copied().unwrap_or(0)
            + self.module_edges.get(&key(b, a)).copied().unwrap_or(0)
    }

    /// Share of the two modules' outgoing cross-module edges that connect them.
    pub fn pair_coupling(&self, a: &str, b: &str) -> f64 {
        let efferent = |m: &str| self.modules.get(m).map_or(0, |mm| mm.efferent);
        let denom = efferent(a) + efferent(b);
        if denom == 0 {
            return 0.0;
        }
        (self.edges_between(a, b) as f64 / denom as f64).min(1.0)
    }
}

/// Contract the file graph onto directory modules and compute their metrics.
pub fn analyze_architecture(
    facts: &[FileFact],
    structural: &StructuralAnalysis,
) -> ArchitectureAnalysis {
    let graph = &structural.graph;
    let facts_by_path: FxHashMap<&str, &FileFact> =
        facts.iter().map(|f| (f.path.as_str(), f)).collect();

    let module_of: Vec<String> = graph.paths().iter().map(|p| parent_dir(p)).collect();
    let mut members: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (node, module) in module_of.iter().enumerate() {
        members.entry(module.clone()).or_default().push(node);
    }

    let mut module_edges: BTreeMap<(String, String), usize> = BTreeMap::new();
    let mut internal_edges: FxHashMap<&str, usize> = FxHashMap::default();
    let mut afferent: FxHashMap<&str, usize> = FxHashMap::default();
    let mut efferent: FxHashMap<&str, usize> = FxHashMap::default();
    for (source, target) in graph.simple_edges() {
        let (sm, tm) = (&module_of[source as usize], &module_of[target as usize]);
        if sm == tm {
            *internal_edges.entry(sm.as_str()).or_insert(0) += 1;
        } else {
            *module_edges.entry((sm.clone(), tm.clone())).or_insert(0) += 1;
            *efferent.entry(sm.as_str()).or_insert(0) += 1;
            *afferent.entry(tm.as_str()).or_insert(0) += 1;
        }
    }

    let mut modules: BTreeMap<String, ModuleMetrics> = BTreeMap::new();
    for (path, nodes) in &members {
        let n = nodes.len();
        let ca = afferent.get(path.as_str()).copied().unwrap_or(0);
        let ce = efferent.get(path.as_str()).copied().unwrap_or(0);
        let internal = internal_edges.get(path.as_str()).copied().unwrap_or(0);

        let instability = if ca + ce == 0 {
            None
        } else {
            Some(ce as f64 / (ca + ce) as f64)
        };

        let (classes, abstracts) = nodes.iter().fold((0usize, 0usize), |(c, a), &i| {
            facts_by_path
                .get(graph.path(i))
                .map_or((c, a), |f| (c + f.class_count, a + f.abstract_class_count))
        });
        let abstractness = if classes == 0 {
            0.0
        } else {
            (abstracts as f64 / classes as f64).min(1.0)
        };
        let main_seq_distance = instability.map_or(0.0, |i| (abstractness + i - 1.0).abs());

        let cohesion = if n < 2 {
            0.0
        } else {
            internal as f64 / (n * (n - 1)) as f64
        };
        let coupling = if internal + ca + ce == 0 {
            0.0
        } else {
            (ca + ce) as f64 / (internal + ca + ce) as f64
        };

        let (dominant_role, role_count) =
            dominant(nodes.iter().map(|&i| structural.files[i].role));
        let (dominant_community, community_count) =
            dominant(nodes.iter().map(|&i| structural.files[i].community));

        modules.insert(
            path.clone(),
            ModuleMetrics {
                path: path.clone(),
                files: nodes.iter().map(|&i| graph.path(i).to_string()).collect(),
                file_count: n,
                afferent: ca,
                efferent: ce,
                instability,
                abstractness,
                main_seq_distance,
                cohesion,
                coupling,
                role_consistency: role_count as f64 / n as f64,
                dominant_role,
                boundary_alignment: community_count as f64 / n as f64,
                dominant_community,
                layer: 0,
            },
        );
    }

    let names: Vec<String> = modules.keys().cloned().collect();
    let order = feedback_arc_order(&names, &module_edges);
    let position: BTreeMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, m)| (m.as_str(), i))
        .collect();

    // Forward edges form a DAG; layer = longest path down to a sink
    let mut layers: BTreeMap<&str, usize> = names.iter().map(|m| (m.as_str(), 0)).collect();
    for module in order.iter().rev() {
        let depth = module_edges
            .keys()
            .filter(|(s, t)| s == module && position[t.as_str()] > position[s.as_str()])
            .map(|(_, t)| layers[t.as_str()] + 1)
            .max()
            .unwrap_or(0);
        layers.insert(module.as_str(), depth);
    }

    let mut violations = Vec::new();
    let mut violating_edges = 0usize;
    for ((source, target), &count) in &module_edges {
        if position[source.as_str()] > position[target.as_str()] {
            violating_edges += count;
            violations.push(LayerViolation {
                source_module: source.clone(),
                target_module: target.clone(),
                source_layer: layers[source.as_str()],
                target_layer: layers[target.as_str()],
                kind: ViolationKind::Backward,
                edge_count: count,
            });
        }
    }
    let cross_edges: usize = module_edges.values().sum();
    let violation_rate = if cross_edges == 0 {
        0.0
    } else {
        violating_edges as f64 / cross_edges as f64
    };

    for (path, metrics) in modules.iter_mut() {
        metrics.layer = layers[path.as_str()];
    }
    let layer_count = modules.values().map(|m| m.layer + 1).max().unwrap_or(0);

    let boundary_mismatches = boundary_mismatches(&modules, &members, structural);

    debug!(
        "Architecture: {} modules, {} layers, {} violations (rate {:.3})",
        modules.len(),
        layer_count,
        violations.len(),
        violation_rate
    );

    ArchitectureAnalysis {
        modules,
        module_edges,
        violations,
        violation_rate,
        layer_count,
        boundary_mismatches,
    }
}

/// Most frequent value and its count; ties go to the smallest value.
fn dominant<T: Ord + Copy + Default>(values: impl Iterator<Item = T>) -> (T, usize) {
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .fold((T::default(), 0), |best, (v, c)| if c > best.1 { (v, c) } else { best })
}

/// Eades–Lin–Smyth greedy ordering.
///
/// Sinks are peeled to the back and sources to the front; otherwise the node
/// with the largest (out − in) weight goes to the front. Edges that point
/// backwards in the result approximate a minimum feedback arc set.
fn feedback_arc_order(
    names: &[String],
    edges: &BTreeMap<(String, String), usize>,
) -> Vec<String> {
    let mut remaining: BTreeSet<&str> = names.iter().map(String::as_str).collect();
    let mut front: Vec<String> = Vec::new();
    let mut back: Vec<String> = Vec::new();

    let weight_in = |node: &str, remaining: &BTreeSet<&str>| -> usize {
        edges
            .iter()
            .filter(|((s, t), _)| t == node && remaining.contains(s.as_str()))
            .map(|(_, w)| *w)
            .sum()
    };
    let weight_out = |node: &str, remaining: &BTreeSet<&str>| -> usize {
        edges
            .iter()
            .filter(|((s, t), _)| s == node && remaining.contains(t.as_str()))
            .map(|(_, w)| *w)
            .sum()
    };

    while !remaining.is_empty() {
        loop {
            let sink = remaining
                .iter()
                .copied()
                .find(|n| weight_out(*n, &remaining) == 0);
            match sink {
                Some(n) => {
                    remaining.remove(n);
                    back.push(n.to_string());
                }
                None => break,
            }
        }
        loop {
            let source = remaining
                .iter()
                .copied()
                .find(|n| weight_in(*n, &remaining) == 0);
            match source {
                Some(n) => {
                    remaining.remove(n);
                    front.push(n.to_string());
                }
                None => break,
            }
        }
        let pick = remaining.iter().copied().max_by(|a, b| {
            let da = weight_out(*a, &remaining) as i64 - weight_in(*a, &remaining) as i64;
            let db = weight_out(*b, &remaining) as i64 - weight_in(*b, &remaining) as i64;
            // on ties prefer the lexicographically smaller module
            da.cmp(&db).then_with(|| b.cmp(a))
        });
        if let Some(n) = pick {
            remaining.remove(n);
            front.push(n.to_string());
        }
    }

    back.reverse();
    front.extend(back);
    front
}

fn boundary_mismatches(
    modules: &BTreeMap<String, ModuleMetrics>,
    members: &BTreeMap<String, Vec<usize>>,
    structural: &StructuralAnalysis,
) -> Vec<BoundaryMismatch> {
    // community -> module where it is dominant, preferring the module with
    // the most files of that community
    let mut home: BTreeMap<usize, (&str, usize)> = BTreeMap::new();
    for (path, nodes) in members {
        let Some(metrics) = modules.get(path) else {
            continue;
        };
        let count = nodes
            .iter()
            .filter(|&&i| structural.files[i].community == metrics.dominant_community)
            .count();
        let entry = home
            .entry(metrics.dominant_community)
            .or_insert((path.as_str(), count));
        if count > entry.1 {
            *entry = (path.as_str(), count);
        }
    }

    let mut mismatches = Vec::new();
    for (path, metrics) in modules {
        if metrics.file_count <= 2 || metrics.boundary_alignment >= ALIGNMENT_THRESHOLD {
            continue;
        }
        let nodes = &members[path];
        let mut distribution: BTreeMap<usize, usize> = BTreeMap::new();
        let mut misplaced = Vec::new();
        for &i in nodes {
            let community = structural.files[i].community;
            *distribution.entry(community).or_insert(0) += 1;
            if community == metrics.dominant_community {
                continue;
            }
            if let Some((target, _)) = home.get(&community) {
                if *target != path.as_str() {
                    misplaced.push((structural.graph.path(i).to_string(), target.to_string()));
                }
            }
        }
        mismatches.push(BoundaryMismatch {
            module_path: path.clone(),
            alignment: metrics.boundary_alignment,
            misplaced_files: misplaced,
            community_distribution: distribution,
        });
    }
    mismatches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::graph::analyze_structure;
    use crate::graph::test_support::fact;

    fn analyze(facts: &[FileFact]) -> ArchitectureAnalysis {
        let structural = analyze_structure(facts, &AnalysisConfig::default()).unwrap();
        analyze_architecture(facts, &structural)
    }

    #[test]
    fn test_instability_none_for_isolated_module() {
        let facts = vec![
            fact("api/routes.py", &["core/models.py"]),
            fact("core/models.py", &[]),
            fact("lonely/a.py", &["lonely/b.py"]),
            fact("lonely/b.py", &[]),
        ];
        let arch = analyze(&facts);
        assert_eq!(arch.modules["lonely"].instability, None);
        assert_eq!(arch.modules["lonely"].main_seq_distance, 0.0);
        assert_eq!(arch.modules["api"].instability, Some(1.0));
        assert_eq!(arch.modules["core"].instability, Some(0.0));
        assert_eq!(arch.modules["lonely"].cohesion, 0.5);
    }

    #[test]
    fn test_layers_follow_dependencies() {
        let facts = vec![
            fact("api/routes.py", &["service/logic.py"]),
            fact("service/logic.py", &["core/models.py"]),
            fact("core/models.py", &[]),
        ];
        let arch = analyze(&facts);
        assert_eq!(arch.modules["core"].layer, 0);
        assert_eq!(arch.modules["service"].layer, 1);
        assert_eq!(arch.modules["api"].layer, 2);
        assert!(arch.violations.is_empty());
        assert_eq!(arch.violation_rate, 0.0);
        assert_eq!(arch.layer_count, 3);
    }

    #[test]
    fn test_back_edge_is_violation() {
        let facts = vec![
            fact("api/routes.py", &["core/models.py"]),
            fact("api/views.py", &["core/models.py"]),
            fact("core/models.py", &[]),
            fact("core/helpers.py", &["api/views.py"]),
        ];
        let arch = analyze(&facts);
        assert_eq!(arch.violations.len(), 1);
        let v = &arch.violations[0];
        assert_eq!(v.source_module, "core");
        assert_eq!(v.target_module, "api");
        assert_eq!(v.kind, ViolationKind::Backward);
        assert!((arch.violation_rate - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_abstractness() {
        let mut a = fact("pkg/base.py", &[]);
        a.class_count = 2;
        a.abstract_class_count = 1;
        let mut b = fact("pkg/impl.py", &["pkg/base.py"]);
        b.class_count = 2;
        let arch = analyze(&[a, b]);
        assert!((arch.modules["pkg"].abstractness - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_pair_coupling() {
        let facts = vec![
            fact("a/x.py", &["b/y.py"]),
            fact("a/z.py", &["c/w.py"]),
            fact("b/y.py", &[]),
            fact("c/w.py", &[]),
        ];
        let arch = analyze(&facts);
        assert_eq!(arch.edges_between("a", "b"), 1);
        assert!((arch.pair_coupling("a", "b") - 0.5).abs() < 1e-9);
        assert_eq!(arch.pair_coupling("b", "c"), 0.0);
    }

    #[test]
    fn test_dominant_tie_goes_to_smallest() {
        let (value, count) = dominant(vec![3usize, 1, 3, 1].into_iter());
        assert_eq!((value, count), (1, 2));
    }
}
