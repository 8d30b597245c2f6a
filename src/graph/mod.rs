//! Structural analysis of the file dependency graph
//!
//! ```text
//!   FileFacts ──► DependencyGraph ──► StructuralAnalysis
//!                   │  import/call edges     pagerank, betweenness,
//!                   │  phantom imports       blast radius, depth, SCCs,
//!                   │  broken calls          communities, orphans
//!                   ▼
//!          spectral / modules / clones
//! ```
//!
//! Edges only exist between files that were scanned. Anything a file imports
//! that does not resolve to a scanned file is a phantom import and becomes a
//! per-file signal instead of an edge.

pub mod algorithms;
pub mod clones;
pub mod modules;
pub mod spectral;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::error::PipelineResult;
use crate::models::{FileFact, FileRole};

pub use clones::{CloneAnalysis, ClonePair};
pub use modules::{ArchitectureAnalysis, BoundaryMismatch, LayerViolation, ModuleMetrics};
pub use spectral::SpectralSummary;

/// Kind of dependency an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Import,
    Call,
}

/// One typed edge of the dependency multigraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub source: usize,
    pub target: usize,
    pub kind: EdgeKind,
    /// Number of symbols imported or call sites
    pub weight: u32,
}

/// Directed multigraph over scanned file paths.
///
/// Nodes are indexed in sorted path order. Immutable after [`build`](Self::build).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraph {
    paths: Vec<String>,
    #[serde(skip)]
    index: FxHashMap<String, usize>,
    edges: Vec<DependencyEdge>,
    /// Unique successors per node, sorted
    successors: Vec<Vec<usize>>,
    /// Unique predecessors per node, sorted
    predecessors: Vec<Vec<usize>>,
    phantom_imports: Vec<Vec<String>>,
    broken_calls: Vec<usize>,
    import_counts: Vec<usize>,
}

impl DependencyGraph {
    /// Build the graph from scanner facts.
    ///
    /// Duplicate paths keep the first fact. Self imports are dropped.
    pub fn build(facts: &[FileFact]) -> Self {
        let mut ordered: Vec<&FileFact> = facts.iter().collect();
        ordered.sort_by(|a, b| a.path.cmp(&b.path));
        ordered.dedup_by(|b, a| {
            if a.path == b.path {
                warn!("Duplicate file fact for {}, keeping the first", a.path);
                true
            } else {
                false
            }
        });

        let paths: Vec<String> = ordered.iter().map(|f| f.path.clone()).collect();
        let index: FxHashMap<String, usize> = paths
            .iter()
            .enumerate()
            .map(|(i, p)| (p.clone(), i))
            .collect();

        let n = paths.len();
        let mut merged: FxHashMap<(usize, usize, EdgeKind), u32> = FxHashMap::default();
        let mut phantom_imports: Vec<Vec<String>> = vec![vec![]; n];
        let mut broken_calls = vec![0usize; n];
        let mut import_counts = vec![0usize; n];

        for (source, fact) in ordered.iter().enumerate() {
            import_counts[source] = fact.imports.len() + fact.unresolved_imports.len();
            for import in &fact.imports {
                match index.get(&import.path) {
                    Some(&target) if target != source => {
                        *merged
                            .entry((source, target, EdgeKind::Import))
                            .or_insert(0) += import.symbols.max(1);
                    }
                    Some(_) => {}
                    None => phantom_imports[source].push(import.path.clone()),
                }
            }
            phantom_imports[source].extend(fact.unresolved_imports.iter().cloned());
            phantom_imports[source].sort();
            phantom_imports[source].dedup();

            for call in &fact.calls {
                match index.get(&call.target) {
                    Some(&target) if target != source => {
                        *merged.entry((source, target, EdgeKind::Call)).or_insert(0) +=
                            call.count.max(1);
                    }
                    Some(_) => {}
                    None => broken_calls[source] += call.count.max(1) as usize,
                }
            }
        }

        let mut edges: Vec<DependencyEdge> = merged
            .into_iter()
            .map(|((source, target, kind), weight)| DependencyEdge {
                source,
                target,
                kind,
                weight,
            })
            .collect();
        edges.sort_by_key(|e| (e.source, e.target, e.kind));

        let mut successors: Vec<Vec<usize>> = vec![vec![]; n];
        let mut predecessors: Vec<Vec<usize>> = vec![vec![]; n];
        for edge in &edges {
            successors[edge.source].push(edge.target);
            predecessors[edge.target].push(edge.source);
        }
        for list in successors.iter_mut().chain(predecessors.iter_mut()) {
            list.sort_unstable();
            list.dedup();
        }

        debug!("Built dependency graph: {} files, {} edges", n, edges.len());

        Self {
            paths,
            index,
            edges,
            successors,
            predecessors,
            phantom_imports,
            broken_calls,
            import_counts,
        }
    }

    pub fn node_count(&self) -> usize {
        self.paths.len()
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn path(&self, node: usize) -> &str {
        &self.paths[node]
    }

    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.index.get(path).copied()
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    pub fn successors(&self, node: usize) -> &[usize] {
        &self.successors[node]
    }

    pub fn predecessors(&self, node: usize) -> &[usize] {
        &self.predecessors[node]
    }

    /// Neighbours in either direction, sorted and unique.
    pub fn neighbors(&self, node: usize) -> Vec<usize> {
        let mut all: Vec<usize> = self.successors[node]
            .iter()
            .chain(self.predecessors[node].iter())
            .copied()
            .collect();
        all.sort_unstable();
        all.dedup();
        all
    }

    /// Whether `source` depends directly on `target`.
    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        match (self.index_of(source), self.index_of(target)) {
            (Some(s), Some(t)) => self.successors[s].binary_search(&t).is_ok(),
            _ => false,
        }
    }

    /// Whether there is an edge in either direction between two files.
    pub fn connected(&self, a: &str, b: &str) -> bool {
        self.has_edge(a, b) || self.has_edge(b, a)
    }

    /// Collapsed simple edge list for the graph algorithms.
    pub fn simple_edges(&self) -> Vec<(u32, u32)> {
        self.successors
            .iter()
            .enumerate()
            .flat_map(|(s, targets)| targets.iter().map(move |&t| (s as u32, t as u32)))
            .collect()
    }

    pub fn phantom_imports(&self, node: usize) -> &[String] {
        &self.phantom_imports[node]
    }

    pub fn broken_calls(&self, node: usize) -> usize {
        self.broken_calls[node]
    }

    pub fn import_count(&self, node: usize) -> usize {
        self.import_counts[node]
    }

    /// Imported-target weights, used as an import fingerprint.
    pub fn import_fingerprint(&self, node: usize) -> FxHashMap<usize, f64> {
        let mut fingerprint = FxHashMap::default();
        for edge in self.edges.iter().filter(|e| e.source == node) {
            *fingerprint.entry(edge.target).or_insert(0.0) += f64::from(edge.weight);
        }
        fingerprint
    }
}

/// Graph-position metrics of one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileStructure {
    pub pagerank: f64,
    pub betweenness: f64,
    pub in_degree: usize,
    pub out_degree: usize,
    pub blast_radius_size: usize,
    /// Distance from the nearest entry point
    pub depth: Option<usize>,
    pub is_orphan: bool,
    pub community: usize,
    pub phantom_import_count: usize,
    pub broken_call_count: usize,
    pub import_count: usize,
    pub role: FileRole,
}

/// Everything the structural analyzer derives from the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuralAnalysis {
    pub graph: DependencyGraph,
    /// Indexed like the graph nodes
    pub files: Vec<FileStructure>,
    /// Dependency cycles (SCCs with more than one member), as paths
    pub cycles: Vec<Vec<String>>,
    pub modularity: f64,
    pub community_count: usize,
    pub entry_points: Vec<String>,
}

impl StructuralAnalysis {
    pub fn file(&self, path: &str) -> Option<&FileStructure> {
        self.graph.index_of(path).map(|i| &self.files[i])
    }
}

/// Run the structural analyzer.
pub fn analyze_structure(
    facts: &[FileFact],
    config: &AnalysisConfig,
) -> PipelineResult<StructuralAnalysis> {
    let graph = DependencyGraph::build(facts);
    let n = graph.node_count();
    let edges = graph.simple_edges();

    let roles: Vec<FileRole> = {
        let by_path: FxHashMap<&str, &FileFact> =
            facts.iter().map(|f| (f.path.as_str(), f)).collect();
        graph
            .paths()
            .iter()
            .map(|p| by_path.get(p.as_str()).map_or(FileRole::Source, |f| f.role()))
            .collect()
    };

    let pagerank = algorithms::pagerank(
        &edges,
        n,
        config.pagerank.damping,
        config.pagerank.max_iterations,
        config.pagerank.tolerance,
    )?;
    let betweenness = algorithms::betweenness_centrality(&edges, n)?;
    let blast = algorithms::blast_radius(&edges, n)?;
    let (communities, modularity) = algorithms::louvain(&edges, n)?;

    let cycles: Vec<Vec<String>> = algorithms::find_cycles(&edges, n, 2)?
        .into_iter()
        .map(|scc| {
            scc.into_iter()
                .map(|i| graph.path(i as usize).to_string())
                .collect()
        })
        .collect();

    let mut entry_points: Vec<usize> = (0..n)
        .filter(|&i| roles[i] == FileRole::EntryPoint)
        .collect();
    if entry_points.is_empty() {
        entry_points = (0..n)
            .filter(|&i| graph.predecessors(i).is_empty() && !graph.successors(i).is_empty())
            .collect();
    }
    let depth = algorithms::dag_depth(&edges, n, &entry_points)?;

    let files: Vec<FileStructure> = (0..n)
        .map(|i| {
            let in_degree = graph.predecessors(i).len();
            FileStructure {
                pagerank: pagerank[i],
                betweenness: betweenness[i],
                in_degree,
                out_degree: graph.successors(i).len(),
                blast_radius_size: blast[i],
                depth: depth[i],
                is_orphan: in_degree == 0 && !roles[i].may_be_unreferenced(),
                community: communities[i],
                phantom_import_count: graph.phantom_imports(i).len(),
                broken_call_count: graph.broken_calls(i),
                import_count: graph.import_count(i),
                role: roles[i],
            }
        })
        .collect();

    let community_count = communities.iter().copied().max().map_or(0, |c| c + 1);
    debug!(
        "Structural analysis: {} cycles, {} communities (Q = {:.3})",
        cycles.len(),
        community_count,
        modularity
    );

    Ok(StructuralAnalysis {
        entry_points: entry_points
            .into_iter()
            .map(|i| graph.path(i).to_string())
            .collect(),
        graph,
        files,
        cycles,
        modularity,
        community_count,
    })
}
