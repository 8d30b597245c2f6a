// Graph algorithms over the file dependency graph.
//
// All functions take a compact edge list of (source, target) node indices and
// the node count, and return one value per node (index = node id).
//
// PARALLELIZATION:
// - PageRank: score updates parallelized per iteration
// - Betweenness: one BFS per source in parallel, partials summed in node order
//
// DETERMINISM:
// Floating point sums are always reduced sequentially in node order so two
// runs on the same input produce bit-identical results.

use petgraph::algo::tarjan_scc as petgraph_tarjan;
use petgraph::graph::DiGraph;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use thiserror::Error;

/// Invalid input to a graph algorithm.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node index {0} out of bounds (node count {1})")]
    NodeOutOfBounds(u32, u32),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

// ============================================================================
// VALIDATION HELPERS
// ============================================================================

/// Validate that all edges reference valid node indices.
fn validate_edges(edges: &[(u32, u32)], num_nodes: u32) -> Result<(), GraphError> {
    for &(src, dst) in edges {
        if src >= num_nodes {
            return Err(GraphError::NodeOutOfBounds(src, num_nodes));
        }
        if dst >= num_nodes {
            return Err(GraphError::NodeOutOfBounds(dst, num_nodes));
        }
    }
    Ok(())
}

/// Forward adjacency lists with duplicate edges and self-loops removed.
fn simple_adjacency(edges: &[(u32, u32)], num_nodes: usize) -> Vec<Vec<usize>> {
    let mut adj: Vec<Vec<usize>> = vec![vec![]; num_nodes];
    for &(src, dst) in edges {
        if src != dst {
            adj[src as usize].push(dst as usize);
        }
    }
    for list in &mut adj {
        list.sort_unstable();
        list.dedup();
    }
    adj
}

// ============================================================================
// STRONGLY CONNECTED COMPONENTS (SCC)
// ============================================================================
//
// A group of files where every file can reach every other one through imports
// is a dependency cycle. Tarjan's algorithm (via petgraph) finds them in
// O(V + E).
// ============================================================================

/// Find all strongly connected components in a directed graph.
///
/// Members of each component are sorted; components are ordered by their
/// smallest member.
pub fn find_sccs(edges: &[(u32, u32)], num_nodes: usize) -> Result<Vec<Vec<u32>>, GraphError> {
    if num_nodes == 0 {
        return Ok(vec![]);
    }
    validate_edges(edges, num_nodes as u32)?;

    let mut graph: DiGraph<(), ()> = DiGraph::new();
    let node_indices: Vec<_> = (0..num_nodes).map(|_| graph.add_node(())).collect();
    for &(src, dst) in edges {
        graph.add_edge(node_indices[src as usize], node_indices[dst as usize], ());
    }

    let mut sccs: Vec<Vec<u32>> = petgraph_tarjan(&graph)
        .into_iter()
        .map(|scc| {
            let mut members: Vec<u32> = scc.into_iter().map(|idx| idx.index() as u32).collect();
            members.sort_unstable();
            members
        })
        .collect();
    sccs.sort_by_key(|scc| scc.first().copied().unwrap_or(u32::MAX));
    Ok(sccs)
}

/// Find only the cycles (SCCs with at least `min_size` members).
pub fn find_cycles(
    edges: &[(u32, u32)],
    num_nodes: usize,
    min_size: usize,
) -> Result<Vec<Vec<u32>>, GraphError> {
    Ok(find_sccs(edges, num_nodes)?
        .into_iter()
        .filter(|scc| scc.len() >= min_size)
        .collect())
}

// ============================================================================
// PAGERANK
// ============================================================================
//
//   PR(v) = (1 - d) / N + d * (Σ_{u→v} PR(u) / out(u) + D / N)
//
// where D is the total rank held by dangling nodes (out-degree 0). Spreading
// D uniformly keeps Σ PR = 1 on every iteration.
// ============================================================================

/// Calculate PageRank scores for all nodes.
///
/// Iterates until the L1 change between iterations drops below `tolerance`
/// or `max_iterations` is reached.
pub fn pagerank(
    edges: &[(u32, u32)],
    num_nodes: usize,
    damping: f64,
    max_iterations: usize,
    tolerance: f64,
) -> Result<Vec<f64>, GraphError> {
    if num_nodes == 0 {
        return Ok(vec![]);
    }
    if !(0.0..=1.0).contains(&damping) {
        return Err(GraphError::InvalidParameter(format!(
            "damping must be in [0, 1], got {}",
            damping
        )));
    }
    if tolerance <= 0.0 {
        return Err(GraphError::InvalidParameter(format!(
            "tolerance must be positive, got {}",
            tolerance
        )));
    }
    validate_edges(edges, num_nodes as u32)?;

    let adj = simple_adjacency(edges, num_nodes);
    let mut incoming: Vec<Vec<usize>> = vec![vec![]; num_nodes];
    for (src, targets) in adj.iter().enumerate() {
        for &dst in targets {
            incoming[dst].push(src);
        }
    }
    let out_degree: Vec<usize> = adj.iter().map(Vec::len).collect();

    let n = num_nodes as f64;
    let mut scores: Vec<f64> = vec![1.0 / n; num_nodes];
    let base_score = (1.0 - damping) / n;

    for _iteration in 0..max_iterations {
        let dangling_mass: f64 = (0..num_nodes)
            .filter(|&i| out_degree[i] == 0)
            .map(|i| scores[i])
            .sum();
        let dangling_share = damping * dangling_mass / n;

        let new_scores: Vec<f64> = (0..num_nodes)
            .into_par_iter()
            .map(|node| {
                let mut score = base_score + dangling_share;
                for &neighbor in &incoming[node] {
                    score += damping * scores[neighbor] / out_degree[neighbor] as f64;
                }
                score
            })
            .collect();

        let diff: f64 = scores
            .iter()
            .zip(new_scores.iter())
            .map(|(old, new)| (old - new).abs())
            .sum();

        scores = new_scores;

        if diff < tolerance {
            break;
        }
    }

    Ok(scores)
}

// ============================================================================
// BETWEENNESS CENTRALITY (Brandes Algorithm)
// ============================================================================
//
//   BC(v) = Σ_{s≠v≠t} σ_st(v) / σ_st
//
// One BFS per source, then dependencies accumulated by backtracking from the
// farthest nodes. O(V * E) on unweighted graphs. Directed, so no halving.
// ============================================================================

/// Calculate betweenness centrality using Brandes' algorithm.
pub fn betweenness_centrality(
    edges: &[(u32, u32)],
    num_nodes: usize,
) -> Result<Vec<f64>, GraphError> {
    if num_nodes == 0 {
        return Ok(vec![]);
    }
    validate_edges(edges, num_nodes as u32)?;

    let adj = simple_adjacency(edges, num_nodes);

    let partial_scores: Vec<Vec<f64>> = (0..num_nodes)
        .into_par_iter()
        .map(|source| {
            let mut partial: Vec<f64> = vec![0.0; num_nodes];
            let mut stack: Vec<usize> = Vec::new();
            let mut predecessors: Vec<Vec<usize>> = vec![vec![]; num_nodes];
            let mut num_paths: Vec<f64> = vec![0.0; num_nodes];
            num_paths[source] = 1.0;
            let mut distance: Vec<i64> = vec![-1; num_nodes];
            distance[source] = 0;

            let mut queue: VecDeque<usize> = VecDeque::new();
            queue.push_back(source);

            while let Some(v) = queue.pop_front() {
                stack.push(v);
                for &w in &adj[v] {
                    if distance[w] < 0 {
                        distance[w] = distance[v] + 1;
                        queue.push_back(w);
                    }
                    if distance[w] == distance[v] + 1 {
                        num_paths[w] += num_paths[v];
                        predecessors[w].push(v);
                    }
                }
            }

            let mut dependency: Vec<f64> = vec![0.0; num_nodes];
            while let Some(w) = stack.pop() {
                for &v in &predecessors[w] {
                    dependency[v] += (num_paths[v] / num_paths[w]) * (1.0 + dependency[w]);
                }
                if w != source {
                    partial[w] += dependency[w];
                }
            }

            partial
        })
        .collect();

    let mut betweenness: Vec<f64> = vec![0.0; num_nodes];
    for partial in partial_scores {
        for (i, score) in partial.into_iter().enumerate() {
            betweenness[i] += score;
        }
    }

    Ok(betweenness)
}

// ============================================================================
// BLAST RADIUS AND DEPTH
// ============================================================================

/// Number of nodes that transitively depend on each node.
///
/// BFS on the transposed graph; the node itself is not counted.
pub fn blast_radius(edges: &[(u32, u32)], num_nodes: usize) -> Result<Vec<usize>, GraphError> {
    validate_edges(edges, num_nodes as u32)?;

    let mut reverse: Vec<Vec<usize>> = vec![vec![]; num_nodes];
    for (src, targets) in simple_adjacency(edges, num_nodes).into_iter().enumerate() {
        for dst in targets {
            reverse[dst].push(src);
        }
    }

    Ok((0..num_nodes)
        .into_par_iter()
        .map(|start| {
            let mut seen = vec![false; num_nodes];
            seen[start] = true;
            let mut queue = VecDeque::from([start]);
            let mut count = 0usize;
            while let Some(v) = queue.pop_front() {
                for &u in &reverse[v] {
                    if !seen[u] {
                        seen[u] = true;
                        count += 1;
                        queue.push_back(u);
                    }
                }
            }
            count
        })
        .collect())
}

/// Shortest forward distance from any entry point; `None` when unreachable.
pub fn dag_depth(
    edges: &[(u32, u32)],
    num_nodes: usize,
    entry_points: &[usize],
) -> Result<Vec<Option<usize>>, GraphError> {
    validate_edges(edges, num_nodes as u32)?;
    if let Some(&bad) = entry_points.iter().find(|&&e| e >= num_nodes) {
        return Err(GraphError::NodeOutOfBounds(bad as u32, num_nodes as u32));
    }

    let adj = simple_adjacency(edges, num_nodes);
    let mut depth: Vec<Option<usize>> = vec![None; num_nodes];
    let mut queue = VecDeque::new();
    for &entry in entry_points {
        if depth[entry].is_none() {
            depth[entry] = Some(0);
            queue.push_back(entry);
        }
    }
    while let Some(v) = queue.pop_front() {
        let next = depth[v].map(|d| d + 1);
        for &w in &adj[v] {
            if depth[w].is_none() {
                depth[w] = next;
                queue.push_back(w);
            }
        }
    }
    Ok(depth)
}

/// Connected components of the graph with edge direction ignored.
///
/// Members sorted; components ordered by smallest member.
pub fn undirected_components(edges: &[(u32, u32)], num_nodes: usize) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..num_nodes).collect();

    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    for &(a, b) in edges {
        let (a, b) = (a as usize, b as usize);
        if a >= num_nodes || b >= num_nodes {
            continue;
        }
        let ra = find(&mut parent, a);
        let rb = find(&mut parent, b);
        if ra != rb {
            parent[ra.max(rb)] = ra.min(rb);
        }
    }

    let mut groups: FxHashMap<usize, Vec<usize>> = FxHashMap::default();
    for node in 0..num_nodes {
        let root = find(&mut parent, node);
        groups.entry(root).or_default().push(node);
    }
    let mut components: Vec<Vec<usize>> = groups.into_values().collect();
    components.sort_by_key(|c| c[0]);
    components
}

// ============================================================================
// LOUVAIN (Modularity-based Community Detection)
// ============================================================================
//
//   Q = (1/2m) Σ [A_ij − k_i k_j / 2m] δ(c_i, c_j)
//
// Phase 1 moves single nodes to the neighbouring community with the largest
// modularity gain until no move helps. Phase 2 contracts every community into
// a super-node (internal weight becomes a self-loop) and repeats phase 1 on
// the contracted graph. Stops when a level makes no move.
//
// Direction is ignored and each connected pair counts once with weight 1.
// ============================================================================

const LOUVAIN_MAX_PASSES: usize = 20;
const LOUVAIN_MAX_LEVELS: usize = 10;

/// Weighted undirected graph used between Louvain levels.
struct LevelGraph {
    /// Neighbour -> weight, excluding self-loops
    adj: Vec<FxHashMap<usize, f64>>,
    self_loops: Vec<f64>,
}

impl LevelGraph {
    fn len(&self) -> usize {
        self.adj.len()
    }

    /// Weighted degree; a self-loop contributes twice.
    fn degree(&self, node: usize) -> f64 {
        self.adj[node].values().sum::<f64>() + 2.0 * self.self_loops[node]
    }
}

/// Modularity gain of inserting a node with degree `k_i` into a community
/// with total degree `sigma_tot`, given `k_i_in` weight towards it.
fn modularity_gain(k_i_in: f64, sigma_tot: f64, k_i: f64, m: f64) -> f64 {
    k_i_in / m - sigma_tot * k_i / (2.0 * m * m)
}

/// Phase 1 on one level. Returns the community of each level node and
/// whether any node moved.
fn local_moving(graph: &LevelGraph, m: f64) -> (Vec<usize>, bool) {
    let n = graph.len();
    let mut community: Vec<usize> = (0..n).collect();
    let degrees: Vec<f64> = (0..n).map(|i| graph.degree(i)).collect();
    let mut sigma_tot: Vec<f64> = degrees.clone();
    let mut moved_any = false;

    for _pass in 0..LOUVAIN_MAX_PASSES {
        let mut moved = false;
        for node in 0..n {
            let current = community[node];
            let k_i = degrees[node];
            sigma_tot[current] -= k_i;

            let mut weights_to: FxHashMap<usize, f64> = FxHashMap::default();
            for (&neighbor, &w) in &graph.adj[node] {
                *weights_to.entry(community[neighbor]).or_insert(0.0) += w;
            }

            let own_in = weights_to.get(&current).copied().unwrap_or(0.0);
            let mut best = current;
            let mut best_gain = modularity_gain(own_in, sigma_tot[current], k_i, m);
            let mut candidates: Vec<(usize, f64)> = weights_to.into_iter().collect();
            candidates.sort_unstable_by_key(|&(c, _)| c);
            for (candidate, k_i_in) in candidates {
                let gain = modularity_gain(k_i_in, sigma_tot[candidate], k_i, m);
                if gain > best_gain + 1e-12 {
                    best_gain = gain;
                    best = candidate;
                }
            }

            sigma_tot[best] += k_i;
            if best != current {
                community[node] = best;
                moved = true;
                moved_any = true;
            }
        }
        if !moved {
            break;
        }
    }

    (community, moved_any)
}

/// Renumber labels to 0..k in order of first appearance.
fn renumber(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping: FxHashMap<usize, usize> = FxHashMap::default();
    let renumbered = labels
        .iter()
        .map(|&label| {
            let next = mapping.len();
            *mapping.entry(label).or_insert(next)
        })
        .collect();
    (renumbered, mapping.len())
}

/// Contract communities into super-nodes.
fn contract(graph: &LevelGraph, community: &[usize], count: usize) -> LevelGraph {
    let mut adj: Vec<FxHashMap<usize, f64>> = vec![FxHashMap::default(); count];
    let mut self_loops = vec![0.0; count];
    for node in 0..graph.len() {
        let c = community[node];
        self_loops[c] += graph.self_loops[node];
        for (&neighbor, &w) in &graph.adj[node] {
            let d = community[neighbor];
            if c == d {
                // each internal edge is visited from both ends
                self_loops[c] += w / 2.0;
            } else {
                *adj[c].entry(d).or_insert(0.0) += w;
            }
        }
    }
    LevelGraph { adj, self_loops }
}

/// Undirected unit-weight pairs (a < b) from a directed edge list.
fn undirected_pairs(edges: &[(u32, u32)]) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize)> = edges
        .iter()
        .filter(|(a, b)| a != b)
        .map(|&(a, b)| {
            let (a, b) = (a as usize, b as usize);
            (a.min(b), a.max(b))
        })
        .collect();
    pairs.sort_unstable();
    pairs.dedup();
    pairs
}

/// Louvain community detection.
///
/// Returns the community of each node (numbered by smallest member) and the
/// modularity Q of the partition on the original graph.
pub fn louvain(edges: &[(u32, u32)], num_nodes: usize) -> Result<(Vec<usize>, f64), GraphError> {
    validate_edges(edges, num_nodes as u32)?;
    let pairs = undirected_pairs(edges);
    if num_nodes == 0 {
        return Ok((vec![], 0.0));
    }
    if pairs.is_empty() {
        return Ok(((0..num_nodes).collect(), 0.0));
    }

    let m = pairs.len() as f64;
    let mut adj: Vec<FxHashMap<usize, f64>> = vec![FxHashMap::default(); num_nodes];
    for &(a, b) in &pairs {
        adj[a].insert(b, 1.0);
        adj[b].insert(a, 1.0);
    }
    let mut graph = LevelGraph {
        adj,
        self_loops: vec![0.0; num_nodes],
    };

    // membership[node] = level-node the original node currently belongs to
    let mut membership: Vec<usize> = (0..num_nodes).collect();
    for _level in 0..LOUVAIN_MAX_LEVELS {
        let (community, moved) = local_moving(&graph, m);
        if !moved {
            break;
        }
        let (community, count) = renumber(&community);
        for slot in membership.iter_mut() {
            *slot = community[*slot];
        }
        graph = contract(&graph, &community, count);
        if count == 1 {
            break;
        }
    }

    // Number communities by their smallest original member
    let (labels, _) = renumber(&membership);
    let q = modularity(&pairs, &labels, num_nodes);
    Ok((labels, q))
}

/// Modularity of a partition over unit-weight undirected pairs.
pub fn modularity(pairs: &[(usize, usize)], labels: &[usize], num_nodes: usize) -> f64 {
    if pairs.is_empty() || num_nodes == 0 {
        return 0.0;
    }
    let m = pairs.len() as f64;
    let communities = labels.iter().copied().max().map_or(0, |c| c + 1);
    let mut internal = vec![0.0; communities];
    let mut total_degree = vec![0.0; communities];
    for &(a, b) in pairs {
        total_degree[labels[a]] += 1.0;
        total_degree[labels[b]] += 1.0;
        if labels[a] == labels[b] {
            internal[labels[a]] += 1.0;
        }
    }
    internal
        .iter()
        .zip(total_degree.iter())
        .map(|(e_in, tot)| e_in / m - (tot / (2.0 * m)).powi(2))
        .sum()
}

// ============================================================================
// INEQUALITY
// ============================================================================

/// Gini coefficient of non-negative values.
///
///   G = (2 Σ (i+1) x_i) / (n Σ x) − (n+1)/n   over ascending x
///
/// 0 for fewer than two values or a zero total.
pub fn gini(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let total: f64 = sorted.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, x)| (i as f64 + 1.0) * x)
        .sum();
    let nf = n as f64;
    (2.0 * weighted) / (nf * total) - (nf + 1.0) / nf
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-6;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    /// Create a complete graph (every node connected to every other)
    fn complete_graph(n: usize) -> Vec<(u32, u32)> {
        let mut edges = Vec::new();
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    edges.push((i as u32, j as u32));
                }
            }
        }
        edges
    }

    /// Create a cycle graph (0 -> 1 -> 2 -> ... -> n-1 -> 0)
    fn cycle_graph(n: usize) -> Vec<(u32, u32)> {
        (0..n).map(|i| (i as u32, ((i + 1) % n) as u32)).collect()
    }

    /// Directed path 0 -> 1 -> ... -> n-1
    fn path_graph(n: usize) -> Vec<(u32, u32)> {
        (0..n.saturating_sub(1))
            .map(|i| (i as u32, (i + 1) as u32))
            .collect()
    }

    #[test]
    fn test_sccs_node_out_of_bounds() {
        let result = find_sccs(&[(0, 5)], 3);
        assert!(matches!(result, Err(GraphError::NodeOutOfBounds(5, 3))));
    }

    #[test]
    fn test_find_cycles() {
        let mut edges = cycle_graph(3);
        edges.push((3, 4));
        let cycles = find_cycles(&edges, 5, 2).unwrap();
        assert_eq!(cycles, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_pagerank_invalid_damping() {
        let result = pagerank(&[(0, 1)], 2, 1.5, 20, 1e-6);
        assert!(matches!(result, Err(GraphError::InvalidParameter(_))));
    }

    #[test]
    fn test_pagerank_sums_to_one_with_dangling() {
        // 0 -> 1 -> 2, node 2 is dangling
        let scores = pagerank(&path_graph(3), 3, 0.85, 100, 1e-10).unwrap();
        let total: f64 = scores.iter().sum();
        assert!(approx_eq(total, 1.0), "sum = {}", total);
        assert!(scores[2] > scores[1]);
        assert!(scores[1] > scores[0]);
    }

    #[test]
    fn test_pagerank_only_dangling_is_uniform() {
        let scores = pagerank(&[], 4, 0.85, 20, 1e-6).unwrap();
        for s in scores {
            assert!(approx_eq(s, 0.25));
        }
    }

    #[test]
    fn test_pagerank_cycle_uniform() {
        let scores = pagerank(&cycle_graph(5), 5, 0.85, 50, 1e-9).unwrap();
        for s in &scores {
            assert!(approx_eq(*s, 0.2));
        }
    }

    #[test]
    fn test_pagerank_empty() {
        assert!(pagerank(&[], 0, 0.85, 20, 1e-6).unwrap().is_empty());
    }

    #[test]
    fn test_betweenness_path_middle_is_max() {
        let bc = betweenness_centrality(&path_graph(5), 5).unwrap();
        // node 2 lies on paths (0,3),(0,4),(1,3),(1,4)
        assert!(approx_eq(bc[2], 4.0));
        assert!(approx_eq(bc[0], 0.0));
        assert!(approx_eq(bc[4], 0.0));
        assert!(bc[2] > bc[1]);
    }

    #[test]
    fn test_betweenness_complete_is_zero() {
        let bc = betweenness_centrality(&complete_graph(4), 4).unwrap();
        assert!(bc.iter().all(|b| approx_eq(*b, 0.0)));
    }

    #[test]
    fn test_blast_radius_path() {
        // 0 -> 1 -> 2: everything upstream depends on 2
        let radius = blast_radius(&path_graph(3), 3).unwrap();
        assert_eq!(radius, vec![0, 1, 2]);
    }

    #[test]
    fn test_blast_radius_cycle() {
        let radius = blast_radius(&cycle_graph(4), 4).unwrap();
        assert_eq!(radius, vec![3, 3, 3, 3]);
    }

    #[test]
    fn test_dag_depth() {
        let mut edges = path_graph(3);
        edges.push((3, 3));
        let depth = dag_depth(&edges, 4, &[0]).unwrap();
        assert_eq!(depth, vec![Some(0), Some(1), Some(2), None]);
    }

    #[test]
    fn test_undirected_components() {
        let components = undirected_components(&[(0, 1), (3, 2)], 5);
        assert_eq!(components, vec![vec![0, 1], vec![2, 3], vec![4]]);
    }

    #[test]
    fn test_louvain_two_cliques() {
        let mut edges = Vec::new();
        for (a, b) in complete_graph(4) {
            edges.push((a, b));
            edges.push((a + 4, b + 4));
        }
        edges.push((0, 4));
        let (labels, q) = louvain(&edges, 8).unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[3]);
        assert_eq!(labels[4], labels[7]);
        assert_ne!(labels[0], labels[4]);
        assert!(q > 0.3, "modularity = {}", q);
    }

    #[test]
    fn test_louvain_no_edges() {
        let (labels, q) = louvain(&[], 3).unwrap();
        assert_eq!(labels, vec![0, 1, 2]);
        assert_eq!(q, 0.0);
    }

    #[test]
    fn test_louvain_deterministic() {
        let edges = vec![(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)];
        let first = louvain(&edges, 6).unwrap();
        let second = louvain(&edges, 6).unwrap();
        assert_eq!(first.0, second.0);
        assert_eq!(first.1.to_bits(), second.1.to_bits());
    }

    #[test]
    fn test_modularity_single_community() {
        let pairs = vec![(0, 1), (1, 2)];
        assert!(approx_eq(modularity(&pairs, &[0, 0, 0], 3), 0.0));
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini(&[5.0]), 0.0);
        assert!(approx_eq(gini(&[1.0, 1.0, 1.0, 1.0]), 0.0));
        // one holder of everything among four
        assert!(approx_eq(gini(&[0.0, 0.0, 0.0, 4.0]), 0.75));
    }
}
