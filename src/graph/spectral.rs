//! Spectral summary of the undirected dependency graph
//!
//! Builds the unweighted Laplacian `L = D − A` and reports:
//! - the Fiedler value (λ₂, algebraic connectivity) of the largest connected
//!   component
//! - the number of zero eigenvalues, i.e. connected components
//! - the spectral gap λ₂/λ₃
//!
//! Small components use a dense symmetric eigensolver (nalgebra). Above
//! `max_dense_nodes` only the smallest `max_eigenvalues` eigenvalues are
//! computed by shifted power iteration with deflation, which needs only
//! sparse matrix-vector products. A warning is logged when any of those
//! eigenpairs is still off by more than `RESIDUAL_TOLERANCE` at the
//! iteration cap.

use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::algorithms::undirected_components;
use super::DependencyGraph;
use crate::config::SpectralConfig;

const ZERO_EIGENVALUE: f64 = 1e-8;
const MAX_POWER_ITERATIONS: usize = 1000;
const POWER_TOLERANCE: f64 = 1e-10;
const RESIDUAL_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralSummary {
    /// λ₂ of the largest connected component; `None` if it has < 3 nodes
    pub fiedler_value: Option<f64>,
    /// Number of zero eigenvalues of the full Laplacian
    pub num_components: usize,
    /// λ₂ / λ₃ of the largest connected component
    pub spectral_gap: Option<f64>,
    /// Smallest eigenvalues of the largest component, ascending
    pub eigenvalues: Vec<f64>,
    pub largest_component_size: usize,
    /// Whether eigenvalues came from the iterative solver
    pub approximate: bool,
}

/// Compute the spectral summary, or `None` for graphs with fewer than 3 files.
pub fn spectral_summary(
    graph: &DependencyGraph,
    config: &SpectralConfig,
) -> Option<SpectralSummary> {
    let n = graph.node_count();
    if n < 3 {
        debug!("Spectral analysis skipped: only {} files", n);
        return None;
    }

    let components = undirected_components(&graph.simple_edges(), n);
    let largest = components
        .iter()
        .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| b[0].cmp(&a[0])))?;

    let mut summary = SpectralSummary {
        fiedler_value: None,
        num_components: components.len(),
        spectral_gap: None,
        eigenvalues: Vec::new(),
        largest_component_size: largest.len(),
        approximate: false,
    };

    if largest.len() < 3 {
        return Some(summary);
    }

    let neighbors = component_adjacency(graph, largest);
    let wanted = config.max_eigenvalues.max(3);
    let eigenvalues = if largest.len() <= config.max_dense_nodes {
        dense_eigenvalues(&neighbors)
    } else {
        summary.approximate = true;
        let solved = iterative_smallest_eigenvalues(&neighbors, wanted.min(largest.len()));
        if !solved.converged() {
            warn!(
                "Spectral solver hit {} iterations on {} files (residual {:.2e}); fiedler value and gap are approximate",
                MAX_POWER_ITERATIONS,
                largest.len(),
                solved.max_residual
            );
        }
        solved.values
    };

    let nonzero: Vec<f64> = eigenvalues
        .iter()
        .copied()
        .filter(|v| v.abs() >= ZERO_EIGENVALUE)
        .collect();
    summary.fiedler_value = Some(eigenvalues.get(1).copied().unwrap_or(0.0).max(0.0));
    if nonzero.len() >= 2 && nonzero[1] > 0.0 {
        summary.spectral_gap = Some(nonzero[0] / nonzero[1]);
    }
    summary.eigenvalues = eigenvalues.into_iter().take(wanted).collect();

    debug!(
        "Spectral: {} components, fiedler {:?}, gap {:?}",
        summary.num_components, summary.fiedler_value, summary.spectral_gap
    );
    Some(summary)
}

/// Undirected neighbour lists of a component, re-indexed 0..len.
fn component_adjacency(graph: &DependencyGraph, members: &[usize]) -> Vec<Vec<usize>> {
    let mut local = vec![usize::MAX; graph.node_count()];
    for (i, &node) in members.iter().enumerate() {
        local[node] = i;
    }
    members
        .iter()
        .map(|&node| {
            graph
                .neighbors(node)
                .into_iter()
                .map(|nb| local[nb])
                .filter(|&nb| nb != usize::MAX)
                .collect()
        })
        .collect()
}

/// All Laplacian eigenvalues via a dense symmetric decomposition, ascending.
fn dense_eigenvalues(neighbors: &[Vec<usize>]) -> Vec<f64> {
    let n = neighbors.len();
    let mut laplacian = DMatrix::<f64>::zeros(n, n);
    for (i, nbrs) in neighbors.iter().enumerate() {
        laplacian[(i, i)] = nbrs.len() as f64;
        for &j in nbrs {
            laplacian[(i, j)] = -1.0;
        }
    }
    let mut values: Vec<f64> = SymmetricEigen::new(laplacian)
        .eigenvalues
        .iter()
        .copied()
        .collect();
    values.sort_by(f64::total_cmp);
    values
}

/// `L x` using the neighbour lists.
fn laplacian_times(neighbors: &[Vec<usize>], x: &[f64]) -> Vec<f64> {
    neighbors
        .iter()
        .enumerate()
        .map(|(i, nbrs)| nbrs.len() as f64 * x[i] - nbrs.iter().map(|&j| x[j]).sum::<f64>())
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn orthogonalize(x: &mut [f64], basis: &[Vec<f64>]) {
    for b in basis {
        let proj = dot(x, b);
        for (xi, bi) in x.iter_mut().zip(b) {
            *xi -= proj * bi;
        }
    }
}

fn normalize(x: &mut [f64]) -> f64 {
    let norm = dot(x, x).sqrt();
    if norm > 0.0 {
        for xi in x.iter_mut() {
            *xi /= norm;
        }
    }
    norm
}

struct IterativeEigenvalues {
    /// Ascending
    values: Vec<f64>,
    /// Largest `‖Lx − λx‖` over the computed eigenpairs
    max_residual: f64,
}

impl IterativeEigenvalues {
    fn converged(&self) -> bool {
        self.max_residual <= RESIDUAL_TOLERANCE
    }
}

/// Smallest `k` eigenvalues of a connected component's Laplacian.
///
/// Power iteration on `B = cI − L` (c above the largest eigenvalue of L)
/// finds the largest eigenvalues of B, i.e. the smallest of L. Each new
/// vector is kept orthogonal to the ones already found.
fn iterative_smallest_eigenvalues(neighbors: &[Vec<usize>], k: usize) -> IterativeEigenvalues {
    let n = neighbors.len();
    let max_degree = neighbors.iter().map(Vec::len).max().unwrap_or(0);
    let shift = 2.0 * max_degree as f64 + 1.0;

    // The constant vector spans the null space of a connected Laplacian
    let mut basis: Vec<Vec<f64>> = vec![vec![1.0 / (n as f64).sqrt(); n]];
    let mut values = vec![0.0];
    let mut max_residual: f64 = 0.0;

    for j in 1..k {
        // deterministic, non-constant starting vector
        let mut x: Vec<f64> = (0..n)
            .map(|i| (((i * 7919 + j * 104_729) % 1009) as f64 / 1009.0) - 0.5)
            .collect();
        orthogonalize(&mut x, &basis);
        if normalize(&mut x) == 0.0 {
            break;
        }

        for _ in 0..MAX_POWER_ITERATIONS {
            let lx = laplacian_times(neighbors, &x);
            let mut y: Vec<f64> = x.iter().zip(&lx).map(|(xi, li)| shift * xi - li).collect();
            orthogonalize(&mut y, &basis);
            if normalize(&mut y) == 0.0 {
                break;
            }
            let delta: f64 = x.iter().zip(&y).map(|(a, b)| (a - b).abs()).sum();
            x = y;
            if delta < POWER_TOLERANCE {
                break;
            }
        }

        let lx = laplacian_times(neighbors, &x);
        let rayleigh = dot(&x, &lx);
        let residual = lx
            .iter()
            .zip(&x)
            .map(|(li, xi)| (li - rayleigh * xi).powi(2))
            .sum::<f64>()
            .sqrt();
        max_residual = max_residual.max(residual);
        values.push(rayleigh.max(0.0));
        basis.push(x);
    }

    values.sort_by(f64::total_cmp);
    IterativeEigenvalues {
        values,
        max_residual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::fact;

    const EPSILON: f64 = 1e-6;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    /// Undirected path 0 - 1 - ... - n-1 as neighbour lists.
    fn path_neighbors(n: usize) -> Vec<Vec<usize>> {
        (0..n)
            .map(|i| {
                let mut v = Vec::new();
                if i > 0 {
                    v.push(i - 1);
                }
                if i + 1 < n {
                    v.push(i + 1);
                }
                v
            })
            .collect()
    }

    #[test]
    fn test_too_small_graph_skipped() {
        let graph = DependencyGraph::build(&[fact("a.py", &["b.py"]), fact("b.py", &[])]);
        assert!(spectral_summary(&graph, &SpectralConfig::default()).is_none());
    }

    #[test]
    fn test_connected_path_has_positive_fiedler() {
        let graph = DependencyGraph::build(&[
            fact("a.py", &["b.py"]),
            fact("b.py", &["c.py"]),
            fact("c.py", &["d.py"]),
            fact("d.py", &[]),
        ]);
        let summary = spectral_summary(&graph, &SpectralConfig::default()).unwrap();
        assert_eq!(summary.num_components, 1);
        // path P4: λ₂ = 2 − √2
        assert!(approx_eq(
            summary.fiedler_value.unwrap(),
            2.0 - 2f64.sqrt()
        ));
        assert!(summary.spectral_gap.unwrap() > 0.0);
        assert!(!summary.approximate);
    }

    #[test]
    fn test_two_components() {
        let graph = DependencyGraph::build(&[
            fact("a.py", &["b.py"]),
            fact("b.py", &["c.py"]),
            fact("c.py", &[]),
            fact("x.py", &["y.py"]),
            fact("y.py", &[]),
        ]);
        let summary = spectral_summary(&graph, &SpectralConfig::default()).unwrap();
        assert_eq!(summary.num_components, 2);
        assert_eq!(summary.largest_component_size, 3);
        // P3: eigenvalues 0, 1, 3
        assert!(approx_eq(summary.fiedler_value.unwrap(), 1.0));
        assert!(approx_eq(summary.spectral_gap.unwrap(), 1.0 / 3.0));
    }

    #[test]
    fn test_iterative_matches_dense() {
        let neighbors = path_neighbors(12);
        let dense = dense_eigenvalues(&neighbors);
        let solved = iterative_smallest_eigenvalues(&neighbors, 3);
        assert!(solved.converged());
        let iterative = solved.values;
        assert_eq!(iterative.len(), 3);
        assert!(approx_eq(iterative[0], 0.0));
        assert!((iterative[1] - dense[1]).abs() < 1e-4, "{} vs {}", iterative[1], dense[1]);
    }

    #[test]
    fn test_iterative_reports_unconverged_long_path() {
        // λ₂ and λ₃ of a 400-node path are too close for 1000 power steps
        let solved = iterative_smallest_eigenvalues(&path_neighbors(400), 3);
        assert_eq!(solved.values.len(), 3);
        assert!(!solved.converged());
        assert!(solved.max_residual > RESIDUAL_TOLERANCE);
    }

    #[test]
    fn test_large_graph_uses_iterative_solver() {
        let names: Vec<String> = (0..8).map(|i| format!("f{}.py", i)).collect();
        let facts: Vec<_> = (0..8)
            .map(|i| {
                let next: Vec<&str> = if i + 1 < 8 {
                    vec![names[i + 1].as_str()]
                } else {
                    vec![]
                };
                fact(&names[i], &next)
            })
            .collect();
        let graph = DependencyGraph::build(&facts);
        let config = SpectralConfig {
            max_dense_nodes: 4,
            max_eigenvalues: 3,
        };
        let summary = spectral_summary(&graph, &config).unwrap();
        assert!(summary.approximate);
        assert_eq!(summary.eigenvalues.len(), 3);
        assert!(summary.fiedler_value.unwrap() > 0.0);
    }
}
