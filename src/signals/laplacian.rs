//! Health Laplacian
//!
//! With per-file health `h = 1 − raw_risk`,
//!
//! ```text
//!   Δh(f) = mean_{n ∈ N(f)} h(n) − h(f) = raw_risk(f) − mean_{n ∈ N(f)} raw_risk(n)
//! ```
//!
//! over undirected graph neighbors. Large positive values mark a file that is
//! much less healthy than its neighborhood. Files without scored neighbors get
//! 0.0; files without a risk score get no value.

use std::collections::BTreeMap;

use super::fusion::FileSignals;
use crate::graph::DependencyGraph;

pub fn health_laplacian(
    files: &BTreeMap<String, FileSignals>,
    graph: &DependencyGraph,
) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for (path, fs) in files {
        let Some(own) = fs.raw_risk else {
            continue;
        };
        let neighbor_risks: Vec<f64> = graph
            .index_of(path)
            .map(|node| {
                graph
                    .neighbors(node)
                    .into_iter()
                    .filter_map(|n| files.get(graph.path(n)).and_then(|nfs| nfs.raw_risk))
                    .collect::<Vec<f64>>()
            })
            .unwrap_or_default();
        if neighbor_risks.is_empty() {
            out.insert(path.clone(), 0.0);
            continue;
        }
        let mean = neighbor_risks.iter().sum::<f64>() / neighbor_risks.len() as f64;
        out.insert(path.clone(), own - mean);
    }
    out
}
