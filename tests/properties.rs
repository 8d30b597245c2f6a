//! Property-based tests for the signal pipeline.

use std::collections::BTreeMap;

use proptest::prelude::*;
use signalscope::config::AnalysisConfig;
use signalscope::graph::algorithms::pagerank;
use signalscope::models::{FileFact, ImportDecl};
use signalscope::run;
use signalscope::signals::{percentile_ranks, Signal};
use signalscope::temporal::authorship::bus_factor;

fn edges_strategy(max_nodes: usize) -> impl Strategy<Value = (usize, Vec<(u32, u32)>)> {
    (1..max_nodes).prop_flat_map(|n| {
        let edge = (0..n as u32, 0..n as u32);
        (Just(n), prop::collection::vec(edge, 0..n * 3))
    })
}

/// Random import graph over `n` files spread across three directories.
fn facts_strategy() -> impl Strategy<Value = Vec<FileFact>> {
    (2usize..20)
        .prop_flat_map(|n| {
            (
                Just(n),
                prop::collection::vec((0..n, 0..n), 0..n * 2),
                prop::collection::vec(1usize..800, n),
            )
        })
        .prop_map(|(n, edges, lines)| {
            let path = |i: usize| format!("d{}/f{:02}.py", i % 3, i);
            (0..n)
                .map(|i| FileFact {
                    path: path(i),
                    lines: lines[i],
                    function_count: lines[i] / 40,
                    imports: edges
                        .iter()
                        .filter(|(s, t)| *s == i && s != t)
                        .map(|(_, t)| ImportDecl::new(path(*t)))
                        .collect(),
                    ..Default::default()
                })
                .collect()
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn pagerank_sums_to_one((n, edges) in edges_strategy(30)) {
        let scores = pagerank(&edges, n, 0.85, 100, 1e-10).unwrap();
        let total: f64 = scores.iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-6, "sum = {}", total);
        prop_assert!(scores.iter().all(|&s| s >= 0.0));
    }

    #[test]
    fn percentiles_are_monotone(values in prop::collection::vec(0.0f64..1000.0, 1..60)) {
        let input: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
        let ranks = percentile_ranks(Signal::Lines, &input);
        for i in 0..values.len() {
            for j in 0..values.len() {
                if values[i] <= values[j] {
                    prop_assert!(ranks[i].unwrap() <= ranks[j].unwrap());
                }
            }
        }
        prop_assert!(ranks.iter().all(|r| (0.0..=1.0).contains(&r.unwrap())));
    }

    #[test]
    fn bus_factor_is_bounded(counts in prop::collection::vec(0usize..50, 1..8)) {
        let authors: BTreeMap<String, usize> = counts
            .iter()
            .enumerate()
            .map(|(i, c)| (format!("dev{}", i), *c))
            .collect();
        let active = counts.iter().filter(|&&c| c > 0).count().max(1);
        let bf = bus_factor(&authors);
        prop_assert!(bf >= 1.0 && bf <= active as f64 + 1e-9, "bus factor {}", bf);
    }

    #[test]
    fn findings_are_clamped(facts in facts_strategy()) {
        let (field, findings) = run(facts, None, &AnalysisConfig::default()).unwrap();
        for f in &findings {
            prop_assert!((0.1..=1.0).contains(&f.severity));
            prop_assert!((0.0..=1.0).contains(&f.confidence));
        }
        for fs in field.files.values() {
            for p in fs.percentiles.values() {
                prop_assert!((0.0..=1.0).contains(p));
            }
        }
    }
}

#[test]
fn single_author_bus_factor_is_one() {
    let authors: BTreeMap<String, usize> = [("solo".to_string(), 42)].into_iter().collect();
    assert_eq!(bus_factor(&authors), 1.0);
}
