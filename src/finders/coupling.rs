//! Coupling finders
//!
//! Disagreements between the import graph and change history: files that
//! change together without an import between them, imports between files that
//! never change together, and imports joining files with nothing in common.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use super::helpers::{file_name, file_stem, is_package_marker, margin_confidence, percent};
use super::{Finder, FinderContext};
use crate::error::PipelineResult;
use crate::models::{parent_dir, Effort, Evidence, FileRole, Finding, Scope};
use crate::signals::{Polarity, Tier};
use crate::store::SlotName;
use crate::temporal::CoChangePair;

const MAX_PAIR_FINDINGS: usize = 20;

const MIN_COCHANGES: usize = 2;
const MIN_LIFT: f64 = 2.0;
const MIN_CONFIDENCE: f64 = 0.5;
const MIN_MUTUAL_INFORMATION: f64 = 0.05;

/// Files that change together with no import between them
pub struct HiddenCouplingFinder;

impl HiddenCouplingFinder {
    fn describe(pair: &CoChangePair) -> String {
        let (a, b) = (file_name(&pair.file_a), file_name(&pair.file_b));
        if pair.confidence_a_b >= pair.confidence_b_a {
            format!(
                "when {} changed, {} also changed {} of {} times ({})",
                a,
                b,
                pair.count,
                pair.total_a,
                percent(pair.confidence_a_b)
            )
        } else {
            format!(
                "when {} changed, {} also changed {} of {} times ({})",
                b,
                a,
                pair.count,
                pair.total_b,
                percent(pair.confidence_b_a)
            )
        }
    }
}

impl Finder for HiddenCouplingFinder {
    fn name(&self) -> &'static str {
        "hidden_coupling"
    }

    fn description(&self) -> &'static str {
        "Files that always change together but never import each other"
    }

    fn requires(&self) -> &'static [SlotName] {
        &[SlotName::SignalField, SlotName::Structural, SlotName::CoChange]
    }

    fn base_severity(&self) -> f64 {
        0.9
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Absolute
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let (Some(structural), Some(cochange)) = (ctx.store.structural.get(), ctx.store.cochange.get())
        else {
            return Ok(Vec::new());
        };
        let graph = &structural.graph;

        let mut findings = Vec::new();
        for pair in cochange.pairs.values() {
            let (a, b) = (pair.file_a.as_str(), pair.file_b.as_str());
            if is_package_marker(a) || is_package_marker(b) {
                continue;
            }
            if pair.count < MIN_COCHANGES || pair.lift < MIN_LIFT {
                continue;
            }
            let max_conf = pair.max_confidence();
            if max_conf < MIN_CONFIDENCE {
                continue;
            }
            let mi = pair.mutual_information(cochange.total_commits);
            if mi < MIN_MUTUAL_INFORMATION {
                continue;
            }
            if graph.connected(a, b) {
                continue;
            }
            if !(ctx.is_hot(a) || ctx.is_hot(b)) {
                continue;
            }

            let strength = ((pair.lift / 10.0 + max_conf) / 2.0).clamp(0.1, 1.0);
            let suggestion = if parent_dir(a) == parent_dir(b) {
                format!(
                    "{} and {} sit in the same package and change together, but neither imports the other. Make the link explicit with an import or a shared module.",
                    file_name(a),
                    file_name(b)
                )
            } else {
                "These files live in different packages but change together. Find what ties them and make it explicit through an import or a shared module.".to_string()
            };

            findings.push(Finding {
                finder: self.name().to_string(),
                severity: self.base_severity() * strength,
                scope: Scope::FilePair,
                title: format!("{} and {} always change together", a, b),
                files: vec![a.to_string(), b.to_string()],
                evidence: vec![
                    Evidence::new("cochange_count", pair.count as f64, Self::describe(pair)),
                    Evidence::new(
                        "cochange_lift",
                        pair.lift,
                        format!("{:.1}x more often than chance", pair.lift),
                    ),
                    Evidence::new(
                        "mutual_information",
                        mi,
                        format!("{:.3} bits shared between their change histories", mi),
                    ),
                    Evidence::new("no_import", 0.0, "neither file imports the other"),
                ],
                suggestion,
                confidence: margin_confidence(&[
                    (pair.count as f64, MIN_COCHANGES as f64, Polarity::HighIsBad),
                    (pair.lift, MIN_LIFT, Polarity::HighIsBad),
                    (max_conf, MIN_CONFIDENCE, Polarity::HighIsBad),
                    (mi, MIN_MUTUAL_INFORMATION, Polarity::HighIsBad),
                ]),
                effort: Effort::Low,
                ..Default::default()
            });
        }
        findings.sort_by(|x, y| y.severity.total_cmp(&x.severity));
        findings.truncate(MAX_PAIR_FINDINGS);
        Ok(findings)
    }
}

const DEAD_DEPENDENCY_MIN_COMMITS: usize = 50;

/// Import between files that have both changed but never together
pub struct DeadDependencyFinder;

impl Finder for DeadDependencyFinder {
    fn name(&self) -> &'static str {
        "dead_dependency"
    }

    fn description(&self) -> &'static str {
        "Imports between files that never change together"
    }

    fn requires(&self) -> &'static [SlotName] {
        &[
            SlotName::SignalField,
            SlotName::Structural,
            SlotName::CoChange,
            SlotName::GitHistory,
        ]
    }

    fn base_severity(&self) -> f64 {
        0.4
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Absolute
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let (Some(structural), Some(cochange), Some(history)) = (
            ctx.store.structural.get(),
            ctx.store.cochange.get(),
            ctx.store.git_history.get(),
        ) else {
            return Ok(Vec::new());
        };
        let total_commits = history.total_commits();
        if total_commits < DEAD_DEPENDENCY_MIN_COMMITS {
            return Ok(Vec::new());
        }
        let graph = &structural.graph;

        let mut seen: BTreeSet<(usize, usize)> = BTreeSet::new();
        let mut findings = Vec::new();
        for edge in graph.edges() {
            if edge.source == edge.target || !seen.insert((edge.source, edge.target)) {
                continue;
            }
            let (src, tgt) = (graph.path(edge.source), graph.path(edge.target));
            let (src_changes, tgt_changes) = (cochange.changes(src), cochange.changes(tgt));
            if src_changes == 0 || tgt_changes == 0 {
                continue;
            }
            if cochange.pair(src, tgt).is_some() {
                continue;
            }
            if !(ctx.is_hot(src) || ctx.is_hot(tgt)) {
                continue;
            }
            let (src_name, tgt_name) = (file_name(src), file_name(tgt));

            findings.push(Finding {
                finder: self.name().to_string(),
                severity: self.base_severity() * 0.7,
                scope: Scope::FilePair,
                title: format!("{} imports {} but they never change together", src, tgt),
                files: vec![src.to_string(), tgt.to_string()],
                evidence: vec![
                    Evidence::new(
                        "structural_dep",
                        1.0,
                        format!("{} imports {}", src_name, tgt_name),
                    ),
                    Evidence::new(
                        "cochange_count",
                        0.0,
                        format!(
                            "across {} commits {} changed {} times and {} changed {} times, never in the same commit",
                            total_commits, src_name, src_changes, tgt_name, tgt_changes
                        ),
                    ),
                ],
                suggestion: format!(
                    "The import of {} in {} may be vestigial. Check whether it can be removed.",
                    tgt_name, src_name
                ),
                confidence: margin_confidence(&[
                    (
                        total_commits as f64,
                        DEAD_DEPENDENCY_MIN_COMMITS as f64,
                        Polarity::HighIsBad,
                    ),
                    (src_changes.min(tgt_changes) as f64, 1.0, Polarity::HighIsBad),
                ]),
                effort: Effort::Low,
                ..Default::default()
            });
        }
        Ok(findings)
    }
}

const ACCIDENTAL_SIMILARITY: f64 = 0.15;

const INFRASTRUCTURE_STEMS: &[&str] = &[
    "models",
    "model",
    "schemas",
    "schema",
    "types",
    "exceptions",
    "errors",
    "constants",
    "protocols",
    "interfaces",
    "logging",
    "logging_config",
    "logger",
    "log",
    "config",
    "settings",
    "utils",
    "util",
    "helpers",
    "helper",
    "common",
    "base",
    "core",
    "_common",
];

/// Files designed to be imported from anywhere.
fn is_infrastructure(path: &str, role: FileRole) -> bool {
    if is_package_marker(path) {
        return true;
    }
    let stem = file_stem(path).to_ascii_lowercase();
    INFRASTRUCTURE_STEMS.contains(&stem.as_str())
        || matches!(
            role,
            FileRole::Model
                | FileRole::Config
                | FileRole::Interface
                | FileRole::Exception
                | FileRole::Utility
        )
}

fn cosine_similarity(a: &FxHashMap<usize, f64>, b: &FxHashMap<usize, f64>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .filter_map(|(k, va)| b.get(k).map(|vb| va * vb))
        .sum();
    let norm_a = a.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b = b.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn jaccard(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let union = a.union(b).count();
    a.intersection(b).count() as f64 / union as f64
}

/// Import between files with unrelated imports and vocabulary
pub struct AccidentalCouplingFinder;

impl Finder for AccidentalCouplingFinder {
    fn name(&self) -> &'static str {
        "accidental_coupling"
    }

    fn description(&self) -> &'static str {
        "Imports between files that share neither dependencies nor concepts"
    }

    fn requires(&self) -> &'static [SlotName] {
        &[SlotName::SignalField, SlotName::Structural, SlotName::FileFacts]
    }

    fn base_severity(&self) -> f64 {
        0.50
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let (Some(structural), Some(facts)) = (ctx.store.structural.get(), ctx.store.file_facts.get())
        else {
            return Ok(Vec::new());
        };
        let graph = &structural.graph;
        let concepts: FxHashMap<&str, BTreeSet<&str>> = facts
            .iter()
            .map(|f| {
                (
                    f.path.as_str(),
                    f.concepts.iter().map(String::as_str).collect(),
                )
            })
            .collect();
        let role = |path: &str| ctx.field.file(path).map(|fs| fs.role).unwrap_or_default();
        let empty = BTreeSet::new();

        let mut seen: BTreeSet<(usize, usize)> = BTreeSet::new();
        let mut findings = Vec::new();
        for edge in graph.edges() {
            let (s, t) = (edge.source.min(edge.target), edge.source.max(edge.target));
            if s == t || !seen.insert((s, t)) {
                continue;
            }
            let (src, tgt) = (graph.path(edge.source), graph.path(edge.target));
            if is_infrastructure(src, role(src)) || is_infrastructure(tgt, role(tgt)) {
                continue;
            }
            let fp_a = graph.import_fingerprint(edge.source);
            let fp_b = graph.import_fingerprint(edge.target);
            let concepts_a = concepts.get(src).unwrap_or(&empty);
            let concepts_b = concepts.get(tgt).unwrap_or(&empty);
            if (concepts_a.is_empty() && fp_a.is_empty()) || (concepts_b.is_empty() && fp_b.is_empty()) {
                continue;
            }

            let import_sim = cosine_similarity(&fp_a, &fp_b);
            let concept_sim = jaccard(concepts_a, concepts_b);
            let combined = 0.6 * import_sim + 0.4 * concept_sim;
            if combined >= ACCIDENTAL_SIMILARITY {
                continue;
            }
            let (first, second) = if src <= tgt { (src, tgt) } else { (tgt, src) };

            findings.push(Finding {
                finder: self.name().to_string(),
                severity: self.base_severity(),
                scope: Scope::FilePair,
                title: format!("Accidental coupling: {} <-> {}", first, second),
                files: vec![first.to_string(), second.to_string()],
                evidence: vec![
                    Evidence::new(
                        "combined_similarity",
                        combined,
                        format!(
                            "similarity {:.2} (imports {:.2}, concepts {:.2})",
                            combined, import_sim, concept_sim
                        ),
                    ),
                    Evidence::new("structural_edge", 1.0, format!("{} imports {}", src, tgt)),
                ],
                suggestion: "These files are connected but share no concepts. Remove the dependency or put an abstraction between them.".to_string(),
                confidence: margin_confidence(&[(
                    combined,
                    ACCIDENTAL_SIMILARITY,
                    Polarity::HighIsGood,
                )]),
                effort: Effort::Medium,
                ..Default::default()
            });
        }
        findings.truncate(MAX_PAIR_FINDINGS);
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finders::test_support::{field, file, run};
    use crate::graph::analyze_structure;
    use crate::graph::test_support::fact;
    use crate::models::{CommitRecord, FileFact, GitHistory};
    use crate::signals::SignalField;
    use crate::store::{Artifact, SignalStore};
    use crate::temporal::CoChangeMatrix;

    fn structural_store(facts: Vec<FileFact>) -> SignalStore {
        let structural = analyze_structure(&facts, &Default::default()).unwrap();
        let mut store = SignalStore::new();
        store.put(Artifact::Structural(structural)).unwrap();
        store.put(Artifact::FileFacts(facts)).unwrap();
        store
    }

    fn pair(a: &str, b: &str, count: usize, total_a: usize, total_b: usize, n: usize) -> CoChangePair {
        let conf_ab = count as f64 / total_a as f64;
        let conf_ba = count as f64 / total_b as f64;
        CoChangePair {
            file_a: a.to_string(),
            file_b: b.to_string(),
            count,
            confidence_a_b: conf_ab,
            confidence_b_a: conf_ba,
            lift: count as f64 * n as f64 / (total_a * total_b) as f64,
            total_a,
            total_b,
        }
    }

    fn matrix(pairs: Vec<CoChangePair>, counts: &[(&str, usize)], n: usize) -> CoChangeMatrix {
        CoChangeMatrix {
            pairs: pairs
                .into_iter()
                .map(|p| ((p.file_a.clone(), p.file_b.clone()), p))
                .collect(),
            file_change_counts: counts.iter().map(|(p, c)| (p.to_string(), *c)).collect(),
            total_commits: n,
        }
    }

    #[test]
    fn test_hidden_coupling_without_edge() {
        let mut store = structural_store(vec![
            fact("src/a.py", &[]),
            fact("src/b.py", &[]),
            fact("src/c.py", &["src/a.py"]),
        ]);
        // lift 18·111/(25·25) ≈ 3.2, confidence 0.72
        let hidden = pair("src/a.py", "src/b.py", 18, 25, 25, 111);
        let linked = pair("src/a.py", "src/c.py", 18, 25, 25, 111);
        store
            .put(Artifact::CoChange(matrix(
                vec![hidden, linked],
                &[("src/a.py", 25), ("src/b.py", 25), ("src/c.py", 25)],
                111,
            )))
            .unwrap();

        let findings = run(&HiddenCouplingFinder, &store, &SignalField::default());
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.files, vec!["src/a.py", "src/b.py"]);
        assert_eq!(f.scope, Scope::FilePair);
        // (3.2/10 + 0.72) / 2 = 0.52
        assert!((f.severity - 0.9 * 0.52).abs() < 0.01);
    }

    #[test]
    fn test_hidden_coupling_confidence_tracks_margin() {
        let mut store = structural_store(vec![
            fact("src/a.py", &[]),
            fact("src/b.py", &[]),
            fact("lib/x.py", &[]),
            fact("lib/y.py", &[]),
        ]);
        // lift exactly 2.0, confidence exactly 0.5, MI just above 0.05
        let barely = pair("lib/x.py", "lib/y.py", 2, 4, 4, 16);
        let clearly = pair("src/a.py", "src/b.py", 18, 25, 25, 111);
        store
            .put(Artifact::CoChange(matrix(
                vec![barely, clearly],
                &[("src/a.py", 25), ("src/b.py", 25), ("lib/x.py", 4), ("lib/y.py", 4)],
                111,
            )))
            .unwrap();

        let findings = run(&HiddenCouplingFinder, &store, &SignalField::default());
        assert_eq!(findings.len(), 2);
        let confidence = |path: &str| {
            findings
                .iter()
                .find(|f| f.files[0] == path)
                .map(|f| f.confidence)
                .unwrap()
        };
        assert!(confidence("lib/x.py") < 0.05);
        assert!(confidence("src/a.py") > 0.5);
    }

    #[test]
    fn test_hidden_coupling_thresholds() {
        let mut store = structural_store(vec![fact("x.py", &[]), fact("y.py", &[])]);
        // lift 1.0: coincidence
        let weak = pair("x.py", "y.py", 5, 10, 10, 20);
        store
            .put(Artifact::CoChange(matrix(vec![weak], &[("x.py", 10), ("y.py", 10)], 20)))
            .unwrap();
        assert!(run(&HiddenCouplingFinder, &store, &SignalField::default()).is_empty());
    }

    fn commit(id: &str, files: &[&str]) -> CommitRecord {
        CommitRecord {
            id: id.to_string(),
            timestamp: 0,
            author: "dev".to_string(),
            message: String::new(),
            files: files.iter().map(|f| f.to_string()).collect(),
            intent: None,
        }
    }

    #[test]
    fn test_dead_dependency() {
        let mut store = structural_store(vec![
            fact("src/app.py", &["src/legacy.py", "src/db.py"]),
            fact("src/legacy.py", &[]),
            fact("src/db.py", &[]),
        ]);
        let commits: Vec<CommitRecord> = (0..60).map(|i| commit(&format!("c{}", i), &["x"])).collect();
        store.put(Artifact::GitHistory(GitHistory::new(commits))).unwrap();
        let together = pair("src/app.py", "src/db.py", 5, 10, 5, 60);
        store
            .put(Artifact::CoChange(matrix(
                vec![together],
                &[("src/app.py", 10), ("src/legacy.py", 4), ("src/db.py", 5)],
                60,
            )))
            .unwrap();

        let findings = run(&DeadDependencyFinder, &store, &SignalField::default());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].files, vec!["src/app.py", "src/legacy.py"]);
        assert!((findings[0].severity - 0.28).abs() < 1e-9);
        // 60 commits a fifth past 50; legacy.py changed 4 times, 3 past one
        assert!((findings[0].confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_dead_dependency_needs_long_history() {
        let mut store = structural_store(vec![fact("a.py", &["b.py"]), fact("b.py", &[])]);
        store
            .put(Artifact::GitHistory(GitHistory::new(vec![commit("c", &["a.py"])])))
            .unwrap();
        store
            .put(Artifact::CoChange(matrix(vec![], &[("a.py", 1), ("b.py", 1)], 1)))
            .unwrap();
        assert!(run(&DeadDependencyFinder, &store, &SignalField::default()).is_empty());
    }

    #[test]
    fn test_accidental_coupling() {
        let mut billing = fact("src/billing.py", &["src/render.py", "src/tax.py"]);
        billing.concepts = vec!["invoice".into(), "tax".into()];
        let mut render = fact("src/render.py", &["src/canvas.py"]);
        render.concepts = vec!["pixel".into(), "canvas".into()];
        let mut tax = fact("src/tax.py", &["src/render.py"]);
        tax.concepts = vec!["tax".into(), "invoice".into()];
        let mut canvas = fact("src/canvas.py", &[]);
        canvas.concepts = vec!["pixel".into()];
        let mut util = fact("src/utils.py", &[]);
        util.concepts = vec!["misc".into()];
        let store = structural_store(vec![billing, render, tax, canvas, util]);

        let field = field(vec![
            file("src/billing.py"),
            file("src/render.py"),
            file("src/tax.py"),
            file("src/canvas.py"),
        ]);
        let findings = run(&AccidentalCouplingFinder, &store, &field);
        let pairs: Vec<Vec<String>> = findings.iter().map(|f| f.files.clone()).collect();
        assert!(pairs.contains(&vec!["src/billing.py".to_string(), "src/render.py".to_string()]));
        // billing and tax share concepts
        assert!(!pairs.contains(&vec!["src/billing.py".to_string(), "src/tax.py".to_string()]));
    }

    #[test]
    fn test_similarity_helpers() {
        let a: FxHashMap<usize, f64> = [(1, 1.0), (2, 1.0)].into_iter().collect();
        let b: FxHashMap<usize, f64> = [(1, 1.0)].into_iter().collect();
        assert!((cosine_similarity(&a, &b) - 1.0 / 2f64.sqrt()).abs() < 1e-9);
        assert_eq!(cosine_similarity(&a, &FxHashMap::default()), 0.0);

        let x: BTreeSet<&str> = ["a", "b"].into_iter().collect();
        let y: BTreeSet<&str> = ["b", "c"].into_iter().collect();
        assert!((jaccard(&x, &y) - 1.0 / 3.0).abs() < 1e-9);
        assert!(is_infrastructure("pkg/utils.py", FileRole::Source));
        assert!(is_infrastructure("pkg/thing.py", FileRole::Model));
        assert!(!is_infrastructure("pkg/engine.py", FileRole::Source));
    }
}
