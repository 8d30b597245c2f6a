//! End-to-end tests for `signalscope::run`
//!
//! Each test builds scanner facts (and optionally a commit log) in memory and
//! checks the signal field and findings produced by the whole pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use signalscope::config::AnalysisConfig;
use signalscope::history::{HistoryStore, InMemoryHistory, Snapshot};
use signalscope::models::{CommitRecord, FileFact, GitHistory, ImportDecl};
use signalscope::signals::Tier;
use signalscope::{run, run_with_history, PipelineError};

/// Finders that read temporal signals.
const TEMPORAL_FINDERS: &[&str] = &[
    "god_file",
    "unstable_file",
    "thrashing_code",
    "bug_magnet",
    "bug_attractor",
    "truck_factor",
    "knowledge_silo",
    "review_blindspot",
    "hidden_coupling",
    "dead_dependency",
    "conway_violation",
];

fn fact(path: &str, imports: &[&str]) -> FileFact {
    FileFact {
        path: path.to_string(),
        lines: 120,
        function_count: 6,
        function_sizes: vec![20; 6],
        imports: imports.iter().map(|p| ImportDecl::new(*p)).collect(),
        ..Default::default()
    }
}

fn commit(id: usize, author: &str, message: &str, files: &[&str]) -> CommitRecord {
    CommitRecord {
        id: format!("c{:03}", id),
        timestamp: 1_700_000_000 + id as i64 * 86_400,
        author: author.to_string(),
        message: message.to_string(),
        files: files.iter().map(|f| f.to_string()).collect(),
        intent: None,
    }
}

/// A small layered app: main -> service -> {repo, util}, repo -> model.
fn layered_facts() -> Vec<FileFact> {
    vec![
        fact("app/main.py", &["app/service.py"]),
        fact("app/service.py", &["data/repo.py", "lib/util.py"]),
        fact("data/repo.py", &["data/model.py"]),
        fact("data/model.py", &[]),
        fact("lib/util.py", &[]),
        fact("lib/unused.py", &[]),
    ]
}

fn layered_history() -> GitHistory {
    let mut commits = Vec::new();
    let files = [
        "app/main.py",
        "app/service.py",
        "data/repo.py",
        "data/model.py",
        "lib/util.py",
    ];
    for i in 0..30 {
        let author = if i % 3 == 0 { "alice" } else { "bob" };
        let message = if i % 4 == 0 { "fix: handle empty rows" } else { "add feature" };
        commits.push(commit(i, author, message, &[files[i % files.len()]]));
    }
    GitHistory::new(commits)
}

#[test]
fn test_no_history_degrades_gracefully() {
    let config = AnalysisConfig::default();
    let (field, findings) = run(layered_facts(), None, &config).unwrap();

    assert_eq!(field.files.len(), 6);
    assert!(field.global.team_size.is_none());
    for f in &findings {
        assert!(
            !TEMPORAL_FINDERS.contains(&f.finder.as_str()),
            "temporal finder {} fired without history",
            f.finder
        );
    }
    for fs in field.files.values() {
        assert!(fs.total_changes.is_none());
        assert!(fs.bus_factor.is_none());
    }
}

#[test]
fn test_structural_findings_without_history() {
    let config = AnalysisConfig::default();
    let (_, findings) = run(layered_facts(), None, &config).unwrap();
    assert!(findings
        .iter()
        .any(|f| f.finder == "orphan_code" && f.files == vec!["lib/unused.py".to_string()]));
}

#[test]
fn test_run_is_idempotent() {
    let config = AnalysisConfig::default();
    let (field_a, findings_a) = run(layered_facts(), Some(layered_history()), &config).unwrap();
    let (field_b, findings_b) = run(layered_facts(), Some(layered_history()), &config).unwrap();
    assert_eq!(field_a, field_b);
    assert_eq!(findings_a, findings_b);
}

#[test]
fn test_findings_are_clamped_and_identified() {
    let config = AnalysisConfig::default();
    let (_, findings) = run(layered_facts(), Some(layered_history()), &config).unwrap();
    for f in &findings {
        assert!(
            (0.1..=1.0).contains(&f.severity),
            "{} severity {} out of range",
            f.finder,
            f.severity
        );
        assert!((0.0..=1.0).contains(&f.confidence));
        assert_eq!(f.id.len(), 16);
    }
    for pair in findings.windows(2) {
        assert!(pair[0].severity >= pair[1].severity);
    }
}

#[test]
fn test_tier_follows_file_count() {
    let config = AnalysisConfig::default();
    for (count, tier) in [(14, Tier::Absolute), (15, Tier::Bayesian), (50, Tier::Full)] {
        let facts: Vec<FileFact> = (0..count)
            .map(|i| fact(&format!("pkg/m{:02}.py", i), &[]))
            .collect();
        let (field, _) = run(facts, None, &config).unwrap();
        assert_eq!(field.tier, tier, "{} files", count);
    }
}

#[test]
fn test_health_complements_risk() {
    let config = AnalysisConfig::default();
    let (field, _) = run(layered_facts(), Some(layered_history()), &config).unwrap();
    for fs in field.files.values() {
        if let (Some(risk), Some(health)) = (fs.risk_score, fs.file_health_score) {
            assert!((health - 10.0 * (1.0 - risk)).abs() < 1e-9);
        }
    }
}

#[test]
fn test_small_repo_uses_absolute_thresholds() {
    let mut hollow = fact("svc/hollow.py", &[]);
    hollow.function_count = 10;
    hollow.stub_count = 8;
    hollow.function_sizes = vec![1, 1, 1, 1, 1, 1, 1, 1, 60, 80];
    let facts = vec![
        fact("svc/main.py", &["svc/hollow.py", "svc/util.py"]),
        hollow,
        fact("svc/util.py", &[]),
        fact("svc/extra.py", &[]),
    ];

    let (field, findings) = run(facts, None, &AnalysisConfig::default()).unwrap();
    assert_eq!(field.tier, Tier::Absolute);
    assert!(findings.iter().any(|f| f.finder == "hollow_code"));
    for f in &findings {
        for e in &f.evidence {
            assert!(e.percentile.is_none(), "{} used a percentile", f.finder);
        }
    }
}

#[test]
fn test_hidden_coupling_end_to_end() {
    let mut facts = vec![fact("core/a.py", &[]), fact("web/b.py", &[])];
    let others = ["x/c.py", "x/d.py", "x/e.py", "x/f.py", "x/g.py", "x/h.py"];
    facts.extend(others.iter().map(|p| fact(p, &[])));

    // a and b: 6 joint, 2 alone each; 14 unrelated commits
    let mut commits = Vec::new();
    let mut id = 0;
    let mut push = |files: &[&str]| {
        commits.push(commit(id, "dev", "update", files));
        id += 1;
    };
    for _ in 0..6 {
        push(&["core/a.py", "web/b.py"]);
    }
    for _ in 0..2 {
        push(&["core/a.py"]);
        push(&["web/b.py"]);
    }
    for i in 0..14 {
        push(&[others[i % others.len()]]);
    }

    let (_, findings) = run(facts, Some(GitHistory::new(commits)), &AnalysisConfig::default()).unwrap();
    let pair = vec!["core/a.py".to_string(), "web/b.py".to_string()];
    let hidden: Vec<_> = findings
        .iter()
        .filter(|f| f.finder == "hidden_coupling")
        .collect();
    assert_eq!(hidden.len(), 1);
    assert_eq!(hidden[0].files, pair);
    assert!(findings
        .iter()
        .filter(|f| f.finder == "dead_dependency" || f.finder == "accidental_coupling")
        .all(|f| f.files != pair));
}

#[test]
fn test_chronic_problem_with_history_store() {
    let config = AnalysisConfig::default();
    let (_, first) = run(layered_facts(), None, &config).unwrap();
    let orphan = first
        .iter()
        .find(|f| f.finder == "orphan_code")
        .cloned()
        .unwrap();

    let snapshot = Snapshot {
        timestamp: 0,
        finding_signatures: vec![orphan.signature()],
        violation_rate: None,
    };
    let history: Arc<dyn HistoryStore> = Arc::new(InMemoryHistory::new(vec![snapshot; 3]));
    let (_, findings) = run_with_history(layered_facts(), None, Some(history), &config).unwrap();

    let chronic = findings
        .iter()
        .find(|f| f.finder == "chronic_problem")
        .unwrap();
    assert_eq!(chronic.files, orphan.files);
    let expected = (orphan.severity * config.history.chronic_multiplier).min(1.0);
    assert!((chronic.severity - expected).abs() < 1e-9);

    // without a store the finder never runs
    assert!(first.iter().all(|f| f.finder != "chronic_problem"));
}

#[test]
fn test_max_findings_truncates() {
    let mut facts = layered_facts();
    facts.push(fact("lib/spare.py", &[]));
    let mut config = AnalysisConfig::default();
    config.engine.max_findings = usize::MAX;
    let (_, full) = run(facts.clone(), Some(layered_history()), &config).unwrap();
    assert!(full.len() > 1);

    config.engine.max_findings = 1;
    let (_, truncated) = run(facts, Some(layered_history()), &config).unwrap();
    assert_eq!(truncated.len(), 1);
    assert_eq!(truncated[0], full[0]);
}

#[test]
fn test_invalid_weights_fail_before_analysis() {
    let mut config = AnalysisConfig::default();
    config.fusion.weights.churn = 0.9;
    let err = run(layered_facts(), None, &config).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidWeights(_)));
}

#[test]
fn test_empty_repository() {
    let (field, findings) = run(Vec::new(), None, &AnalysisConfig::default()).unwrap();
    assert!(field.files.is_empty());
    assert!(findings.is_empty());
}

#[test]
fn test_module_signals_cover_directories() {
    let (field, _) = run(layered_facts(), Some(layered_history()), &AnalysisConfig::default()).unwrap();
    let dirs: BTreeMap<&str, usize> = field
        .modules
        .iter()
        .map(|(k, m)| (k.as_str(), m.file_count))
        .collect();
    assert_eq!(dirs.get("app"), Some(&2));
    assert_eq!(dirs.get("data"), Some(&2));
    assert_eq!(dirs.get("lib"), Some(&2));
}
