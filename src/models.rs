//! Core data models for signalscope
//!
//! Input records produced by the scanner and history collaborators
//! ([`FileFact`], [`CommitRecord`], [`GitHistory`]) and the [`Finding`]
//! records produced by the finder engine.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Generate a deterministic finding ID from the finding signature.
///
/// The ID is a 16-character hex string of the xxh3 hash of the finder name
/// and the sorted list of involved paths, so the same issue keeps the same ID
/// across runs and can be tracked by a history store.
pub fn deterministic_finding_id(finder: &str, files: &[String]) -> String {
    let signature = finding_signature(finder, files);
    format!("{:016x}", xxhash_rust::xxh3::xxh3_64(signature.as_bytes()))
}

/// Stable signature of a finding: `finder:path1,path2,...` with sorted paths.
pub fn finding_signature(finder: &str, files: &[String]) -> String {
    let mut sorted: Vec<&str> = files.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    format!("{}:{}", finder, sorted.join(","))
}

/// Role a file plays in the codebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
    EntryPoint,
    Test,
    Config,
    Interface,
    Exception,
    Utility,
    Model,
    Migration,
    #[default]
    Source,
}

impl FileRole {
    /// Infer a role from the file path when the scanner did not supply one.
    pub fn infer(path: &str) -> Self {
        let lower = path.to_ascii_lowercase();
        let p = Path::new(&lower);
        let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let in_dir = |name: &str| p.components().any(|c| c.as_os_str() == name);

        if in_dir("tests")
            || in_dir("test")
            || in_dir("__tests__")
            || stem.starts_with("test_")
            || stem.ends_with("_test")
            || stem.ends_with(".test")
            || stem.ends_with(".spec")
            || stem.ends_with("_spec")
        {
            return FileRole::Test;
        }
        if in_dir("migrations") {
            return FileRole::Migration;
        }
        match stem {
            "main" | "__main__" | "app" | "cli" | "index" | "server" | "manage" => {
                FileRole::EntryPoint
            }
            "config" | "settings" | "conf" | "constants" => FileRole::Config,
            "utils" | "util" | "helpers" | "helper" | "common" => FileRole::Utility,
            "models" | "model" | "schema" | "types" | "entities" => FileRole::Model,
            s if s.contains("error") || s.contains("exception") => FileRole::Exception,
            s if s.contains("interface") || s.contains("protocol") || s == "traits" => {
                FileRole::Interface
            }
            s if s.contains("config") || s.contains("settings") => FileRole::Config,
            _ => FileRole::Source,
        }
    }

    /// Roles that are legitimately never imported.
    pub fn may_be_unreferenced(self) -> bool {
        matches!(
            self,
            FileRole::EntryPoint
                | FileRole::Test
                | FileRole::Config
                | FileRole::Interface
                | FileRole::Exception
        )
    }
}

impl std::fmt::Display for FileRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileRole::EntryPoint => "entry_point",
            FileRole::Test => "test",
            FileRole::Config => "config",
            FileRole::Interface => "interface",
            FileRole::Exception => "exception",
            FileRole::Utility => "utility",
            FileRole::Model => "model",
            FileRole::Migration => "migration",
            FileRole::Source => "source",
        };
        write!(f, "{}", s)
    }
}

/// A declared import. `path` names the imported file; `symbols` is the
/// number of symbols pulled in and becomes the edge weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub path: String,
    #[serde(default = "default_one")]
    pub symbols: u32,
}

impl ImportDecl {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            symbols: 1,
        }
    }
}

/// A call site aggregated by target file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallDecl {
    pub target: String,
    #[serde(default = "default_one")]
    pub count: u32,
}

fn default_one() -> u32 {
    1
}

/// Per-file structural facts produced by the scanner collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileFact {
    pub path: String,
    #[serde(default)]
    pub lines: usize,
    #[serde(default)]
    pub function_count: usize,
    #[serde(default)]
    pub class_count: usize,
    #[serde(default)]
    pub max_nesting: usize,
    #[serde(default)]
    pub imports: Vec<ImportDecl>,
    /// Internal imports the scanner could not resolve to a file
    #[serde(default)]
    pub unresolved_imports: Vec<String>,
    #[serde(default)]
    pub calls: Vec<CallDecl>,
    /// Lines per function, in declaration order
    #[serde(default)]
    pub function_sizes: Vec<usize>,
    #[serde(default)]
    pub stub_count: usize,
    /// Mean cyclomatic complexity
    #[serde(default)]
    pub complexity: f64,
    #[serde(default)]
    pub abstract_class_count: usize,
    #[serde(default)]
    pub role: Option<FileRole>,
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub naming_drift: Option<f64>,
    #[serde(default)]
    pub todo_count: usize,
    /// Raw file text, used for compression-based measurements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl FileFact {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn role(&self) -> FileRole {
        self.role.unwrap_or_else(|| FileRole::infer(&self.path))
    }

    /// Parent directory used as the module key (`.` for the root).
    pub fn module(&self) -> String {
        parent_dir(&self.path)
    }
}

/// Parent directory of a slash-separated path, `.` for top-level files.
pub fn parent_dir(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
        None => ".".to_string(),
    }
}

/// Intent category of a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitIntent {
    Fix,
    Feature,
    Refactor,
    Test,
    Docs,
    Deps,
    Chore,
}

/// One commit from the version-control log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub id: String,
    /// Unix timestamp in seconds
    pub timestamp: i64,
    pub author: String,
    #[serde(default)]
    pub message: String,
    pub files: Vec<String>,
    #[serde(default)]
    pub intent: Option<CommitIntent>,
}

/// Ordered commit history (newest first, as walked from HEAD).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GitHistory {
    pub commits: Vec<CommitRecord>,
}

impl GitHistory {
    pub fn new(commits: Vec<CommitRecord>) -> Self {
        Self { commits }
    }

    pub fn total_commits(&self) -> usize {
        self.commits.len()
    }

    /// Days between the oldest and newest commit.
    pub fn span_days(&self) -> i64 {
        let min = self.commits.iter().map(|c| c.timestamp).min();
        let max = self.commits.iter().map(|c| c.timestamp).max();
        match (min, max) {
            (Some(lo), Some(hi)) => (hi - lo) / 86_400,
            _ => 0,
        }
    }
}

/// What a finding is about.
///
/// Ordering is the tie-break order used when ranking findings of equal
/// severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    File,
    FilePair,
    Module,
    ModulePair,
    Codebase,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::File => write!(f, "FILE"),
            Scope::FilePair => write!(f, "FILE_PAIR"),
            Scope::Module => write!(f, "MODULE"),
            Scope::ModulePair => write!(f, "MODULE_PAIR"),
            Scope::Codebase => write!(f, "CODEBASE"),
        }
    }
}

/// Estimated effort to address a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Effort {
    Low,
    #[default]
    Medium,
    High,
}

/// Display band for a numeric severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 0.9 => Severity::Critical,
            s if s >= 0.7 => Severity::High,
            s if s >= 0.5 => Severity::Medium,
            s if s >= 0.3 => Severity::Low,
            _ => Severity::Info,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// One piece of evidence supporting a finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub signal: String,
    pub value: f64,
    /// Percentile in [0,1] when the comparison was percentile based
    #[serde(default)]
    pub percentile: Option<f64>,
    #[serde(default)]
    pub description: String,
}

impl Evidence {
    pub fn new(signal: impl Into<String>, value: f64, description: impl Into<String>) -> Self {
        Self {
            signal: signal.into(),
            value,
            percentile: None,
            description: description.into(),
        }
    }

    pub fn with_percentile(mut self, percentile: Option<f64>) -> Self {
        self.percentile = percentile;
        self
    }
}

/// An evidence-backed finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(default)]
    pub id: String,
    pub finder: String,
    /// Severity in [0.1, 1.0]
    pub severity: f64,
    pub scope: Scope,
    pub title: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub suggestion: String,
    /// Confidence in [0, 1]
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub effort: Effort,
}

impl Default for Finding {
    fn default() -> Self {
        Self {
            id: String::new(),
            finder: String::new(),
            severity: 0.1,
            scope: Scope::File,
            title: String::new(),
            files: Vec::new(),
            evidence: Vec::new(),
            suggestion: String::new(),
            confidence: 0.0,
            effort: Effort::Medium,
        }
    }
}

impl Finding {
    pub fn signature(&self) -> String {
        finding_signature(&self.finder, &self.files)
    }

    pub fn severity_band(&self) -> Severity {
        Severity::from_score(self.severity)
    }

    pub fn first_path(&self) -> &str {
        self.files.first().map(String::as_str).unwrap_or("")
    }
}

/// Summary of findings by severity band
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindingsSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total: usize,
}

impl FindingsSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        for f in findings {
            match f.severity_band() {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Info => summary.info += 1,
            }
            summary.total += 1;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_id_ignores_path_order() {
        let a = deterministic_finding_id("hidden_coupling", &["b.rs".into(), "a.rs".into()]);
        let b = deterministic_finding_id("hidden_coupling", &["a.rs".into(), "b.rs".into()]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_role_inference() {
        assert_eq!(FileRole::infer("tests/test_api.py"), FileRole::Test);
        assert_eq!(FileRole::infer("src/foo_test.go"), FileRole::Test);
        assert_eq!(FileRole::infer("src/main.rs"), FileRole::EntryPoint);
        assert_eq!(FileRole::infer("pkg/utils.py"), FileRole::Utility);
        assert_eq!(FileRole::infer("pkg/errors.py"), FileRole::Exception);
        assert_eq!(FileRole::infer("db/migrations/0001_init.py"), FileRole::Migration);
        assert_eq!(FileRole::infer("pkg/engine.py"), FileRole::Source);
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("src/graph/mod.rs"), "src/graph");
        assert_eq!(parent_dir("main.rs"), ".");
    }

    #[test]
    fn test_scope_order() {
        assert!(Scope::File < Scope::FilePair);
        assert!(Scope::FilePair < Scope::Module);
        assert!(Scope::Module < Scope::ModulePair);
        assert!(Scope::ModulePair < Scope::Codebase);
    }

    #[test]
    fn test_span_days() {
        let history = GitHistory::new(vec![
            CommitRecord {
                id: "a".into(),
                timestamp: 0,
                author: "x".into(),
                message: String::new(),
                files: vec![],
                intent: None,
            },
            CommitRecord {
                id: "b".into(),
                timestamp: 86_400 * 14,
                author: "x".into(),
                message: String::new(),
                files: vec![],
                intent: None,
            },
        ]);
        assert_eq!(history.span_days(), 14);
    }

    #[test]
    fn test_findings_summary() {
        let findings = vec![
            Finding {
                severity: 0.95,
                ..Default::default()
            },
            Finding {
                severity: 0.55,
                ..Default::default()
            },
        ];
        let summary = FindingsSummary::from_findings(&findings);
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.medium, 1);
        assert_eq!(summary.total, 2);
    }
}
