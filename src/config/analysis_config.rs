//! Analysis configuration
//!
//! Loaded from `signalscope.toml` in the repository root, or built in code.
//! Every field has a documented default so an empty file is a valid config.
//!
//! # Configuration Format
//!
//! ```toml
//! # signalscope.toml
//!
//! [pagerank]
//! damping = 0.85
//! max_iterations = 20
//! tolerance = 1e-6
//!
//! [temporal]
//! min_commits = 10
//! window_weeks = 4
//!
//! [fusion]
//! weights = { churn = 0.30, complexity = 0.25, coupling = 0.20, coherence = 0.15, incompleteness = 0.10 }
//!
//! [engine]
//! max_findings = 100
//! workers = 0  # 0 = one per core
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};

/// File name looked up by [`load_project_config`].
pub const CONFIG_FILE_NAME: &str = "signalscope.toml";

/// Top-level configuration threaded through every component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub pagerank: PageRankConfig,
    #[serde(default)]
    pub temporal: TemporalConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub clones: CloneConfig,
    #[serde(default)]
    pub spectral: SpectralConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl AnalysisConfig {
    /// Reject configurations that cannot produce meaningful results.
    pub fn validate(&self) -> PipelineResult<()> {
        if !self.fusion.weights.is_valid() {
            return Err(PipelineError::InvalidWeights(self.fusion.weights.sum()));
        }
        if self.fusion.weights.as_array().iter().any(|w| *w < 0.0) {
            return Err(PipelineError::InvalidConfig(
                "fusion weights must be non-negative".to_string(),
            ));
        }
        let d = self.pagerank.damping;
        if !(d > 0.0 && d < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "pagerank.damping must be in (0, 1), got {}",
                d
            )));
        }
        if !(self.pagerank.tolerance > 0.0) {
            return Err(PipelineError::InvalidConfig(
                "pagerank.tolerance must be positive".to_string(),
            ));
        }
        if self.pagerank.max_iterations == 0 {
            return Err(PipelineError::InvalidConfig(
                "pagerank.max_iterations must be at least 1".to_string(),
            ));
        }
        if self.temporal.window_weeks == 0 {
            return Err(PipelineError::InvalidConfig(
                "temporal.window_weeks must be at least 1".to_string(),
            ));
        }
        if self.temporal.min_cochanges == 0 {
            return Err(PipelineError::InvalidConfig(
                "temporal.min_cochanges must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.clones.ncd_threshold) {
            return Err(PipelineError::InvalidConfig(
                "clones.ncd_threshold must be in [0, 1]".to_string(),
            ));
        }
        if self.history.chronic_multiplier < 1.0 {
            return Err(PipelineError::InvalidConfig(
                "history.chronic_multiplier must be >= 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

/// PageRank parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRankConfig {
    #[serde(default = "default_damping")]
    pub damping: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: default_damping(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

fn default_damping() -> f64 {
    0.85
}
fn default_max_iterations() -> usize {
    20
}
fn default_tolerance() -> f64 {
    1e-6
}

/// Version-control history parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalConfig {
    /// Below this many commits temporal analysis is skipped
    #[serde(default = "default_min_commits")]
    pub min_commits: usize,
    #[serde(default = "default_window_weeks")]
    pub window_weeks: u32,
    /// Commits touching more files than this are bulk changes and ignored
    #[serde(default = "default_max_files_per_commit")]
    pub max_files_per_commit: usize,
    #[serde(default = "default_min_cochanges")]
    pub min_cochanges: usize,
    #[serde(default = "default_max_commits")]
    pub max_commits: usize,
    #[serde(default = "default_extract_timeout_secs")]
    pub extract_timeout_secs: u64,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            min_commits: default_min_commits(),
            window_weeks: default_window_weeks(),
            max_files_per_commit: default_max_files_per_commit(),
            min_cochanges: default_min_cochanges(),
            max_commits: default_max_commits(),
            extract_timeout_secs: default_extract_timeout_secs(),
        }
    }
}

fn default_min_commits() -> usize {
    10
}
fn default_window_weeks() -> u32 {
    4
}
fn default_max_files_per_commit() -> usize {
    50
}
fn default_min_cochanges() -> usize {
    2
}
fn default_max_commits() -> usize {
    5000
}
fn default_extract_timeout_secs() -> u64 {
    30
}

/// Fusion parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    #[serde(default)]
    pub weights: RiskWeights,
}

/// Weights of the raw_risk composite. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    #[serde(default = "default_churn_weight")]
    pub churn: f64,
    #[serde(default = "default_complexity_weight")]
    pub complexity: f64,
    #[serde(default = "default_coupling_weight")]
    pub coupling: f64,
    #[serde(default = "default_coherence_weight")]
    pub coherence: f64,
    #[serde(default = "default_incompleteness_weight")]
    pub incompleteness: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            churn: default_churn_weight(),
            complexity: default_complexity_weight(),
            coupling: default_coupling_weight(),
            coherence: default_coherence_weight(),
            incompleteness: default_incompleteness_weight(),
        }
    }
}

fn default_churn_weight() -> f64 {
    0.30
}
fn default_complexity_weight() -> f64 {
    0.25
}
fn default_coupling_weight() -> f64 {
    0.20
}
fn default_coherence_weight() -> f64 {
    0.15
}
fn default_incompleteness_weight() -> f64 {
    0.10
}

impl RiskWeights {
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.churn,
            self.complexity,
            self.coupling,
            self.coherence,
            self.incompleteness,
        ]
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Validate that weights sum to 1.0 (with tolerance)
    pub fn is_valid(&self) -> bool {
        (self.sum() - 1.0).abs() < 0.001
    }

    /// Normalize weights to sum to 1.0
    pub fn normalize(&mut self) {
        let sum = self.sum();
        if sum > 0.0 {
            self.churn /= sum;
            self.complexity /= sum;
            self.coupling /= sum;
            self.coherence /= sum;
            self.incompleteness /= sum;
        }
    }
}

/// Compression-distance clone detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneConfig {
    #[serde(default = "default_ncd_threshold")]
    pub ncd_threshold: f64,
    #[serde(default = "default_clone_min_lines")]
    pub min_lines: usize,
    #[serde(default = "default_clone_min_bytes")]
    pub min_bytes: usize,
    /// Files beyond this count (largest first) are not compared
    #[serde(default = "default_clone_max_files")]
    pub max_files: usize,
    #[serde(default = "default_file_timeout_ms")]
    pub file_timeout_ms: u64,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            ncd_threshold: default_ncd_threshold(),
            min_lines: default_clone_min_lines(),
            min_bytes: default_clone_min_bytes(),
            max_files: default_clone_max_files(),
            file_timeout_ms: default_file_timeout_ms(),
        }
    }
}

fn default_ncd_threshold() -> f64 {
    0.3
}
fn default_clone_min_lines() -> usize {
    20
}
fn default_clone_min_bytes() -> usize {
    10
}
fn default_clone_max_files() -> usize {
    2000
}
fn default_file_timeout_ms() -> u64 {
    10_000
}

/// Spectral analysis caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralConfig {
    /// Above this many nodes only the smallest eigenvalues are computed
    #[serde(default = "default_max_dense_nodes")]
    pub max_dense_nodes: usize,
    #[serde(default = "default_max_eigenvalues")]
    pub max_eigenvalues: usize,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            max_dense_nodes: default_max_dense_nodes(),
            max_eigenvalues: default_max_eigenvalues(),
        }
    }
}

fn default_max_dense_nodes() -> usize {
    400
}
fn default_max_eigenvalues() -> usize {
    20
}

/// Finder engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_max_findings")]
    pub max_findings: usize,
    /// Worker threads for parallel stages (0 = auto)
    #[serde(default)]
    pub workers: usize,
    #[serde(default = "default_true")]
    pub hotspot_filter: bool,
    /// Finders to skip by name
    #[serde(default)]
    pub skip_finders: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_findings: default_max_findings(),
            workers: 0,
            hotspot_filter: true,
            skip_finders: Vec::new(),
        }
    }
}

fn default_max_findings() -> usize {
    100
}
fn default_true() -> bool {
    true
}

/// Cross-run history parameters (chronic_problem, architecture_erosion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_chronic_min_snapshots")]
    pub chronic_min_snapshots: usize,
    #[serde(default = "default_chronic_multiplier")]
    pub chronic_multiplier: f64,
    #[serde(default = "default_erosion_min_snapshots")]
    pub erosion_min_snapshots: usize,
    #[serde(default = "default_erosion_threshold")]
    pub erosion_threshold: f64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            chronic_min_snapshots: default_chronic_min_snapshots(),
            chronic_multiplier: default_chronic_multiplier(),
            erosion_min_snapshots: default_erosion_min_snapshots(),
            erosion_threshold: default_erosion_threshold(),
        }
    }
}

fn default_chronic_min_snapshots() -> usize {
    3
}
fn default_chronic_multiplier() -> f64 {
    1.25
}
fn default_erosion_min_snapshots() -> usize {
    3
}
fn default_erosion_threshold() -> f64 {
    0.05
}

/// Load configuration from the repository root.
///
/// Returns the default configuration if no `signalscope.toml` exists or it
/// cannot be parsed.
pub fn load_project_config(repo_path: &Path) -> AnalysisConfig {
    let toml_path = repo_path.join(CONFIG_FILE_NAME);
    if toml_path.exists() {
        match load_config(&toml_path) {
            Ok(config) => {
                debug!("Loaded config from {}", toml_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", toml_path.display(), e);
            }
        }
    }

    debug!("No config found, using defaults");
    AnalysisConfig::default()
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> PipelineResult<AnalysisConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AnalysisConfig = toml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.pagerank.damping, 0.85);
        assert_eq!(config.pagerank.max_iterations, 20);
        assert_eq!(config.pagerank.tolerance, 1e-6);
        assert_eq!(config.temporal.min_commits, 10);
        assert_eq!(config.temporal.window_weeks, 4);
        assert_eq!(config.temporal.max_files_per_commit, 50);
        assert!(config.fusion.weights.is_valid());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: AnalysisConfig = toml::from_str("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config: AnalysisConfig = toml::from_str(
            r#"
[pagerank]
damping = 0.9

[engine]
max_findings = 5
"#,
        )
        .unwrap();
        assert_eq!(config.pagerank.damping, 0.9);
        assert_eq!(config.pagerank.max_iterations, 20);
        assert_eq!(config.engine.max_findings, 5);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let mut config = AnalysisConfig::default();
        config.fusion.weights.churn = 0.5;
        match config.validate() {
            Err(PipelineError::InvalidWeights(sum)) => assert!((sum - 1.2).abs() < 1e-9),
            other => panic!("expected InvalidWeights, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_weights() {
        let mut weights = RiskWeights {
            churn: 3.0,
            complexity: 2.5,
            coupling: 2.0,
            coherence: 1.5,
            incompleteness: 1.0,
        };
        assert!(!weights.is_valid());
        weights.normalize();
        assert!(weights.is_valid());
        assert!((weights.churn - 0.30).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_damping_rejected() {
        let mut config = AnalysisConfig::default();
        config.pagerank.damping = 1.0;
        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_load_project_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_project_config(dir.path());
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_load_project_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[temporal]\nmin_commits = 3\n",
        )
        .unwrap();
        let config = load_project_config(dir.path());
        assert_eq!(config.temporal.min_commits, 3);
    }
}
