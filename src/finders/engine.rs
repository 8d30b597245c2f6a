//! Finder execution engine with parallel support
//!
//! The FinderEngine evaluates every registered finder against a populated
//! signal store:
//! - Skips finders whose required slots are not ready
//! - Runs independent finders in parallel using rayon
//! - Runs dependent finders afterwards, with the findings collected so far
//! - Clamps, identifies, ranks and truncates the combined findings
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     FinderEngine                        │
//! ├─────────────────────────────────────────────────────────┤
//! │  1. Register finders                                    │
//! │  2. Drop skipped and unsatisfied finders                │
//! │  3. Run independent finders in parallel (rayon)         │
//! │  4. Run dependent finders sequentially                  │
//! │  5. Clamp, assign ids, rank, truncate                   │
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use super::{all_finders, Finder, FinderContext};
use crate::config::AnalysisConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{deterministic_finding_id, Finding, Severity};
use crate::store::SignalStore;

/// Lowest severity an emitted finding may carry.
pub const MIN_SEVERITY: f64 = 0.1;

/// Result from running a single finder
#[derive(Debug, Clone)]
pub struct FinderResult {
    pub finder_name: String,
    pub findings: Vec<Finding>,
    pub duration_ms: u64,
    pub success: bool,
    pub error: Option<String>,
}

impl FinderResult {
    pub fn success(finder_name: String, findings: Vec<Finding>, duration_ms: u64) -> Self {
        Self {
            finder_name,
            findings,
            duration_ms,
            success: true,
            error: None,
        }
    }

    pub fn failure(finder_name: String, error: String, duration_ms: u64) -> Self {
        Self {
            finder_name,
            findings: Vec::new(),
            duration_ms,
            success: false,
            error: Some(error),
        }
    }
}

/// Summary of one finder pass
#[derive(Debug, Clone, Default)]
pub struct FinderSummary {
    pub finders_run: usize,
    pub finders_succeeded: usize,
    pub finders_failed: usize,
    /// Finders not run because a required slot was not ready
    pub finders_skipped: usize,
    pub total_findings: usize,
    pub by_severity: HashMap<Severity, usize>,
    pub total_duration_ms: u64,
}

impl FinderSummary {
    pub fn add_result(&mut self, result: &FinderResult) {
        self.finders_run += 1;
        if result.success {
            self.finders_succeeded += 1;
        } else {
            self.finders_failed += 1;
        }
        self.total_findings += result.findings.len();
        self.total_duration_ms += result.duration_ms;

        for finding in &result.findings {
            *self.by_severity.entry(finding.severity_band()).or_insert(0) += 1;
        }
    }
}

/// Runs finders over the signal field
pub struct FinderEngine {
    finders: Vec<Arc<dyn Finder>>,
    workers: usize,
    max_findings: usize,
    skip: Vec<String>,
}

impl FinderEngine {
    /// Create an empty engine
    ///
    /// # Arguments
    /// * `workers` - Number of worker threads (0 = auto-detect)
    pub fn new(workers: usize) -> Self {
        let actual_workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
                .min(16)
        } else {
            workers
        };

        Self {
            finders: Vec::new(),
            workers: actual_workers,
            max_findings: usize::MAX,
            skip: Vec::new(),
        }
    }

    /// Engine with the full catalogue and the engine section of `config`.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let mut engine = Self::new(config.engine.workers)
            .with_max_findings(config.engine.max_findings)
            .with_skipped(config.engine.skip_finders.clone());
        engine.register_all(all_finders());
        engine
    }

    pub fn with_max_findings(mut self, max: usize) -> Self {
        self.max_findings = max;
        self
    }

    /// Finders to leave out by name
    pub fn with_skipped(mut self, names: Vec<String>) -> Self {
        self.skip = names;
        self
    }

    pub fn register(&mut self, finder: Arc<dyn Finder>) {
        debug!("Registering finder: {}", finder.name());
        self.finders.push(finder);
    }

    pub fn register_all(&mut self, finders: impl IntoIterator<Item = Arc<dyn Finder>>) {
        for finder in finders {
            self.register(finder);
        }
    }

    pub fn finder_count(&self) -> usize {
        self.finders.len()
    }

    pub fn finder_names(&self) -> Vec<&'static str> {
        self.finders.iter().map(|f| f.name()).collect()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run all finders and return the ranked findings.
    pub fn run(&self, store: &SignalStore, config: &AnalysisConfig) -> PipelineResult<Vec<Finding>> {
        let (findings, _) = self.run_with_summary(store, config)?;
        Ok(findings)
    }

    /// Run all finders, returning the ranked findings and a summary.
    ///
    /// Without a signal field nothing can be evaluated and the result is
    /// empty. A finder that fails or panics is logged and contributes no
    /// findings.
    pub fn run_with_summary(
        &self,
        store: &SignalStore,
        config: &AnalysisConfig,
    ) -> PipelineResult<(Vec<Finding>, FinderSummary)> {
        let start = Instant::now();
        let mut summary = FinderSummary::default();

        let Some(field) = store.signal_field.get() else {
            warn!("Signal field unavailable, no finders run");
            return Ok((Vec::new(), summary));
        };
        let base = FinderContext::new(store, field, config);

        let mut runnable: Vec<Arc<dyn Finder>> = Vec::new();
        for finder in &self.finders {
            if self.skip.iter().any(|s| s == finder.name()) {
                debug!("Skipping finder {}: disabled by configuration", finder.name());
                summary.finders_skipped += 1;
                continue;
            }
            let missing = store.missing(finder.requires());
            if !missing.is_empty() {
                debug!("Skipping finder {}: missing {:?}", finder.name(), missing);
                summary.finders_skipped += 1;
                continue;
            }
            runnable.push(Arc::clone(finder));
        }

        let (independent, dependent): (Vec<_>, Vec<_>) =
            runnable.into_iter().partition(|f| !f.is_dependent());

        info!(
            "Starting finders: {} independent, {} dependent on {} workers ({} tier)",
            independent.len(),
            dependent.len(),
            self.workers,
            field.tier
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| PipelineError::InvalidConfig(format!("thread pool: {}", e)))?;

        let results: Vec<FinderResult> = pool.install(|| {
            independent
                .par_iter()
                .map(|finder| self.run_single_finder(finder.as_ref(), &base, &[]))
                .collect()
        });

        let mut findings = Vec::new();
        for result in results {
            summary.add_result(&result);
            if result.success {
                findings.extend(result.findings);
            } else if let Some(err) = &result.error {
                warn!("Finder {} failed: {}", result.finder_name, err);
            }
        }

        // Dependent finders see the clamped findings of the first pass
        let mut findings = finalize(findings);
        for finder in &dependent {
            let result = self.run_single_finder(finder.as_ref(), &base, &findings);
            summary.add_result(&result);
            if result.success {
                findings.extend(finalize(result.findings));
            } else if let Some(err) = &result.error {
                warn!("Finder {} failed: {}", result.finder_name, err);
            }
        }

        rank_findings(&mut findings);
        if findings.len() > self.max_findings {
            warn!(
                "Truncating findings from {} to {} (max limit)",
                findings.len(),
                self.max_findings
            );
            findings.truncate(self.max_findings);
        }

        summary.total_duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Finders complete: {} findings from {}/{} finders in {:?}",
            findings.len(),
            summary.finders_succeeded,
            summary.finders_run,
            start.elapsed()
        );

        Ok((findings, summary))
    }

    fn run_single_finder(
        &self,
        finder: &dyn Finder,
        base: &FinderContext<'_>,
        prior: &[Finding],
    ) -> FinderResult {
        let name = finder.name().to_string();
        debug!("Running finder: {}", name);
        let start = Instant::now();

        let ctx = base.for_finder(finder, prior);
        let outcome = catch_unwind(AssertUnwindSafe(|| finder.find(&ctx)));
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(findings)) => {
                debug!(
                    "Finder {} found {} findings in {}ms",
                    name,
                    findings.len(),
                    duration_ms
                );
                FinderResult::success(name, findings, duration_ms)
            }
            Ok(Err(e)) => FinderResult::failure(name, e.to_string(), duration_ms),
            Err(panic) => {
                let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                error!("Finder {} panicked: {}", name, msg);
                FinderResult::failure(name, format!("Panic: {}", msg), duration_ms)
            }
        }
    }
}

impl Default for FinderEngine {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Clamp severity and confidence, assign ids, and drop findings whose
/// severity is not a number.
fn finalize(findings: Vec<Finding>) -> Vec<Finding> {
    findings
        .into_iter()
        .filter_map(|mut f| {
            if !f.severity.is_finite() {
                warn!("Dropping {} finding with non-finite severity", f.finder);
                return None;
            }
            f.severity = f.severity.clamp(MIN_SEVERITY, 1.0);
            f.confidence = if f.confidence.is_finite() {
                f.confidence.clamp(0.0, 1.0)
            } else {
                0.0
            };
            f.id = deterministic_finding_id(&f.finder, &f.files);
            Some(f)
        })
        .collect()
}

/// Severity descending, then scope, first path and id for a stable order.
pub fn rank_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        b.severity
            .total_cmp(&a.severity)
            .then_with(|| a.scope.cmp(&b.scope))
            .then_with(|| a.first_path().cmp(b.first_path()))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Builder for configuring a FinderEngine
pub struct FinderEngineBuilder {
    workers: usize,
    max_findings: usize,
    skip: Vec<String>,
    finders: Vec<Arc<dyn Finder>>,
}

impl FinderEngineBuilder {
    pub fn new() -> Self {
        Self {
            workers: 0,
            max_findings: usize::MAX,
            skip: Vec::new(),
            finders: Vec::new(),
        }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn max_findings(mut self, max: usize) -> Self {
        self.max_findings = max;
        self
    }

    pub fn skip(mut self, name: impl Into<String>) -> Self {
        self.skip.push(name.into());
        self
    }

    pub fn finder(mut self, finder: Arc<dyn Finder>) -> Self {
        self.finders.push(finder);
        self
    }

    pub fn finders(mut self, finders: impl IntoIterator<Item = Arc<dyn Finder>>) -> Self {
        self.finders.extend(finders);
        self
    }

    pub fn build(self) -> FinderEngine {
        let mut engine = FinderEngine::new(self.workers)
            .with_max_findings(self.max_findings)
            .with_skipped(self.skip);
        engine.register_all(self.finders);
        engine
    }
}

impl Default for FinderEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Scope;
    use crate::signals::SignalField;
    use crate::store::{Artifact, SlotName};

    struct MockFinder {
        name: &'static str,
        findings_count: usize,
        severity: f64,
        dependent: bool,
        requires: &'static [SlotName],
    }

    impl MockFinder {
        fn new(name: &'static str, findings_count: usize) -> Self {
            Self {
                name,
                findings_count,
                severity: 0.5,
                dependent: false,
                requires: &[SlotName::SignalField],
            }
        }
    }

    impl Finder for MockFinder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> &'static str {
            "Mock finder for testing"
        }

        fn requires(&self) -> &'static [SlotName] {
            self.requires
        }

        fn base_severity(&self) -> f64 {
            self.severity
        }

        fn is_dependent(&self) -> bool {
            self.dependent
        }

        fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
            if self.dependent {
                return Ok(ctx
                    .prior
                    .iter()
                    .map(|f| Finding {
                        finder: self.name.to_string(),
                        severity: f.severity * 2.0,
                        files: f.files.clone(),
                        ..Default::default()
                    })
                    .collect());
            }
            Ok((0..self.findings_count)
                .map(|i| Finding {
                    finder: self.name.to_string(),
                    severity: self.severity,
                    scope: Scope::File,
                    title: format!("Finding {}", i),
                    files: vec![format!("src/{}_{}.py", self.name, i)],
                    confidence: 2.0,
                    ..Default::default()
                })
                .collect())
        }
    }

    struct PanickingFinder;

    impl Finder for PanickingFinder {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn description(&self) -> &'static str {
            "Always panics"
        }

        fn base_severity(&self) -> f64 {
            0.5
        }

        fn find(&self, _ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
            panic!("boom");
        }
    }

    fn store_with_field() -> SignalStore {
        let mut store = SignalStore::new();
        store.put(Artifact::SignalField(SignalField::default())).unwrap();
        store
    }

    #[test]
    fn test_engine_creation() {
        let engine = FinderEngine::new(4);
        assert_eq!(engine.workers(), 4);
        assert_eq!(engine.finder_count(), 0);
    }

    #[test]
    fn test_engine_default_workers() {
        let engine = FinderEngine::default();
        assert!(engine.workers() > 0);
        assert!(engine.workers() <= 16);
    }

    #[test]
    fn test_from_config_registers_catalogue() {
        let engine = FinderEngine::from_config(&AnalysisConfig::default());
        assert_eq!(engine.finder_count(), 28);
        assert_eq!(engine.finder_names()[0], "high_risk_hub");
    }

    #[test]
    fn test_builder() {
        let engine = FinderEngineBuilder::new()
            .workers(2)
            .max_findings(3)
            .finder(Arc::new(MockFinder::new("a", 2)))
            .finder(Arc::new(MockFinder::new("b", 2)))
            .build();
        assert_eq!(engine.finder_count(), 2);

        let store = store_with_field();
        let findings = engine.run(&store, &AnalysisConfig::default()).unwrap();
        assert_eq!(findings.len(), 3);
    }

    #[test]
    fn test_findings_are_clamped_and_identified() {
        let mut low = MockFinder::new("low", 1);
        low.severity = 0.01;
        let mut high = MockFinder::new("high", 1);
        high.severity = 3.0;
        let engine = FinderEngineBuilder::new()
            .workers(1)
            .finder(Arc::new(low))
            .finder(Arc::new(high))
            .build();

        let findings = engine.run(&store_with_field(), &AnalysisConfig::default()).unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].finder, "high");
        assert_eq!(findings[0].severity, 1.0);
        assert_eq!(findings[1].severity, MIN_SEVERITY);
        for f in &findings {
            assert_eq!(f.confidence, 1.0);
            assert_eq!(f.id, deterministic_finding_id(&f.finder, &f.files));
        }
    }

    #[test]
    fn test_unmet_requirements_are_skipped() {
        let mut needs_history = MockFinder::new("needs_history", 1);
        needs_history.requires = &[SlotName::SignalField, SlotName::Temporal];
        let engine = FinderEngineBuilder::new()
            .workers(1)
            .finder(Arc::new(needs_history))
            .finder(Arc::new(MockFinder::new("plain", 1)))
            .build();

        let (findings, summary) = engine
            .run_with_summary(&store_with_field(), &AnalysisConfig::default())
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].finder, "plain");
        assert_eq!(summary.finders_skipped, 1);
        assert_eq!(summary.finders_run, 1);
    }

    #[test]
    fn test_skip_by_name() {
        let engine = FinderEngineBuilder::new()
            .workers(1)
            .skip("a")
            .finder(Arc::new(MockFinder::new("a", 1)))
            .finder(Arc::new(MockFinder::new("b", 1)))
            .build();
        let findings = engine.run(&store_with_field(), &AnalysisConfig::default()).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].finder, "b");
    }

    #[test]
    fn test_panic_is_isolated() {
        let engine = FinderEngineBuilder::new()
            .workers(2)
            .finder(Arc::new(PanickingFinder))
            .finder(Arc::new(MockFinder::new("ok", 2)))
            .build();
        let (findings, summary) = engine
            .run_with_summary(&store_with_field(), &AnalysisConfig::default())
            .unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(summary.finders_failed, 1);
        assert_eq!(summary.finders_succeeded, 1);
    }

    #[test]
    fn test_dependent_sees_prior_findings() {
        let mut meta = MockFinder::new("meta", 0);
        meta.dependent = true;
        let engine = FinderEngineBuilder::new()
            .workers(2)
            .finder(Arc::new(meta))
            .finder(Arc::new(MockFinder::new("base", 2)))
            .build();
        let findings = engine.run(&store_with_field(), &AnalysisConfig::default()).unwrap();
        assert_eq!(findings.len(), 4);
        let meta: Vec<&Finding> = findings.iter().filter(|f| f.finder == "meta").collect();
        assert_eq!(meta.len(), 2);
        assert!(meta.iter().all(|f| (f.severity - 1.0).abs() < 1e-9));
        // meta findings outrank their sources
        assert_eq!(findings[0].finder, "meta");
    }

    #[test]
    fn test_no_signal_field_is_empty() {
        let engine = FinderEngineBuilder::new()
            .finder(Arc::new(MockFinder::new("a", 3)))
            .build();
        let findings = engine.run(&SignalStore::new(), &AnalysisConfig::default()).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_rank_order() {
        let mut findings = vec![
            Finding {
                severity: 0.5,
                scope: Scope::Module,
                files: vec!["b".into()],
                ..Default::default()
            },
            Finding {
                severity: 0.5,
                scope: Scope::File,
                files: vec!["z".into()],
                ..Default::default()
            },
            Finding {
                severity: 0.9,
                scope: Scope::Codebase,
                ..Default::default()
            },
            Finding {
                severity: 0.5,
                scope: Scope::File,
                files: vec!["a".into()],
                ..Default::default()
            },
        ];
        rank_findings(&mut findings);
        assert_eq!(findings[0].severity, 0.9);
        assert_eq!(findings[1].first_path(), "a");
        assert_eq!(findings[2].first_path(), "z");
        assert_eq!(findings[3].scope, Scope::Module);
    }

    #[test]
    fn test_summary_counts_bands() {
        let mut summary = FinderSummary::default();
        let result = FinderResult::success(
            "a".into(),
            vec![
                Finding {
                    severity: 0.95,
                    ..Default::default()
                },
                Finding {
                    severity: 0.4,
                    ..Default::default()
                },
            ],
            10,
        );
        summary.add_result(&result);
        summary.add_result(&FinderResult::failure("b".into(), "err".into(), 5));
        assert_eq!(summary.finders_run, 2);
        assert_eq!(summary.finders_failed, 1);
        assert_eq!(summary.total_findings, 2);
        assert_eq!(summary.by_severity.get(&Severity::Critical), Some(&1));
        assert_eq!(summary.by_severity.get(&Severity::Low), Some(&1));
    }
}
