//! Finder trait and catalogue
//!
//! A finder is a pure pattern over the [`SignalField`] (and, for a few, raw
//! store slots) that emits evidence-backed [`Finding`]s:
//!
//! - FILE: high_risk_hub, god_file, unstable_file, thrashing_code, bug_magnet,
//!   bug_attractor, truck_factor, knowledge_silo, review_blindspot, weak_link,
//!   orphan_code, phantom_imports, hollow_code, incomplete_implementation,
//!   naming_drift
//! - FILE_PAIR: hidden_coupling, dead_dependency, accidental_coupling,
//!   copy_paste_clone, duplicate_incomplete
//! - MODULE: zone_of_pain, boundary_mismatch, directory_hotspot
//! - MODULE_PAIR: layer_violation, conway_violation
//! - CODEBASE: flat_architecture, architecture_erosion
//! - meta: chronic_problem, run after every other finder

pub mod architecture;
pub mod clones;
pub mod coupling;
pub mod engine;
pub mod file_risk;
pub mod helpers;
pub mod history;
pub mod team;
pub mod wiring;

use std::sync::Arc;

use crate::config::AnalysisConfig;
use crate::error::PipelineResult;
use crate::history::HistoryStore;
use crate::models::Finding;
use crate::signals::{FileSignals, Polarity, Signal, SignalField, Tier};
use crate::store::{SignalStore, SlotName};

pub use engine::{FinderEngine, FinderEngineBuilder, FinderResult, FinderSummary};

/// Trait for all finders
///
/// # Example Implementation
///
/// ```ignore
/// pub struct LargeFileFinder;
///
/// impl Finder for LargeFileFinder {
///     fn name(&self) -> &'static str {
///         "large_file"
///     }
///
///     fn description(&self) -> &'static str {
///         "Files far larger than the rest of the codebase"
///     }
///
///     fn base_severity(&self) -> f64 {
///         0.5
///     }
///
///     fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
///         Ok(ctx
///             .files()
///             .filter(|fs| ctx.is_high(fs, Signal::Lines, 0.95))
///             .map(|fs| Finding { /* ... */ ..Default::default() })
///             .collect())
///     }
/// }
/// ```
pub trait Finder: Send + Sync {
    /// Stable identifier, used in finding signatures
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Store slots that must be ready. The signal field is always required.
    fn requires(&self) -> &'static [SlotName] {
        &[SlotName::SignalField]
    }

    fn base_severity(&self) -> f64;

    /// Whether files at or below the hotspot median are ignored
    fn hotspot_filtered(&self) -> bool {
        false
    }

    /// Lowest tier in which percentile comparisons are trusted. Below it the
    /// registry's absolute thresholds are used.
    fn tier_minimum(&self) -> Tier {
        Tier::Bayesian
    }

    /// Dependent finders run after all others and see their findings.
    fn is_dependent(&self) -> bool {
        false
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>>;
}

/// Everything a finder may read.
pub struct FinderContext<'a> {
    pub store: &'a SignalStore,
    pub field: &'a SignalField,
    pub config: &'a AnalysisConfig,
    /// Findings of independent finders, for dependent finders only
    pub prior: &'a [Finding],
    percentiles: bool,
    hotspot_median: Option<usize>,
}

impl<'a> FinderContext<'a> {
    pub fn new(store: &'a SignalStore, field: &'a SignalField, config: &'a AnalysisConfig) -> Self {
        Self {
            store,
            field,
            config,
            prior: &[],
            percentiles: field.tier.uses_percentiles(),
            hotspot_median: None,
        }
    }

    /// Context specialised for one finder's tier and hotspot policy.
    pub fn for_finder(&self, finder: &dyn Finder, prior: &'a [Finding]) -> Self {
        let tier = self.field.tier;
        let hotspot_median = (finder.hotspot_filtered()
            && self.config.engine.hotspot_filter
            && self.store.temporal.is_ready())
        .then(|| self.field.hotspot_median());
        Self {
            store: self.store,
            field: self.field,
            config: self.config,
            prior,
            percentiles: tier.uses_percentiles() && tier >= finder.tier_minimum(),
            hotspot_median,
        }
    }

    pub fn uses_percentiles(&self) -> bool {
        self.percentiles
    }

    pub fn history(&self) -> Option<&'a dyn HistoryStore> {
        self.store.snapshots.get().map(|h| h.as_ref())
    }

    /// Candidate files in path order, hotspot filtered when the finder asks.
    pub fn files(&self) -> impl Iterator<Item = &'a FileSignals> + '_ {
        self.field
            .files
            .values()
            .filter(move |fs| self.passes_hotspot(fs))
    }

    pub fn passes_hotspot(&self, fs: &FileSignals) -> bool {
        self.hotspot_median.map_or(true, |median| fs.changes() > median)
    }

    /// Hotspot check by path. Unknown paths pass.
    pub fn is_hot(&self, path: &str) -> bool {
        self.field.file(path).map_or(true, |fs| self.passes_hotspot(fs))
    }

    /// Percentile of a signal, or `None` when percentiles are not trusted.
    pub fn percentile(&self, fs: &FileSignals, signal: Signal) -> Option<f64> {
        if self.percentiles {
            fs.percentile(signal)
        } else {
            None
        }
    }

    /// Whether a signal is high: percentile at or above `pctl`, or in the
    /// absolute regime the raw value above the registry threshold. Signals
    /// without a threshold never count as high in the absolute regime.
    pub fn is_high(&self, fs: &FileSignals, signal: Signal, pctl: f64) -> bool {
        if self.percentiles {
            return fs.percentile(signal).is_some_and(|p| p >= pctl);
        }
        match (fs.value(signal), signal.absolute_threshold()) {
            (Some(v), Some(t)) => v > t,
            _ => false,
        }
    }

    /// The condition `is_high` tested, as a `margin_confidence` triple.
    pub fn high_condition(
        &self,
        fs: &FileSignals,
        signal: Signal,
        pctl: f64,
    ) -> Option<(f64, f64, Polarity)> {
        if self.percentiles {
            return fs.percentile(signal).map(|p| (p, pctl, Polarity::HighIsBad));
        }
        let value = fs.value(signal)?;
        let threshold = signal.absolute_threshold()?;
        Some((value, threshold, Polarity::HighIsBad))
    }

    /// Whether a signal is low: percentile at or below `pctl`, or the raw
    /// value at or below the registry threshold.
    pub fn is_low(&self, fs: &FileSignals, signal: Signal, pctl: f64) -> bool {
        if self.percentiles {
            return fs.percentile(signal).is_some_and(|p| p <= pctl);
        }
        match (fs.value(signal), signal.absolute_threshold()) {
            (Some(v), Some(t)) => v <= t,
            _ => false,
        }
    }

    /// Strength of a triggered condition: its percentile, or full strength in
    /// the absolute regime.
    pub fn strength(&self, fs: &FileSignals, signal: Signal) -> f64 {
        if self.percentiles {
            let p = fs.percentile(signal).unwrap_or(0.0);
            match signal.polarity() {
                Polarity::HighIsGood => 1.0 - p,
                _ => p,
            }
        } else {
            1.0
        }
    }
}

/// The full catalogue in evaluation order. `chronic_problem` is dependent
/// and always runs last.
pub fn all_finders() -> Vec<Arc<dyn Finder>> {
    vec![
        Arc::new(file_risk::HighRiskHubFinder),
        Arc::new(file_risk::GodFileFinder),
        Arc::new(file_risk::UnstableFileFinder),
        Arc::new(file_risk::ThrashingCodeFinder),
        Arc::new(file_risk::BugMagnetFinder),
        Arc::new(file_risk::BugAttractorFinder),
        Arc::new(team::TruckFactorFinder),
        Arc::new(team::KnowledgeSiloFinder),
        Arc::new(team::ReviewBlindspotFinder),
        Arc::new(file_risk::WeakLinkFinder),
        Arc::new(wiring::OrphanCodeFinder),
        Arc::new(wiring::PhantomImportsFinder),
        Arc::new(wiring::HollowCodeFinder),
        Arc::new(wiring::IncompleteImplementationFinder),
        Arc::new(wiring::NamingDriftFinder),
        Arc::new(coupling::HiddenCouplingFinder),
        Arc::new(coupling::DeadDependencyFinder),
        Arc::new(coupling::AccidentalCouplingFinder),
        Arc::new(clones::CopyPasteCloneFinder),
        Arc::new(clones::DuplicateIncompleteFinder),
        Arc::new(architecture::ZoneOfPainFinder),
        Arc::new(architecture::BoundaryMismatchFinder),
        Arc::new(architecture::DirectoryHotspotFinder),
        Arc::new(architecture::LayerViolationFinder),
        Arc::new(team::ConwayViolationFinder),
        Arc::new(architecture::FlatArchitectureFinder),
        Arc::new(history::ArchitectureErosionFinder),
        Arc::new(history::ChronicProblemFinder),
    ]
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::signals::Tier;

    /// Signal field over the given files, tier from the file count.
    pub fn field(files: Vec<FileSignals>) -> SignalField {
        let tier = Tier::from_file_count(files.len());
        SignalField {
            tier,
            files: files.into_iter().map(|fs| (fs.path.clone(), fs)).collect(),
            ..Default::default()
        }
    }

    pub fn file(path: &str) -> FileSignals {
        FileSignals {
            path: path.to_string(),
            module: crate::models::parent_dir(path),
            ..Default::default()
        }
    }

    /// `count` filler files that never trigger anything.
    pub fn filler(count: usize) -> Vec<FileSignals> {
        (0..count).map(|i| file(&format!("filler/f{:02}.py", i))).collect()
    }

    pub fn run(finder: &dyn Finder, store: &SignalStore, field: &SignalField) -> Vec<Finding> {
        let config = AnalysisConfig::default();
        let base = FinderContext::new(store, field, &config);
        let ctx = base.for_finder(finder, &[]);
        finder.find(&ctx).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalogue_is_complete() {
        let finders = all_finders();
        assert_eq!(finders.len(), 28);
        let names: HashSet<&str> = finders.iter().map(|f| f.name()).collect();
        assert_eq!(names.len(), 28);
        let dependent: Vec<&str> = finders
            .iter()
            .filter(|f| f.is_dependent())
            .map(|f| f.name())
            .collect();
        assert_eq!(dependent, vec!["chronic_problem"]);
    }

    #[test]
    fn test_absolute_regime_uses_thresholds() {
        let mut big = file("src/big.py");
        big.lines = 800;
        big.percentiles.insert(Signal::Lines, 0.1);
        let field = field(vec![big, file("src/small.py")]);
        assert_eq!(field.tier, Tier::Absolute);

        let store = SignalStore::new();
        let config = AnalysisConfig::default();
        let ctx = FinderContext::new(&store, &field, &config);
        let big = field.file("src/big.py").unwrap();
        assert!(!ctx.uses_percentiles());
        assert!(ctx.is_high(big, Signal::Lines, 0.9));
        assert!(ctx.percentile(big, Signal::Lines).is_none());
        // no absolute threshold for betweenness
        assert!(!ctx.is_high(big, Signal::Betweenness, 0.0));
    }

    #[test]
    fn test_percentile_regime() {
        let mut files = filler(20);
        let mut hub = file("src/hub.py");
        hub.percentiles.insert(Signal::Pagerank, 0.95);
        files.push(hub);
        let field = field(files);
        let store = SignalStore::new();
        let config = AnalysisConfig::default();
        let ctx = FinderContext::new(&store, &field, &config);
        let hub = field.file("src/hub.py").unwrap();
        assert!(ctx.uses_percentiles());
        assert!(ctx.is_high(hub, Signal::Pagerank, 0.90));
        assert!(!ctx.is_high(hub, Signal::Pagerank, 0.96));
        assert_eq!(ctx.strength(hub, Signal::Pagerank), 0.95);
        assert_eq!(
            ctx.high_condition(hub, Signal::Pagerank, 0.90),
            Some((0.95, 0.90, Polarity::HighIsBad))
        );
    }

    #[test]
    fn test_high_condition_in_absolute_regime() {
        let mut big = file("src/big.py");
        big.lines = 800;
        let field = field(vec![big]);
        let store = SignalStore::new();
        let config = AnalysisConfig::default();
        let ctx = FinderContext::new(&store, &field, &config);
        let big = field.file("src/big.py").unwrap();
        assert_eq!(
            ctx.high_condition(big, Signal::Lines, 0.9),
            Some((800.0, 500.0, Polarity::HighIsBad))
        );
        assert!(ctx.high_condition(big, Signal::Betweenness, 0.9).is_none());
    }
}
