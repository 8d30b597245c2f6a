//! Signal fusion
//!
//! Collects the raw per-file signals of every analyzer into [`FileSignals`],
//! ranks them into percentiles, and derives the composites:
//!
//! ```text
//!   raw_risk   = Σ wᵢ·cᵢ / Σ wᵢ   over the risk components available for the file
//!                 churn          pctl(total_changes)
//!                 complexity     pctl(cognitive_load)
//!                 coupling       mean(pctl(pagerank), pctl(blast_radius_size))
//!                 coherence      1 − pctl(semantic_coherence)
//!                 incompleteness mean(pctl(stub_ratio), pctl(phantom_import_count))
//!   risk_score = pctl(raw_risk)
//!   health     = 10 · (1 − risk_score)
//! ```
//!
//! A component whose raw value is zero contributes zero, so a file that never
//! changed carries no churn risk however many other files also never changed.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::composites::{self, GlobalSignals};
use super::laplacian::health_laplacian;
use super::percentile::percentile_ranks;
use super::registry::Signal;
use super::{SignalField, Tier};
use crate::config::{AnalysisConfig, RiskWeights};
use crate::graph::{
    ArchitectureAnalysis, CloneAnalysis, SpectralSummary, StructuralAnalysis,
};
use crate::models::{FileFact, FileRole};
use crate::temporal::{AuthorDistance, TemporalAnalysis, Trajectory};

/// Risk score above which a file counts as high risk in its directory.
pub const HIGH_RISK_SCORE: f64 = 0.7;

/// Every signal known for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileSignals {
    pub path: String,
    pub role: FileRole,
    /// Parent directory
    pub module: String,

    // size and code health
    pub lines: usize,
    pub function_count: usize,
    pub class_count: usize,
    pub max_nesting: usize,
    pub impl_gini: f64,
    pub stub_ratio: f64,
    pub cognitive_load: f64,
    pub concept_count: usize,
    pub concept_entropy: Option<f64>,
    pub semantic_coherence: Option<f64>,
    pub naming_drift: Option<f64>,
    pub todo_density: f64,
    pub compression_ratio: Option<f64>,

    // graph position
    pub pagerank: f64,
    pub betweenness: f64,
    pub in_degree: usize,
    pub out_degree: usize,
    pub blast_radius_size: usize,
    pub depth: Option<usize>,
    pub is_orphan: bool,
    pub community: usize,
    pub phantom_import_count: usize,
    pub broken_call_count: usize,
    pub import_count: usize,

    // temporal, None without history
    pub total_changes: Option<usize>,
    pub churn_trajectory: Option<Trajectory>,
    pub churn_slope: Option<f64>,
    pub churn_cv: Option<f64>,
    pub change_entropy: Option<f64>,
    pub bus_factor: Option<f64>,
    pub author_entropy: Option<f64>,
    pub fix_ratio: Option<f64>,
    pub refactor_ratio: Option<f64>,

    // composites
    pub wiring_quality: f64,
    pub raw_risk: Option<f64>,
    pub risk_score: Option<f64>,
    pub file_health_score: Option<f64>,
    /// Mean neighbor health minus own health
    pub delta_h: Option<f64>,

    pub percentiles: BTreeMap<Signal, f64>,
}

impl FileSignals {
    /// Total changes, 0 when history is unavailable.
    pub fn changes(&self) -> usize {
        self.total_changes.unwrap_or(0)
    }

    pub fn percentile(&self, signal: Signal) -> Option<f64> {
        self.percentiles.get(&signal).copied()
    }

    pub fn is_volatile(&self) -> bool {
        self.churn_trajectory.is_some_and(Trajectory::is_volatile)
    }

    /// Raw value of a registered signal.
    pub fn value(&self, signal: Signal) -> Option<f64> {
        let v = match signal {
            Signal::Lines => self.lines as f64,
            Signal::FunctionCount => self.function_count as f64,
            Signal::ClassCount => self.class_count as f64,
            Signal::MaxNesting => self.max_nesting as f64,
            Signal::ImplGini => self.impl_gini,
            Signal::StubRatio => self.stub_ratio,
            Signal::CognitiveLoad => self.cognitive_load,
            Signal::ConceptCount => self.concept_count as f64,
            Signal::ConceptEntropy => return self.concept_entropy,
            Signal::SemanticCoherence => return self.semantic_coherence,
            Signal::NamingDrift => return self.naming_drift,
            Signal::TodoDensity => self.todo_density,
            Signal::CompressionRatio => return self.compression_ratio,
            Signal::Pagerank => self.pagerank,
            Signal::Betweenness => self.betweenness,
            Signal::InDegree => self.in_degree as f64,
            Signal::OutDegree => self.out_degree as f64,
            Signal::BlastRadiusSize => self.blast_radius_size as f64,
            Signal::Depth => return self.depth.map(|d| d as f64),
            Signal::PhantomImportCount => self.phantom_import_count as f64,
            Signal::BrokenCallCount => self.broken_call_count as f64,
            Signal::TotalChanges => return self.total_changes.map(|c| c as f64),
            Signal::ChurnSlope => return self.churn_slope,
            Signal::ChurnCv => return self.churn_cv,
            Signal::ChangeEntropy => return self.change_entropy,
            Signal::BusFactor => return self.bus_factor,
            Signal::AuthorEntropy => return self.author_entropy,
            Signal::FixRatio => return self.fix_ratio,
            Signal::RefactorRatio => return self.refactor_ratio,
            Signal::WiringQuality => self.wiring_quality,
            Signal::RawRisk => return self.raw_risk,
        };
        Some(v)
    }
}

/// Signals of one directory module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleSignals {
    pub path: String,
    pub file_count: usize,

    // Martin metrics
    pub afferent: usize,
    pub efferent: usize,
    /// None for a module with no cross-module edges
    pub instability: Option<f64>,
    pub abstractness: f64,
    pub main_seq_distance: f64,
    pub cohesion: f64,
    pub coupling: f64,
    pub role_consistency: f64,
    pub boundary_alignment: f64,
    pub layer: usize,
    pub health_score: f64,

    // temporal
    pub velocity: Option<f64>,
    pub coordination_cost: Option<f64>,
    pub knowledge_gini: Option<f64>,
    pub module_bus_factor: Option<f64>,

    // directory aggregates
    pub hotspot_file_count: usize,
    pub high_risk_file_count: usize,
    pub avg_complexity: f64,
    pub avg_churn: f64,
}

/// Everything fusion reads. Only the structural analysis is mandatory.
#[derive(Clone, Copy)]
pub struct FusionInputs<'a> {
    pub facts: &'a [FileFact],
    pub structural: &'a StructuralAnalysis,
    pub spectral: Option<&'a SpectralSummary>,
    pub architecture: Option<&'a ArchitectureAnalysis>,
    pub clones: Option<&'a CloneAnalysis>,
    pub temporal: Option<&'a TemporalAnalysis>,
    pub author_distances: Option<&'a [AuthorDistance]>,
}

impl<'a> FusionInputs<'a> {
    pub fn new(facts: &'a [FileFact], structural: &'a StructuralAnalysis) -> Self {
        Self {
            facts,
            structural,
            spectral: None,
            architecture: None,
            clones: None,
            temporal: None,
            author_distances: None,
        }
    }
}

// ============================================================================
// PER-FILE DERIVED SIGNALS
// ============================================================================

/// log2(lines+1) · (1 + complexity/10) · (1 + nesting/5) · (1 + impl_gini)
pub fn cognitive_load(lines: usize, complexity: f64, max_nesting: usize, impl_gini: f64) -> f64 {
    (lines as f64 + 1.0).log2()
        * (1.0 + complexity.max(0.0) / 10.0)
        * (1.0 + max_nesting as f64 / 5.0)
        * (1.0 + impl_gini)
}

/// Shannon entropy (bits) of concept frequencies and the coherence derived
/// from it. Both None when the file has no concepts.
pub fn concept_statistics(concepts: &[String]) -> (Option<f64>, Option<f64>) {
    if concepts.is_empty() {
        return (None, None);
    }
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for c in concepts {
        *counts.entry(c.as_str()).or_insert(0) += 1;
    }
    let total = concepts.len() as f64;
    let entropy: f64 = counts
        .values()
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum::<f64>()
        .max(0.0);
    let distinct = counts.len();
    let coherence = if distinct <= 1 {
        1.0
    } else {
        (1.0 - entropy / (distinct as f64).log2()).clamp(0.0, 1.0)
    };
    (Some(entropy), Some(coherence))
}

/// 1 − (0.30·orphan + 0.25·stub_ratio + 0.25·phantom share + 0.20·broken share)
pub fn wiring_quality(
    is_orphan: bool,
    stub_ratio: f64,
    phantom: usize,
    imports: usize,
    broken: usize,
    degree: usize,
) -> f64 {
    let orphan = if is_orphan { 1.0 } else { 0.0 };
    let phantom_share = phantom as f64 / imports.max(1) as f64;
    let broken_share = broken as f64 / degree.max(1) as f64;
    (1.0 - (0.30 * orphan + 0.25 * stub_ratio + 0.25 * phantom_share + 0.20 * broken_share))
        .clamp(0.0, 1.0)
}

fn base_signals(
    fact: &FileFact,
    structural: &StructuralAnalysis,
    clones: Option<&CloneAnalysis>,
    temporal: Option<&TemporalAnalysis>,
) -> FileSignals {
    let sizes: Vec<f64> = fact.function_sizes.iter().map(|&s| s as f64).collect();
    let impl_gini = crate::graph::algorithms::gini(&sizes);
    let stub_ratio = if fact.function_count == 0 {
        0.0
    } else {
        (fact.stub_count as f64 / fact.function_count as f64).min(1.0)
    };
    let (concept_entropy, semantic_coherence) = concept_statistics(&fact.concepts);
    let structure = structural.file(&fact.path).cloned().unwrap_or_default();

    let mut fs = FileSignals {
        path: fact.path.clone(),
        role: fact.role(),
        module: fact.module(),
        lines: fact.lines,
        function_count: fact.function_count,
        class_count: fact.class_count,
        max_nesting: fact.max_nesting,
        impl_gini,
        stub_ratio,
        cognitive_load: cognitive_load(fact.lines, fact.complexity, fact.max_nesting, impl_gini),
        concept_count: fact.concepts.iter().collect::<BTreeSet<_>>().len(),
        concept_entropy,
        semantic_coherence,
        naming_drift: fact.naming_drift,
        todo_density: fact.todo_count as f64 / fact.lines.max(1) as f64,
        compression_ratio: clones.and_then(|c| c.compression_ratios.get(&fact.path).copied()),
        pagerank: structure.pagerank,
        betweenness: structure.betweenness,
        in_degree: structure.in_degree,
        out_degree: structure.out_degree,
        blast_radius_size: structure.blast_radius_size,
        depth: structure.depth,
        is_orphan: structure.is_orphan,
        community: structure.community,
        phantom_import_count: structure.phantom_import_count,
        broken_call_count: structure.broken_call_count,
        import_count: structure.import_count,
        wiring_quality: wiring_quality(
            structure.is_orphan,
            stub_ratio,
            structure.phantom_import_count,
            structure.import_count,
            structure.broken_call_count,
            structure.in_degree + structure.out_degree,
        ),
        ..Default::default()
    };

    if let Some(temporal) = temporal {
        match temporal.files.get(&fact.path) {
            Some(ft) => {
                fs.total_changes = Some(ft.total_changes());
                fs.churn_trajectory = Some(ft.churn.trajectory);
                fs.churn_slope = Some(ft.churn.slope);
                fs.churn_cv = Some(ft.churn.cv);
                fs.change_entropy = Some(ft.churn.change_entropy);
                fs.bus_factor = Some(ft.bus_factor);
                fs.author_entropy = Some(ft.author_entropy);
                fs.fix_ratio = Some(ft.fix_ratio);
                fs.refactor_ratio = Some(ft.refactor_ratio);
            }
            None => {
                fs.total_changes = Some(0);
                fs.churn_trajectory = Some(Trajectory::Dormant);
                fs.churn_slope = Some(0.0);
                fs.churn_cv = Some(0.0);
                fs.change_entropy = Some(0.0);
            }
        }
    }
    fs
}

// ============================================================================
// RISK
// ============================================================================

/// Percentile of a signal, forced to 0 when the raw value is not positive.
fn positive_percentile(fs: &FileSignals, signal: Signal) -> Option<f64> {
    let value = fs.value(signal)?;
    if value <= 0.0 {
        return Some(0.0);
    }
    fs.percentile(signal)
}

fn mean_available(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// Weighted risk of one file; None when no component is available or the
/// result is not finite.
pub fn raw_risk(fs: &FileSignals, weights: &RiskWeights) -> Option<f64> {
    let components = [
        (weights.churn, positive_percentile(fs, Signal::TotalChanges)),
        (weights.complexity, positive_percentile(fs, Signal::CognitiveLoad)),
        (
            weights.coupling,
            mean_available(&[
                positive_percentile(fs, Signal::Pagerank),
                positive_percentile(fs, Signal::BlastRadiusSize),
            ]),
        ),
        (
            weights.coherence,
            fs.percentile(Signal::SemanticCoherence).map(|p| 1.0 - p),
        ),
        (
            weights.incompleteness,
            mean_available(&[
                positive_percentile(fs, Signal::StubRatio),
                positive_percentile(fs, Signal::PhantomImportCount),
            ]),
        ),
    ];

    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    for (w, c) in components {
        if let Some(c) = c {
            weighted += w * c;
            weight_sum += w;
        }
    }
    if weight_sum <= 0.0 {
        return None;
    }
    let risk = weighted / weight_sum;
    risk.is_finite().then_some(risk)
}

// ============================================================================
// FUSION
// ============================================================================

/// Build the signal field from every available analyzer output.
pub fn fuse(inputs: &FusionInputs<'_>, config: &AnalysisConfig) -> SignalField {
    let mut files: BTreeMap<String, FileSignals> = BTreeMap::new();
    for fact in inputs.facts {
        files
            .entry(fact.path.clone())
            .or_insert_with(|| base_signals(fact, inputs.structural, inputs.clones, inputs.temporal));
    }
    let tier = Tier::from_file_count(files.len());

    rank_signals(&mut files);
    score_risk(&mut files, &config.fusion.weights);

    let delta_h = health_laplacian(&files, &inputs.structural.graph);
    for (path, dh) in delta_h {
        if let Some(fs) = files.get_mut(&path) {
            fs.delta_h = Some(dh);
        }
    }

    let modules = module_signals(&files, inputs);
    let global: GlobalSignals = composites::global_signals(&files, &modules, inputs);

    debug!(
        "Signal field: {} files, {} modules, tier {}",
        files.len(),
        modules.len(),
        tier
    );

    SignalField {
        tier,
        files,
        modules,
        global,
    }
}

fn rank_signals(files: &mut BTreeMap<String, FileSignals>) {
    let paths: Vec<String> = files.keys().cloned().collect();
    for signal in Signal::ALL {
        if signal == Signal::RawRisk {
            continue;
        }
        let values: Vec<Option<f64>> = paths
            .iter()
            .map(|p| files.get(p).and_then(|fs| fs.value(signal)))
            .collect();
        let ranks = percentile_ranks(signal, &values);
        for (path, rank) in paths.iter().zip(ranks) {
            if let (Some(rank), Some(fs)) = (rank, files.get_mut(path)) {
                fs.percentiles.insert(signal, rank);
            }
        }
    }
}

fn score_risk(files: &mut BTreeMap<String, FileSignals>, weights: &RiskWeights) {
    let mut withheld = 0usize;
    for fs in files.values_mut() {
        fs.raw_risk = raw_risk(fs, weights);
        if fs.raw_risk.is_none() {
            withheld += 1;
        }
    }
    if withheld > 0 {
        warn!("raw_risk withheld for {} file(s)", withheld);
    }

    let paths: Vec<String> = files.keys().cloned().collect();
    let values: Vec<Option<f64>> = paths.iter().map(|p| files[p].raw_risk).collect();
    let ranks = percentile_ranks(Signal::RawRisk, &values);
    for (path, rank) in paths.iter().zip(ranks) {
        let Some(fs) = files.get_mut(path) else {
            continue;
        };
        let Some(rank) = rank else {
            continue;
        };
        fs.percentiles.insert(Signal::RawRisk, rank);
        fs.risk_score = Some(rank);
        fs.file_health_score = Some(10.0 * (1.0 - rank));
    }
}

/// Lower median of total changes over non-test files that changed at least once.
pub fn hotspot_median(files: &BTreeMap<String, FileSignals>) -> usize {
    let mut changes: Vec<usize> = files
        .values()
        .filter(|fs| fs.role != FileRole::Test)
        .map(FileSignals::changes)
        .filter(|&c| c > 0)
        .collect();
    if changes.is_empty() {
        return 0;
    }
    changes.sort_unstable();
    let n = changes.len();
    if n % 2 == 1 {
        changes[n / 2]
    } else {
        changes[n / 2 - 1]
    }
}

fn module_signals(
    files: &BTreeMap<String, FileSignals>,
    inputs: &FusionInputs<'_>,
) -> BTreeMap<String, ModuleSignals> {
    let mut by_module: BTreeMap<&str, Vec<&FileSignals>> = BTreeMap::new();
    for fs in files.values() {
        by_module.entry(fs.module.as_str()).or_default().push(fs);
    }
    let median = hotspot_median(files);

    by_module
        .into_iter()
        .map(|(path, members)| {
            let n = members.len().max(1) as f64;
            let mut ms = ModuleSignals {
                path: path.to_string(),
                file_count: members.len(),
                hotspot_file_count: members.iter().filter(|fs| fs.changes() > median).count(),
                high_risk_file_count: members
                    .iter()
                    .filter(|fs| fs.risk_score.is_some_and(|r| r > HIGH_RISK_SCORE))
                    .count(),
                avg_complexity: members.iter().map(|fs| fs.cognitive_load).sum::<f64>() / n,
                avg_churn: members.iter().map(|fs| fs.changes() as f64).sum::<f64>() / n,
                ..Default::default()
            };

            let mean_stub = members.iter().map(|fs| fs.stub_ratio).sum::<f64>() / n;
            if let Some(m) = inputs.architecture.and_then(|a| a.modules.get(path)) {
                ms.afferent = m.afferent;
                ms.efferent = m.efferent;
                ms.instability = m.instability;
                ms.abstractness = m.abstractness;
                ms.main_seq_distance = m.main_seq_distance;
                ms.cohesion = m.cohesion;
                ms.coupling = m.coupling;
                ms.role_consistency = m.role_consistency;
                ms.boundary_alignment = m.boundary_alignment;
                ms.layer = m.layer;
                ms.health_score = composites::module_health(m, mean_stub);
            }

            if let Some(temporal) = inputs.temporal {
                if let Some(mt) = temporal.modules.get(path) {
                    ms.velocity = Some(mt.velocity);
                    ms.coordination_cost = Some(mt.coordination_cost);
                    ms.knowledge_gini = Some(mt.knowledge_gini);
                }
                ms.module_bus_factor = composites::module_bus_factor(&members);
            }

            (path.to_string(), ms)
        })
        .collect()
}
