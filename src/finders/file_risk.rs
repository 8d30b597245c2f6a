//! File risk finders
//!
//! Single-file patterns that combine graph position, code health and change
//! history: hubs that are also complex or churning, oversized files without a
//! single concern, erratic change activity, fix-heavy history, and files much
//! less healthy than their neighbors.

use super::helpers::{margin_confidence, percent};
use super::{Finder, FinderContext};
use crate::error::PipelineResult;
use crate::models::{Effort, Evidence, Finding, Scope};
use crate::signals::{Polarity, Signal, Tier};
use crate::store::SlotName;
use crate::temporal::Trajectory;

const MIN_FILES: usize = 5;
/// Coefficient of variation above which a trajectory counts as churning.
const VOLATILE_CV: f64 = 0.5;
const TEMPORAL: &[SlotName] = &[SlotName::SignalField, SlotName::Temporal];

/// Central file that is also complex or churning
pub struct HighRiskHubFinder;

impl Finder for HighRiskHubFinder {
    fn name(&self) -> &'static str {
        "high_risk_hub"
    }

    fn description(&self) -> &'static str {
        "Central files that are also complex or changing erratically"
    }

    fn base_severity(&self) -> f64 {
        1.0
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let total = ctx.field.files.len();
        if total < MIN_FILES {
            return Ok(Vec::new());
        }

        let mut findings = Vec::new();
        for fs in ctx.files() {
            let central_pr = ctx.is_high(fs, Signal::Pagerank, 0.90);
            let central_br = ctx.is_high(fs, Signal::BlastRadiusSize, 0.90);
            if !(central_pr || central_br) {
                continue;
            }
            let complex = ctx.is_high(fs, Signal::CognitiveLoad, 0.90);
            let churning = fs.is_volatile();
            if !(complex || churning) {
                continue;
            }

            let mut pcts = Vec::new();
            let mut conditions = Vec::new();
            let mut evidence = Vec::new();
            if central_pr {
                conditions.extend(ctx.high_condition(fs, Signal::Pagerank, 0.90));
                let p = ctx.percentile(fs, Signal::Pagerank);
                pcts.extend(p);
                evidence.push(
                    Evidence::new(
                        "pagerank",
                        fs.pagerank,
                        format!("{} files import this directly", fs.in_degree),
                    )
                    .with_percentile(p),
                );
            }
            let br_pctl = ctx.percentile(fs, Signal::BlastRadiusSize);
            if central_br {
                pcts.extend(br_pctl);
                conditions.extend(ctx.high_condition(fs, Signal::BlastRadiusSize, 0.90));
            }
            evidence.push(
                Evidence::new(
                    "blast_radius_size",
                    fs.blast_radius_size as f64,
                    format!(
                        "a bug here could affect {} of {} files",
                        fs.blast_radius_size, total
                    ),
                )
                .with_percentile(br_pctl),
            );
            if complex {
                let p = ctx.percentile(fs, Signal::CognitiveLoad);
                pcts.extend(p);
                conditions.extend(ctx.high_condition(fs, Signal::CognitiveLoad, 0.90));
                evidence.push(
                    Evidence::new(
                        "cognitive_load",
                        fs.cognitive_load,
                        match p {
                            Some(p) => format!("harder to understand than {} of files", percent(p)),
                            None => format!("cognitive load {:.1}", fs.cognitive_load),
                        },
                    )
                    .with_percentile(p),
                );
            }
            if churning {
                let trajectory = fs.churn_trajectory.unwrap_or_default();
                conditions.push((fs.churn_cv.unwrap_or(0.0), VOLATILE_CV, Polarity::HighIsBad));
                evidence.push(Evidence::new(
                    "churn_trajectory",
                    0.0,
                    format!("trajectory={}, {} changes", trajectory, fs.changes()),
                ));
            }

            let strength = if pcts.is_empty() {
                0.9
            } else {
                pcts.iter().sum::<f64>() / pcts.len() as f64
            };
            let suggestion = match (complex, churning) {
                (true, true) => "This file is central, complex and frequently modified. Split it into smaller modules so changes stay local.",
                (true, false) => "This file is central and complex. Break it into smaller pieces to make changes safer and reviews easier.",
                _ => "This file is central and churning. Stabilize its interface or extract the parts that keep changing.",
            };

            findings.push(Finding {
                finder: self.name().to_string(),
                severity: self.base_severity() * strength.max(0.5),
                scope: Scope::File,
                title: format!("High-risk hub: {}", fs.path),
                files: vec![fs.path.clone()],
                evidence,
                suggestion: suggestion.to_string(),
                confidence: margin_confidence(&conditions),
                effort: Effort::Medium,
                ..Default::default()
            });
        }
        Ok(findings)
    }
}

/// Large or complex file whose contents do not form one concern
pub struct GodFileFinder;

/// Concept entropy above which a file counts as incoherent without percentiles.
const GOD_FILE_ENTROPY: f64 = 1.5;
const GOD_FILE_COHERENCE: f64 = 0.30;
const GOD_FILE_FUNCTIONS: usize = 10;

impl Finder for GodFileFinder {
    fn name(&self) -> &'static str {
        "god_file"
    }

    fn description(&self) -> &'static str {
        "Complex files that mix many unrelated concepts"
    }

    fn requires(&self) -> &'static [SlotName] {
        TEMPORAL
    }

    fn base_severity(&self) -> f64 {
        0.8
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for fs in ctx.files() {
            if fs.changes() == 0 || fs.function_count < 3 {
                continue;
            }
            let complexity = if ctx.is_high(fs, Signal::CognitiveLoad, 0.80) {
                ctx.high_condition(fs, Signal::CognitiveLoad, 0.80)
            } else if fs.function_count > GOD_FILE_FUNCTIONS {
                Some((fs.function_count as f64, GOD_FILE_FUNCTIONS as f64, Polarity::HighIsBad))
            } else {
                None
            };
            let Some(complexity) = complexity else {
                continue;
            };
            let incoherence = if ctx.uses_percentiles() {
                ctx.percentile(fs, Signal::SemanticCoherence)
                    .filter(|&p| p <= GOD_FILE_COHERENCE)
                    .map(|p| (p, GOD_FILE_COHERENCE, Polarity::HighIsGood))
            } else {
                fs.concept_entropy
                    .filter(|&h| h > GOD_FILE_ENTROPY)
                    .map(|h| (h, GOD_FILE_ENTROPY, Polarity::HighIsBad))
            };
            let Some(incoherence) = incoherence else {
                continue;
            };

            let cog_pctl = ctx.percentile(fs, Signal::CognitiveLoad);
            let coh_pctl = ctx.percentile(fs, Signal::SemanticCoherence);
            let strength = (cog_pctl.unwrap_or(0.9) + 1.0 - coh_pctl.unwrap_or(0.1)) / 2.0;

            let mut evidence = vec![
                Evidence::new(
                    "cognitive_load",
                    fs.cognitive_load,
                    format!("{} functions, {} lines", fs.function_count, fs.lines),
                )
                .with_percentile(cog_pctl),
            ];
            if let Some(coherence) = fs.semantic_coherence {
                evidence.push(
                    Evidence::new(
                        "semantic_coherence",
                        coherence,
                        format!("{} distinct concepts with little overlap", fs.concept_count),
                    )
                    .with_percentile(coh_pctl),
                );
            }
            if let Some(entropy) = fs.concept_entropy {
                evidence.push(Evidence::new(
                    "concept_entropy",
                    entropy,
                    format!("concept entropy {:.2} bits", entropy),
                ));
            }

            findings.push(Finding {
                finder: self.name().to_string(),
                severity: self.base_severity() * strength.max(0.5),
                scope: Scope::File,
                title: format!("God file: {}", fs.path),
                files: vec![fs.path.clone()],
                evidence,
                suggestion: "Split this file by concept. Group the functions that share vocabulary and move each group into its own module.".to_string(),
                confidence: margin_confidence(&[complexity, incoherence]),
                effort: Effort::High,
                ..Default::default()
            });
        }
        Ok(findings)
    }
}

/// File whose change rate never settles
pub struct UnstableFileFinder;

impl Finder for UnstableFileFinder {
    fn name(&self) -> &'static str {
        "unstable_file"
    }

    fn description(&self) -> &'static str {
        "Files with churning or spiking change activity"
    }

    fn requires(&self) -> &'static [SlotName] {
        TEMPORAL
    }

    fn base_severity(&self) -> f64 {
        0.7
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Absolute
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        if ctx.field.files.len() < MIN_FILES {
            return Ok(Vec::new());
        }
        let median = ctx.field.hotspot_median();
        let weeks = ctx.config.temporal.window_weeks;

        let mut findings = Vec::new();
        for fs in ctx.files() {
            if !fs.is_volatile() || fs.changes() <= median {
                continue;
            }
            let changes_pctl = ctx.percentile(fs, Signal::TotalChanges);
            let strength = changes_pctl.unwrap_or(0.5).max(0.3);
            let trajectory = fs.churn_trajectory.unwrap_or_default();

            findings.push(Finding {
                finder: self.name().to_string(),
                severity: self.base_severity() * strength,
                scope: Scope::File,
                title: format!("Unstable file: {} ({})", fs.path, trajectory),
                files: vec![fs.path.clone()],
                evidence: vec![
                    Evidence::new(
                        "total_changes",
                        fs.changes() as f64,
                        format!("changed {} times in {}-week windows", fs.changes(), weeks),
                    )
                    .with_percentile(changes_pctl),
                    Evidence::new(
                        "churn_trajectory",
                        fs.churn_slope.unwrap_or(0.0),
                        format!("trajectory={}", trajectory),
                    ),
                ],
                suggestion: "Find out why this file keeps changing. Settle its interface or split the volatile part out.".to_string(),
                confidence: margin_confidence(&[
                    (fs.changes() as f64, median as f64, Polarity::HighIsBad),
                    (fs.churn_cv.unwrap_or(0.0), VOLATILE_CV, Polarity::HighIsBad),
                ]),
                effort: Effort::Medium,
                ..Default::default()
            });
        }
        Ok(findings)
    }
}

/// Spiky or highly irregular changes to a non-trivial file
pub struct ThrashingCodeFinder;

const THRASH_CV: f64 = 1.5;

impl Finder for ThrashingCodeFinder {
    fn name(&self) -> &'static str {
        "thrashing_code"
    }

    fn description(&self) -> &'static str {
        "Files edited in erratic bursts"
    }

    fn requires(&self) -> &'static [SlotName] {
        TEMPORAL
    }

    fn base_severity(&self) -> f64 {
        0.75
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for fs in ctx.files() {
            if fs.changes() < 3 || fs.lines < 30 {
                continue;
            }
            let spiking = fs.churn_trajectory == Some(Trajectory::Spiking);
            let cv = fs.churn_cv.unwrap_or(0.0);
            let erratic = cv > THRASH_CV;
            if !(spiking || erratic) {
                continue;
            }

            let severity = if spiking && erratic {
                0.90
            } else if spiking {
                0.80
            } else if cv > 2.0 {
                0.85
            } else {
                self.base_severity()
            };
            let mut conditions = Vec::new();
            if erratic {
                conditions.push((cv, THRASH_CV, Polarity::HighIsBad));
            }
            if spiking {
                conditions.push((cv, VOLATILE_CV, Polarity::HighIsBad));
            }
            let trajectory = fs.churn_trajectory.unwrap_or_default();

            findings.push(Finding {
                finder: self.name().to_string(),
                severity,
                scope: Scope::File,
                title: format!("Thrashing code: {}", fs.path),
                files: vec![fs.path.clone()],
                evidence: vec![
                    Evidence::new("churn_trajectory", 0.0, format!("trajectory={}", trajectory)),
                    Evidence::new(
                        "churn_cv",
                        cv,
                        format!("change rate varies by {:.1}x its mean", cv),
                    )
                    .with_percentile(ctx.percentile(fs, Signal::ChurnCv)),
                    Evidence::new(
                        "total_changes",
                        fs.changes() as f64,
                        format!("{} changes", fs.changes()),
                    ),
                ],
                suggestion: "Edits arrive in bursts. Pin down the requirements behind them and add tests before the next round.".to_string(),
                confidence: margin_confidence(&conditions),
                effort: Effort::Medium,
                ..Default::default()
            });
        }
        Ok(findings)
    }
}

/// File where a large share of changes are bug fixes
pub struct BugMagnetFinder;

const FIX_RATIO: f64 = 0.4;
const MAGNET_MIN_CHANGES: usize = 5;

impl Finder for BugMagnetFinder {
    fn name(&self) -> &'static str {
        "bug_magnet"
    }

    fn description(&self) -> &'static str {
        "Files whose history is dominated by fixes"
    }

    fn requires(&self) -> &'static [SlotName] {
        TEMPORAL
    }

    fn base_severity(&self) -> f64 {
        0.80
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for fs in ctx.files() {
            let Some(fix) = fs.fix_ratio else {
                continue;
            };
            if fs.changes() < MAGNET_MIN_CHANGES || fix < FIX_RATIO {
                continue;
            }
            let mut severity = (self.base_severity() + (fix - FIX_RATIO) * 0.3).min(0.95);
            let confidence = margin_confidence(&[
                (fix, FIX_RATIO, Polarity::HighIsBad),
                (fs.changes() as f64, MAGNET_MIN_CHANGES as f64, Polarity::HighIsBad),
            ]);

            let mut evidence = vec![
                Evidence::new(
                    "fix_ratio",
                    fix,
                    format!("{} of {} changes were fixes", percent(fix), fs.changes()),
                )
                .with_percentile(ctx.percentile(fs, Signal::FixRatio)),
                Evidence::new(
                    "total_changes",
                    fs.changes() as f64,
                    format!("{} changes", fs.changes()),
                ),
            ];
            if fs.cognitive_load > 30.0 {
                severity = (severity + 0.05).min(0.95);
                evidence.push(
                    Evidence::new(
                        "cognitive_load",
                        fs.cognitive_load,
                        "complexity makes fixes error-prone",
                    )
                    .with_percentile(ctx.percentile(fs, Signal::CognitiveLoad)),
                );
            }

            findings.push(Finding {
                finder: self.name().to_string(),
                severity,
                scope: Scope::File,
                title: format!("Bug magnet: {} ({} fixes)", fs.path, percent(fix)),
                files: vec![fs.path.clone()],
                evidence,
                suggestion: "Review recent fixes for a shared root cause, then add tests around the code they touched.".to_string(),
                confidence,
                effort: Effort::High,
                ..Default::default()
            });
        }
        Ok(findings)
    }
}

/// Central file with a fix-heavy history
pub struct BugAttractorFinder;

impl Finder for BugAttractorFinder {
    fn name(&self) -> &'static str {
        "bug_attractor"
    }

    fn description(&self) -> &'static str {
        "Central files that keep needing fixes"
    }

    fn requires(&self) -> &'static [SlotName] {
        TEMPORAL
    }

    fn base_severity(&self) -> f64 {
        0.70
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for fs in ctx.files() {
            let Some(fix) = fs.fix_ratio else {
                continue;
            };
            if fix <= FIX_RATIO || !ctx.is_high(fs, Signal::Pagerank, 0.80) {
                continue;
            }
            let pr_pctl = ctx.percentile(fs, Signal::Pagerank);
            let mut conditions = vec![(fix, FIX_RATIO, Polarity::HighIsBad)];
            conditions.extend(ctx.high_condition(fs, Signal::Pagerank, 0.80));

            findings.push(Finding {
                finder: self.name().to_string(),
                severity: self.base_severity(),
                scope: Scope::File,
                title: format!("Bug attractor: {} ({} fixes)", fs.path, percent(fix)),
                files: vec![fs.path.clone()],
                evidence: vec![
                    Evidence::new(
                        "fix_ratio",
                        fix,
                        format!("{} of changes were fixes", percent(fix)),
                    )
                    .with_percentile(ctx.percentile(fs, Signal::FixRatio)),
                    Evidence::new(
                        "pagerank",
                        fs.pagerank,
                        format!("{} files import this directly", fs.in_degree),
                    )
                    .with_percentile(pr_pctl),
                    Evidence::new(
                        "total_changes",
                        fs.changes() as f64,
                        format!("{} changes", fs.changes()),
                    ),
                    Evidence::new(
                        "blast_radius_size",
                        fs.blast_radius_size as f64,
                        format!("{} files depend on it transitively", fs.blast_radius_size),
                    )
                    .with_percentile(ctx.percentile(fs, Signal::BlastRadiusSize)),
                ],
                suggestion: "Bugs here spread to everything that depends on this file. Strengthen its tests and narrow its interface.".to_string(),
                confidence: margin_confidence(&conditions),
                effort: Effort::Medium,
                ..Default::default()
            });
        }
        Ok(findings)
    }
}

/// File far less healthy than its graph neighborhood
pub struct WeakLinkFinder;

const DELTA_H: f64 = 0.4;

impl Finder for WeakLinkFinder {
    fn name(&self) -> &'static str {
        "weak_link"
    }

    fn description(&self) -> &'static str {
        "Files much riskier than the files around them"
    }

    fn base_severity(&self) -> f64 {
        0.75
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for fs in ctx.files() {
            let Some(dh) = fs.delta_h else {
                continue;
            };
            if dh <= DELTA_H || fs.is_orphan {
                continue;
            }
            let raw = fs.raw_risk.unwrap_or(0.0);
            findings.push(Finding {
                finder: self.name().to_string(),
                severity: (self.base_severity() + (dh - DELTA_H) * 0.25).min(0.85),
                scope: Scope::File,
                title: format!("Weak link: {}", fs.path),
                files: vec![fs.path.clone()],
                evidence: vec![
                    Evidence::new(
                        "delta_h",
                        dh,
                        format!("risk {:.2} above its neighbors' average", dh),
                    ),
                    Evidence::new("raw_risk", raw, format!("raw risk {:.2}", raw))
                        .with_percentile(ctx.percentile(fs, Signal::RawRisk)),
                    Evidence::new(
                        "risk_score",
                        fs.risk_score.unwrap_or(0.0),
                        "risk percentile in this codebase",
                    ),
                ],
                suggestion: "The surrounding files are in better shape. Bring this one up to the same standard before it drags its neighbors down.".to_string(),
                confidence: margin_confidence(&[(dh, DELTA_H, Polarity::HighIsBad)]),
                effort: Effort::Medium,
                ..Default::default()
            });
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finders::test_support::{field, file, filler, run};
    use crate::signals::FileSignals;
    use crate::store::{Artifact, SignalStore};
    use crate::temporal::TemporalAnalysis;

    fn store_with_temporal() -> SignalStore {
        let mut store = SignalStore::new();
        store.put(Artifact::Temporal(TemporalAnalysis::default())).unwrap();
        store
    }

    fn hub(pr_pctl: f64) -> FileSignals {
        let mut fs = file("src/core.py");
        fs.pagerank = 0.2;
        fs.in_degree = 12;
        fs.blast_radius_size = 5;
        fs.total_changes = Some(40);
        fs.churn_trajectory = Some(Trajectory::Churning);
        fs.percentiles.insert(Signal::Pagerank, pr_pctl);
        fs.percentiles.insert(Signal::BlastRadiusSize, 0.5);
        fs.percentiles.insert(Signal::CognitiveLoad, 0.4);
        fs
    }

    fn with_changes(mut files: Vec<FileSignals>, changes: usize) -> Vec<FileSignals> {
        for fs in &mut files {
            fs.total_changes = Some(changes);
        }
        files
    }

    #[test]
    fn test_high_risk_hub_fires_on_churning_hub() {
        let mut files = with_changes(filler(20), 2);
        files.push(hub(0.94));
        let field = field(files);

        let findings = run(&HighRiskHubFinder, &store_with_temporal(), &field);
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert!((f.severity - 0.94).abs() < 1e-9);
        let signals: Vec<&str> = f.evidence.iter().map(|e| e.signal.as_str()).collect();
        assert!(signals.contains(&"pagerank"));
        assert!(signals.contains(&"blast_radius_size"));
        assert!(signals.contains(&"churn_trajectory"));
    }

    #[test]
    fn test_high_risk_hub_needs_complexity_or_churn() {
        let mut files = with_changes(filler(20), 2);
        let mut calm = hub(0.95);
        calm.churn_trajectory = Some(Trajectory::Stable);
        files.push(calm);
        let findings = run(&HighRiskHubFinder, &store_with_temporal(), &field(files));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_high_risk_hub_respects_hotspot_filter() {
        // same change count as everything else: at the median, filtered out
        let mut files = with_changes(filler(20), 40);
        files.push(hub(0.95));
        let findings = run(&HighRiskHubFinder, &store_with_temporal(), &field(files));
        assert!(findings.is_empty());
    }

    #[test]
    fn test_god_file_in_absolute_tier() {
        let mut god = file("src/everything.py");
        god.total_changes = Some(3);
        god.function_count = 25;
        god.concept_entropy = Some(2.3);
        god.semantic_coherence = Some(0.1);
        god.cognitive_load = 50.0;
        let mut files = vec![god, file("src/a.py"), file("src/b.py")];
        files[1].total_changes = Some(1);
        let findings = run(&GodFileFinder, &store_with_temporal(), &field(files));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].effort, Effort::High);
        assert!(findings[0].evidence.iter().all(|e| e.percentile.is_none()));
        // load well past 20, entropy 0.8 bits past 1.5
        let expected = (1.0 + 0.8 / 1.5) / 2.0;
        assert!((findings[0].confidence - expected).abs() < 1e-9);
    }

    #[test]
    fn test_thrashing_severity_levels() {
        let mut both = file("src/both.py");
        both.lines = 100;
        both.total_changes = Some(10);
        both.churn_trajectory = Some(Trajectory::Spiking);
        both.churn_cv = Some(1.8);
        let mut cv_only = file("src/cv.py");
        cv_only.lines = 100;
        cv_only.total_changes = Some(10);
        cv_only.churn_cv = Some(2.5);
        let mut tiny = file("src/tiny.py");
        tiny.lines = 10;
        tiny.total_changes = Some(10);
        tiny.churn_cv = Some(3.0);

        // no temporal slot: hotspot filter off
        let findings = run(&ThrashingCodeFinder, &SignalStore::new(), &field(vec![both, cv_only, tiny]));
        assert_eq!(findings.len(), 2);
        let both = findings.iter().find(|f| f.files[0] == "src/both.py").unwrap();
        let cv = findings.iter().find(|f| f.files[0] == "src/cv.py").unwrap();
        assert_eq!(both.severity, 0.90);
        assert_eq!(cv.severity, 0.85);
        // cv 2.5 over 1.5
        assert!((cv.confidence - 2.0 / 3.0).abs() < 1e-9);
        // cv 1.8: 0.2 past the erratic threshold, fully past the spiking one
        assert!((both.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_bug_magnet_severity() {
        let mut magnet = file("src/parser.py");
        magnet.total_changes = Some(10);
        magnet.fix_ratio = Some(0.6);
        let mut few = file("src/few.py");
        few.total_changes = Some(3);
        few.fix_ratio = Some(0.9);
        let findings = run(&BugMagnetFinder, &store_with_temporal(), &field(vec![magnet, few]));
        assert_eq!(findings.len(), 1);
        assert!((findings[0].severity - 0.86).abs() < 1e-9);
        // fix ratio a third of the way to 1.0, changes double the minimum
        assert!((findings[0].confidence - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_bug_attractor_requires_centrality() {
        let mut files = with_changes(filler(20), 1);
        let mut central = file("src/central.py");
        central.total_changes = Some(20);
        central.fix_ratio = Some(0.5);
        central.percentiles.insert(Signal::Pagerank, 0.9);
        let mut edge = file("src/edge.py");
        edge.total_changes = Some(20);
        edge.fix_ratio = Some(0.5);
        edge.percentiles.insert(Signal::Pagerank, 0.3);
        files.push(central);
        files.push(edge);

        let findings = run(&BugAttractorFinder, &store_with_temporal(), &field(files));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].title, "Bug attractor: src/central.py (50% fixes)");
    }

    #[test]
    fn test_weak_link() {
        let mut weak = file("src/weak.py");
        weak.delta_h = Some(0.6);
        weak.raw_risk = Some(0.8);
        let mut orphan = file("src/orphan.py");
        orphan.delta_h = Some(0.9);
        orphan.is_orphan = true;
        let mut fine = file("src/fine.py");
        fine.delta_h = Some(-0.2);

        let findings = run(&WeakLinkFinder, &SignalStore::new(), &field(vec![weak, orphan, fine]));
        assert_eq!(findings.len(), 1);
        assert!((findings[0].severity - 0.80).abs() < 1e-9);
        assert!((findings[0].confidence - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_unstable_file_above_median() {
        let mut files = with_changes(filler(6), 2);
        let mut unstable = file("src/flaky.py");
        unstable.total_changes = Some(30);
        unstable.churn_trajectory = Some(Trajectory::Churning);
        unstable.churn_slope = Some(0.4);
        files.push(unstable);

        let findings = run(&UnstableFileFinder, &store_with_temporal(), &field(files));
        assert_eq!(findings.len(), 1);
        // absolute tier: no percentile, strength 0.5
        assert!((findings[0].severity - 0.35).abs() < 1e-9);
    }

    #[test]
    fn test_unstable_file_uses_hotspot_median() {
        let mut files = Vec::new();
        for (path, changes) in [("src/a.py", 2), ("src/b.py", 4)] {
            let mut fs = file(path);
            fs.total_changes = Some(changes);
            files.push(fs);
        }
        let mut flaky = file("src/flaky.py");
        flaky.total_changes = Some(6);
        flaky.churn_trajectory = Some(Trajectory::Churning);
        flaky.churn_cv = Some(0.8);
        files.push(flaky);
        // busy test files do not raise the bar
        for (path, changes) in [("tests/test_a.py", 50), ("tests/test_b.py", 60)] {
            let mut fs = file(path);
            fs.role = crate::models::FileRole::Test;
            fs.total_changes = Some(changes);
            files.push(fs);
        }
        let field = field(files);
        assert_eq!(field.hotspot_median(), 4);

        let findings = run(&UnstableFileFinder, &store_with_temporal(), &field);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].files, vec!["src/flaky.py"]);
    }

    #[test]
    fn test_thrashing_confidence_tracks_margin() {
        let mut barely = file("src/barely.py");
        barely.lines = 100;
        barely.total_changes = Some(10);
        barely.churn_cv = Some(1.55);
        let mut wild = file("src/wild.py");
        wild.lines = 100;
        wild.total_changes = Some(10);
        wild.churn_cv = Some(2.9);

        let findings = run(&ThrashingCodeFinder, &SignalStore::new(), &field(vec![barely, wild]));
        let confidence = |path: &str| {
            findings
                .iter()
                .find(|f| f.files[0] == path)
                .map(|f| f.confidence)
                .unwrap()
        };
        assert!(confidence("src/barely.py") < 0.05);
        assert!(confidence("src/wild.py") > 0.9);
    }
}
