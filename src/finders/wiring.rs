//! Wiring finders
//!
//! Structural loose ends: files nothing imports, imports that resolve to
//! nothing, stub-heavy files, and files whose name no longer matches what is
//! in them. All thresholds here are raw values and apply in every tier.

use super::helpers::{is_package_marker, margin_confidence, percent};
use super::{Finder, FinderContext};
use crate::error::PipelineResult;
use crate::models::{Effort, Evidence, Finding, Scope};
use crate::signals::{Polarity, Signal, Tier};

const MAX_FINDINGS: usize = 10;

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// File that nothing imports and that is not an entry point
pub struct OrphanCodeFinder;

impl Finder for OrphanCodeFinder {
    fn name(&self) -> &'static str {
        "orphan_code"
    }

    fn description(&self) -> &'static str {
        "Files no other file imports"
    }

    fn base_severity(&self) -> f64 {
        0.55
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Absolute
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for fs in ctx.files() {
            if !fs.is_orphan || is_package_marker(&fs.path) {
                continue;
            }
            let mut evidence = vec![
                Evidence::new("in_degree", fs.in_degree as f64, "no files import this"),
                Evidence::new("role", 0.0, format!("classified as {}", fs.role)),
            ];
            let unreachable = fs.depth.is_none();
            if unreachable {
                evidence.push(Evidence::new("depth", -1.0, "unreachable from entry points"));
            }
            findings.push(Finding {
                finder: self.name().to_string(),
                severity: self.base_severity(),
                scope: Scope::File,
                title: format!("Orphan file: {}", fs.path),
                files: vec![fs.path.clone()],
                evidence,
                suggestion: "Wire this file into the dependency graph or remove it if it is unused."
                    .to_string(),
                confidence: margin_confidence(&[
                    (1.0, 0.0, Polarity::HighIsBad),
                    (flag(unreachable), 0.0, Polarity::HighIsBad),
                ]),
                effort: Effort::Low,
                ..Default::default()
            });
            if findings.len() >= MAX_FINDINGS {
                break;
            }
        }
        Ok(findings)
    }
}

/// Imports that resolve to no file in the codebase
pub struct PhantomImportsFinder;

impl Finder for PhantomImportsFinder {
    fn name(&self) -> &'static str {
        "phantom_imports"
    }

    fn description(&self) -> &'static str {
        "Files importing modules that do not exist"
    }

    fn base_severity(&self) -> f64 {
        0.65
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Absolute
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let mut findings: Vec<Finding> = ctx
            .files()
            .filter(|fs| fs.phantom_import_count > 0)
            .map(|fs| {
                let count = fs.phantom_import_count;
                let ratio = count as f64 / fs.import_count.max(1) as f64;
                Finding {
                    finder: self.name().to_string(),
                    severity: (self.base_severity() + 0.03 * (count - 1) as f64).min(0.80),
                    scope: Scope::File,
                    title: format!("Phantom imports: {} ({} unresolved)", fs.path, count),
                    files: vec![fs.path.clone()],
                    evidence: vec![
                        Evidence::new(
                            "phantom_import_count",
                            count as f64,
                            format!("{} unresolved import(s)", count),
                        ),
                        Evidence::new(
                            "import_count",
                            fs.import_count as f64,
                            format!("{} imports in total", fs.import_count),
                        ),
                        Evidence::new(
                            "phantom_ratio",
                            ratio,
                            format!("{} of imports are phantom", percent(ratio)),
                        ),
                    ],
                    suggestion: "Create the missing module or point the import at one that exists."
                        .to_string(),
                    confidence: margin_confidence(&[
                        (count as f64, 0.0, Polarity::HighIsBad),
                        (ratio, 0.0, Polarity::HighIsBad),
                    ]),
                    effort: Effort::Medium,
                    ..Default::default()
                }
            })
            .collect();
        findings.sort_by(|a, b| b.severity.total_cmp(&a.severity));
        findings.truncate(MAX_FINDINGS);
        Ok(findings)
    }
}

const HOLLOW_STUB: f64 = 0.5;
const HOLLOW_GINI: f64 = 0.6;

/// Mostly stubs, with the real work piled into a few functions
pub struct HollowCodeFinder;

impl Finder for HollowCodeFinder {
    fn name(&self) -> &'static str {
        "hollow_code"
    }

    fn description(&self) -> &'static str {
        "Files that are mostly stub functions"
    }

    fn base_severity(&self) -> f64 {
        0.71
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Absolute
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for fs in ctx.files() {
            if fs.function_count == 0 || fs.stub_ratio <= HOLLOW_STUB || fs.impl_gini <= HOLLOW_GINI {
                continue;
            }
            findings.push(Finding {
                finder: self.name().to_string(),
                severity: self.base_severity(),
                scope: Scope::File,
                title: format!("Hollow code: {} ({} stubs)", fs.path, percent(fs.stub_ratio)),
                files: vec![fs.path.clone()],
                evidence: vec![
                    Evidence::new(
                        "stub_ratio",
                        fs.stub_ratio,
                        format!("{} of functions are stubs", percent(fs.stub_ratio)),
                    )
                    .with_percentile(ctx.percentile(fs, Signal::StubRatio)),
                    Evidence::new(
                        "impl_gini",
                        fs.impl_gini,
                        format!("Gini {:.2}, very uneven function sizes", fs.impl_gini),
                    )
                    .with_percentile(ctx.percentile(fs, Signal::ImplGini)),
                    Evidence::new(
                        "function_count",
                        fs.function_count as f64,
                        format!("{} functions", fs.function_count),
                    ),
                ],
                suggestion: "Implement the stub functions, starting with the ones other files call."
                    .to_string(),
                confidence: margin_confidence(&[
                    (fs.stub_ratio, HOLLOW_STUB, Polarity::HighIsBad),
                    (fs.impl_gini, HOLLOW_GINI, Polarity::HighIsBad),
                ]),
                effort: Effort::Medium,
                ..Default::default()
            });
        }
        Ok(findings)
    }
}

/// Broken references, stubs, or suspiciously uniform function sizes
pub struct IncompleteImplementationFinder;

impl Finder for IncompleteImplementationFinder {
    fn name(&self) -> &'static str {
        "incomplete_implementation"
    }

    fn description(&self) -> &'static str {
        "Files with broken references or unfinished functions"
    }

    fn base_severity(&self) -> f64 {
        0.80
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Absolute
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for fs in ctx.files() {
            let phantom = fs.phantom_import_count > 0;
            let broken = fs.broken_call_count > 0;
            let stubby = fs.stub_ratio > 0.6;
            let uniform = fs.impl_gini < 0.15 && fs.function_count > 5 && fs.stub_ratio > 0.3;
            let issues = [phantom, broken, stubby, uniform].iter().filter(|&&b| b).count();
            let runtime = phantom || broken;
            if !runtime && issues < 2 {
                continue;
            }

            let mut conditions = Vec::with_capacity(issues);
            if phantom {
                conditions.push((fs.phantom_import_count as f64, 0.0, Polarity::HighIsBad));
            }
            if broken {
                conditions.push((fs.broken_call_count as f64, 0.0, Polarity::HighIsBad));
            }
            if stubby {
                conditions.push((fs.stub_ratio, 0.6, Polarity::HighIsBad));
            }
            if uniform {
                conditions.push((fs.impl_gini, 0.15, Polarity::HighIsGood));
            }

            let mut severity = self.base_severity() + 0.05 * issues as f64;
            if runtime {
                severity += 0.1;
            }

            findings.push(Finding {
                finder: self.name().to_string(),
                severity: severity.min(0.95),
                scope: Scope::File,
                title: format!("Incomplete implementation: {}", fs.path),
                files: vec![fs.path.clone()],
                evidence: vec![
                    Evidence::new(
                        "phantom_import_count",
                        fs.phantom_import_count as f64,
                        format!("{} imports not found", fs.phantom_import_count),
                    ),
                    Evidence::new(
                        "broken_call_count",
                        fs.broken_call_count as f64,
                        format!("{} calls to unknown targets", fs.broken_call_count),
                    ),
                    Evidence::new(
                        "stub_ratio",
                        fs.stub_ratio,
                        format!("{} of functions are stubs", percent(fs.stub_ratio)),
                    )
                    .with_percentile(ctx.percentile(fs, Signal::StubRatio)),
                    Evidence::new(
                        "impl_gini",
                        fs.impl_gini,
                        format!("function size Gini {:.2}", fs.impl_gini),
                    )
                    .with_percentile(ctx.percentile(fs, Signal::ImplGini)),
                ],
                suggestion: "Fix the broken imports and calls, implement the stubs, or delete the dead code.".to_string(),
                confidence: margin_confidence(&conditions),
                effort: Effort::High,
                ..Default::default()
            });
        }
        Ok(findings)
    }
}

const DRIFT: f64 = 0.7;

/// File whose contents no longer match its name
pub struct NamingDriftFinder;

impl Finder for NamingDriftFinder {
    fn name(&self) -> &'static str {
        "naming_drift"
    }

    fn description(&self) -> &'static str {
        "Files whose name does not describe their contents"
    }

    fn base_severity(&self) -> f64 {
        0.45
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Absolute
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for fs in ctx.files() {
            let Some(drift) = fs.naming_drift.filter(|&d| d > DRIFT) else {
                continue;
            };
            findings.push(Finding {
                finder: self.name().to_string(),
                severity: self.base_severity(),
                scope: Scope::File,
                title: format!("Naming drift: {} (content doesn't match name)", fs.path),
                files: vec![fs.path.clone()],
                evidence: vec![
                    Evidence::new("naming_drift", drift, format!("drift score {:.2}", drift))
                        .with_percentile(ctx.percentile(fs, Signal::NamingDrift)),
                    Evidence::new(
                        "concept_count",
                        fs.concept_count as f64,
                        format!("{} concepts in content", fs.concept_count),
                    ),
                ],
                suggestion: "Rename the file after what it actually does, or move the mismatched code out.".to_string(),
                confidence: margin_confidence(&[(drift, DRIFT, Polarity::HighIsBad)]),
                effort: Effort::Low,
                ..Default::default()
            });
        }
        Ok(findings)
    }
}
