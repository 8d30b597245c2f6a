//! Architecture finders
//!
//! Module and codebase level problems read from the Martin metrics, the
//! inferred layering and the directory aggregates of the signal field.

use super::helpers::{file_name, margin_confidence};
use super::{Finder, FinderContext};
use crate::error::PipelineResult;
use crate::models::{Effort, Evidence, Finding, Scope};
use crate::signals::fusion::HIGH_RISK_SCORE;
use crate::signals::{Polarity, Tier};
use crate::store::SlotName;

const ARCHITECTURE: &[SlotName] = &[SlotName::SignalField, SlotName::Architecture];

fn is_root(module: &str) -> bool {
    module.is_empty() || module == "."
}

const PAIN_ABSTRACTNESS: f64 = 0.3;
const PAIN_INSTABILITY: f64 = 0.3;

/// Concrete module many others depend on
pub struct ZoneOfPainFinder;

impl Finder for ZoneOfPainFinder {
    fn name(&self) -> &'static str {
        "zone_of_pain"
    }

    fn description(&self) -> &'static str {
        "Concrete, stable modules that are hard to change"
    }

    fn requires(&self) -> &'static [SlotName] {
        ARCHITECTURE
    }

    fn base_severity(&self) -> f64 {
        0.60
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let mut findings = Vec::new();
        for (path, ms) in &ctx.field.modules {
            if is_root(path) {
                continue;
            }
            // isolated modules have no instability
            let Some(instability) = ms.instability else {
                continue;
            };
            if ms.abstractness >= PAIN_ABSTRACTNESS || instability >= PAIN_INSTABILITY {
                continue;
            }
            let distance = (ms.abstractness + instability - 1.0).abs();
            let severity =
                self.base_severity() + 0.10 * (1.0 - ms.abstractness.max(instability));

            findings.push(Finding {
                finder: self.name().to_string(),
                severity: severity.min(0.70),
                scope: Scope::Module,
                title: format!(
                    "Zone of Pain: {}/ (A={:.2}, I={:.2})",
                    path, ms.abstractness, instability
                ),
                files: vec![path.clone()],
                evidence: vec![
                    Evidence::new(
                        "abstractness",
                        ms.abstractness,
                        format!("A={:.2} (< {} = concrete)", ms.abstractness, PAIN_ABSTRACTNESS),
                    ),
                    Evidence::new(
                        "instability",
                        instability,
                        format!("I={:.2} (< {} = stable)", instability, PAIN_INSTABILITY),
                    ),
                    Evidence::new(
                        "main_seq_distance",
                        distance,
                        format!("D={:.2} from the main sequence", distance),
                    ),
                ],
                suggestion: format!(
                    "Module '{}' is concrete and stable, so every change ripples outward. Extract interfaces or reduce its dependents.",
                    path
                ),
                confidence: margin_confidence(&[
                    (ms.abstractness, PAIN_ABSTRACTNESS, Polarity::HighIsGood),
                    (instability, PAIN_INSTABILITY, Polarity::HighIsGood),
                ]),
                effort: Effort::High,
                ..Default::default()
            });
        }
        findings.sort_by(|a, b| b.severity.total_cmp(&a.severity));
        Ok(findings)
    }
}

const BOUNDARY_ALIGNMENT: f64 = 0.7;
const BOUNDARY_MIN_FILES: usize = 3;
const RELOCATIONS_SHOWN: usize = 4;

/// Directory whose files cluster with other directories
pub struct BoundaryMismatchFinder;

impl Finder for BoundaryMismatchFinder {
    fn name(&self) -> &'static str {
        "boundary_mismatch"
    }

    fn description(&self) -> &'static str {
        "Directories whose files are more connected to other directories"
    }

    fn requires(&self) -> &'static [SlotName] {
        ARCHITECTURE
    }

    fn base_severity(&self) -> f64 {
        0.6
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Absolute
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let Some(architecture) = ctx.store.architecture.get() else {
            return Ok(Vec::new());
        };

        let mut findings = Vec::new();
        for bm in &architecture.boundary_mismatches {
            if is_root(&bm.module_path) {
                continue;
            }
            let misplaced: Vec<&(String, String)> = bm
                .misplaced_files
                .iter()
                .filter(|(_, target)| {
                    !is_root(target) && *target != bm.module_path && target != "unknown"
                })
                .collect();
            if misplaced.is_empty() {
                continue;
            }
            let Some(module) = architecture.modules.get(&bm.module_path) else {
                continue;
            };
            if module.file_count < BOUNDARY_MIN_FILES
                || module.boundary_alignment >= BOUNDARY_ALIGNMENT
            {
                continue;
            }
            let alignment = module.boundary_alignment;

            let mut relocations: Vec<String> = misplaced
                .iter()
                .take(RELOCATIONS_SHOWN)
                .map(|(file, target)| format!("  {} is more connected to {}/", file_name(file), target))
                .collect();
            if misplaced.len() > RELOCATIONS_SHOWN {
                relocations.push(format!("  ...and {} more", misplaced.len() - RELOCATIONS_SHOWN));
            }
            let clusters = bm.community_distribution.len();

            findings.push(Finding {
                finder: self.name().to_string(),
                severity: self.base_severity() * (1.0 - alignment).clamp(0.1, 1.0),
                scope: Scope::Module,
                title: format!("Boundary mismatch: {}/", bm.module_path),
                files: misplaced.iter().map(|(file, _)| file.clone()).collect(),
                evidence: vec![
                    Evidence::new(
                        "boundary_alignment",
                        alignment,
                        format!(
                            "only {:.0}% of files sit in this directory's dominant cluster",
                            alignment * 100.0
                        ),
                    ),
                    Evidence::new(
                        "community_count",
                        clusters as f64,
                        format!("{} distinct dependency clusters inside this directory", clusters),
                    ),
                ],
                suggestion: format!(
                    "Files in {}/ belong to {} clusters. Consider moving:\n{}",
                    bm.module_path,
                    clusters,
                    relocations.join("\n")
                ),
                confidence: margin_confidence(&[
                    (alignment, BOUNDARY_ALIGNMENT, Polarity::HighIsGood),
                    (
                        module.file_count as f64,
                        BOUNDARY_MIN_FILES as f64,
                        Polarity::HighIsBad,
                    ),
                ]),
                effort: Effort::High,
                ..Default::default()
            });
        }
        findings.sort_by(|a, b| b.severity.total_cmp(&a.severity));
        Ok(findings)
    }
}

const HOTSPOT_DIR_MIN_FILES: usize = 3;
const HOTSPOT_DIR_HIGH_RISK: usize = 2;
const HOTSPOT_DIR_SHARE: f64 = 0.5;

/// Directory where risk or churn is systemic
pub struct DirectoryHotspotFinder;

impl Finder for DirectoryHotspotFinder {
    fn name(&self) -> &'static str {
        "directory_hotspot"
    }

    fn description(&self) -> &'static str {
        "Directories where many files are high risk or active hotspots"
    }

    fn base_severity(&self) -> f64 {
        0.80
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        // risk scores are percentile based
        if !ctx.uses_percentiles() {
            return Ok(Vec::new());
        }

        let mut findings = Vec::new();
        for (path, ms) in &ctx.field.modules {
            if is_root(path)
                || ms.file_count < HOTSPOT_DIR_MIN_FILES
                || path.to_ascii_lowercase().contains("test")
            {
                continue;
            }
            let n = ms.file_count as f64;
            let high_risk_pct = ms.high_risk_file_count as f64 / n;
            let hotspot_pct = ms.hotspot_file_count as f64 / n;
            let is_high_risk = ms.high_risk_file_count >= HOTSPOT_DIR_HIGH_RISK;
            let is_hotspot = hotspot_pct > HOTSPOT_DIR_SHARE;
            if !(is_high_risk || is_hotspot) {
                continue;
            }

            let severity = if is_high_risk && is_hotspot {
                0.90
            } else if high_risk_pct > HOTSPOT_DIR_SHARE {
                0.88
            } else {
                self.base_severity()
            };
            let mut conditions = Vec::new();
            if is_high_risk {
                conditions.push((
                    ms.high_risk_file_count as f64,
                    HOTSPOT_DIR_HIGH_RISK as f64,
                    Polarity::HighIsBad,
                ));
            }
            if is_hotspot {
                conditions.push((hotspot_pct, HOTSPOT_DIR_SHARE, Polarity::HighIsBad));
            }

            let high_risk_files: Vec<String> = ctx
                .field
                .files
                .values()
                .filter(|fs| &fs.module == path && fs.risk_score.is_some_and(|r| r > HIGH_RISK_SCORE))
                .map(|fs| fs.path.clone())
                .take(5)
                .collect();

            findings.push(Finding {
                finder: self.name().to_string(),
                severity,
                scope: Scope::Module,
                title: format!("Directory hotspot: {}/", path),
                files: if high_risk_files.is_empty() {
                    vec![path.clone()]
                } else {
                    high_risk_files
                },
                evidence: vec![
                    Evidence::new(
                        "high_risk_file_count",
                        ms.high_risk_file_count as f64,
                        format!("{}/{} files are high risk", ms.high_risk_file_count, ms.file_count),
                    ),
                    Evidence::new(
                        "hotspot_file_count",
                        ms.hotspot_file_count as f64,
                        format!("{}/{} files are active hotspots", ms.hotspot_file_count, ms.file_count),
                    ),
                    Evidence::new(
                        "avg_complexity",
                        ms.avg_complexity,
                        format!("average cognitive load {:.1}", ms.avg_complexity),
                    ),
                    Evidence::new(
                        "avg_churn",
                        ms.avg_churn,
                        format!("average {:.1} changes per file", ms.avg_churn),
                    ),
                ],
                suggestion: format!(
                    "The whole of {}/ has systemic issues. Refactor it as a unit rather than file by file.",
                    path
                ),
                confidence: margin_confidence(&conditions),
                effort: Effort::High,
                ..Default::default()
            });
        }
        Ok(findings)
    }
}

/// Module importing from a higher layer
pub struct LayerViolationFinder;

impl Finder for LayerViolationFinder {
    fn name(&self) -> &'static str {
        "layer_violation"
    }

    fn description(&self) -> &'static str {
        "Module dependencies that run against the inferred layering"
    }

    fn requires(&self) -> &'static [SlotName] {
        ARCHITECTURE
    }

    fn base_severity(&self) -> f64 {
        0.52
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let Some(architecture) = ctx.store.architecture.get() else {
            return Ok(Vec::new());
        };

        let findings = architecture
            .violations
            .iter()
            .filter(|v| !is_root(&v.source_module) && !is_root(&v.target_module))
            .map(|v| Finding {
                finder: self.name().to_string(),
                severity: self.base_severity(),
                scope: Scope::ModulePair,
                title: format!(
                    "Layer violation: {}/ imports {}/ (L{}→L{})",
                    v.source_module, v.target_module, v.source_layer, v.target_layer
                ),
                files: vec![v.source_module.clone(), v.target_module.clone()],
                evidence: vec![
                    Evidence::new(
                        "source_layer",
                        v.source_layer as f64,
                        format!("{} at layer {}", v.source_module, v.source_layer),
                    ),
                    Evidence::new(
                        "target_layer",
                        v.target_layer as f64,
                        format!("{} at layer {}", v.target_module, v.target_layer),
                    ),
                    Evidence::new(
                        "edge_count",
                        v.edge_count as f64,
                        format!("{} {} import(s)", v.edge_count, v.kind),
                    ),
                ],
                suggestion: format!(
                    "'{}' at layer {} imports '{}' at layer {}. Inject the dependency or restructure.",
                    v.source_module, v.source_layer, v.target_module, v.target_layer
                ),
                confidence: margin_confidence(&[
                    (v.edge_count as f64, 1.0, Polarity::HighIsBad),
                    (v.source_layer.abs_diff(v.target_layer) as f64, 0.0, Polarity::HighIsBad),
                ]),
                effort: Effort::Medium,
                ..Default::default()
            })
            .collect();
        Ok(findings)
    }
}

const FLAT_MAX_DEPTH: usize = 1;
const FLAT_GLUE_DEFICIT: f64 = 0.5;

/// Codebase with no layering and nothing composing its leaves
pub struct FlatArchitectureFinder;

impl Finder for FlatArchitectureFinder {
    fn name(&self) -> &'static str {
        "flat_architecture"
    }

    fn description(&self) -> &'static str {
        "Codebases with no import depth and little orchestration code"
    }

    fn base_severity(&self) -> f64 {
        0.60
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Absolute
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let Some(max_depth) = ctx.field.files.values().filter_map(|fs| fs.depth).max() else {
            return Ok(Vec::new());
        };
        let global = &ctx.field.global;
        if max_depth > FLAT_MAX_DEPTH || global.glue_deficit <= FLAT_GLUE_DEFICIT {
            return Ok(Vec::new());
        }

        Ok(vec![Finding {
            finder: self.name().to_string(),
            severity: self.base_severity(),
            scope: Scope::Codebase,
            title: "Flat architecture: no layering or orchestration".to_string(),
            files: Vec::new(),
            evidence: vec![
                Evidence::new(
                    "max_depth",
                    max_depth as f64,
                    format!("max import depth {}", max_depth),
                ),
                Evidence::new(
                    "glue_deficit",
                    global.glue_deficit,
                    format!("glue deficit {:.2}", global.glue_deficit),
                ),
                Evidence::new(
                    "orphan_ratio",
                    global.orphan_ratio,
                    format!("orphan ratio {:.2}", global.orphan_ratio),
                ),
            ],
            suggestion: "Add a composition layer. Many leaf modules exist but nothing orchestrates them."
                .to_string(),
            confidence: margin_confidence(&[(
                global.glue_deficit,
                FLAT_GLUE_DEFICIT,
                Polarity::HighIsBad,
            )]),
            effort: Effort::High,
            ..Default::default()
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finders::test_support::{field, file, filler, run};
    use crate::graph::modules::ViolationKind;
    use crate::graph::{ArchitectureAnalysis, BoundaryMismatch, LayerViolation, ModuleMetrics};
    use crate::signals::ModuleSignals;
    use crate::store::{Artifact, SignalStore};

    fn arch_store(architecture: ArchitectureAnalysis) -> SignalStore {
        let mut store = SignalStore::new();
        store.put(Artifact::Architecture(architecture)).unwrap();
        store
    }

    fn module(path: &str, abstractness: f64, instability: Option<f64>) -> ModuleSignals {
        ModuleSignals {
            path: path.to_string(),
            file_count: 4,
            abstractness,
            instability,
            ..Default::default()
        }
    }

    #[test]
    fn test_zone_of_pain() {
        let mut f = field(vec![file("core/a.py")]);
        f.modules.insert("core".into(), module("core", 0.1, Some(0.2)));
        f.modules.insert("api".into(), module("api", 0.1, Some(0.8)));
        // isolated: Ca = Ce = 0
        f.modules.insert("island".into(), module("island", 0.0, None));
        let store = arch_store(ArchitectureAnalysis::default());

        let findings = run(&ZoneOfPainFinder, &store, &f);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].files, vec!["core"]);
        assert_eq!(findings[0].scope, Scope::Module);
        // 0.60 + 0.10 * (1 - 0.2)
        assert!((findings[0].severity - 0.68).abs() < 1e-9);
    }

    #[test]
    fn test_boundary_mismatch() {
        let mut architecture = ArchitectureAnalysis::default();
        architecture.modules.insert(
            "utils".into(),
            ModuleMetrics {
                path: "utils".into(),
                file_count: 4,
                boundary_alignment: 0.5,
                ..Default::default()
            },
        );
        architecture.boundary_mismatches.push(BoundaryMismatch {
            module_path: "utils".into(),
            alignment: 0.5,
            misplaced_files: vec![
                ("utils/render.py".into(), "ui".into()),
                ("utils/odd.py".into(), "utils".into()),
            ],
            community_distribution: [(0, 2), (1, 2)].into_iter().collect(),
        });
        let store = arch_store(architecture);

        let findings = run(&BoundaryMismatchFinder, &store, &field(vec![]));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].files, vec!["utils/render.py"]);
        assert!((findings[0].severity - 0.3).abs() < 1e-9);
        // alignment 0.2 short of 0.7, one file past the minimum of 3
        let expected = (0.2 / 0.7 + 1.0 / 3.0) / 2.0;
        assert!((findings[0].confidence - expected).abs() < 1e-9);
        assert!(findings[0].suggestion.contains("render.py is more connected to ui/"));
    }

    #[test]
    fn test_directory_hotspot_needs_percentiles() {
        let mut small = field(vec![file("svc/a.py")]);
        small.modules.insert(
            "svc".into(),
            ModuleSignals {
                path: "svc".into(),
                file_count: 4,
                high_risk_file_count: 3,
                hotspot_file_count: 3,
                ..Default::default()
            },
        );
        let store = SignalStore::new();
        assert!(run(&DirectoryHotspotFinder, &store, &small).is_empty());

        let mut files = filler(20);
        let mut risky = file("svc/a.py");
        risky.risk_score = Some(0.9);
        files.push(risky);
        let mut large = field(files);
        large.modules = small.modules.clone();
        let findings = run(&DirectoryHotspotFinder, &store, &large);
        assert_eq!(findings.len(), 1);
        assert!((findings[0].severity - 0.90).abs() < 1e-9);
        assert_eq!(findings[0].files, vec!["svc/a.py"]);
        // 3 high-risk files half past 2, 75% hotspots half past 50%
        assert!((findings[0].confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_layer_violation() {
        let architecture = ArchitectureAnalysis {
            violations: vec![LayerViolation {
                source_module: "db".into(),
                target_module: "api".into(),
                source_layer: 0,
                target_layer: 2,
                kind: ViolationKind::Backward,
                edge_count: 2,
            }],
            ..Default::default()
        };
        let mut files = filler(20);
        files.push(file("db/x.py"));
        let findings = run(&LayerViolationFinder, &arch_store(architecture), &field(files));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].scope, Scope::ModulePair);
        assert_eq!(findings[0].files, vec!["db", "api"]);
        assert!(findings[0].title.contains("L0→L2"));
        assert_eq!(findings[0].confidence, 1.0);
    }

    #[test]
    fn test_flat_architecture() {
        let mut a = file("a.py");
        a.depth = Some(0);
        let mut b = file("b.py");
        b.depth = Some(1);
        let mut f = field(vec![a, b]);
        f.global.glue_deficit = 0.75;
        let findings = run(&FlatArchitectureFinder, &SignalStore::new(), &f);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].scope, Scope::Codebase);
        assert!((findings[0].confidence - 0.5).abs() < 1e-9);

        f.global.glue_deficit = 0.4;
        assert!(run(&FlatArchitectureFinder, &SignalStore::new(), &f).is_empty());
    }
}
