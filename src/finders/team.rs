//! Team finders
//!
//! Ownership risks: important files known by one person, central code with
//! neither a second author nor tests, and coupled modules maintained by
//! disjoint groups of people.

use super::helpers::{has_test_file, margin_confidence};
use super::{Finder, FinderContext};
use crate::error::PipelineResult;
use crate::models::{Effort, Evidence, FileRole, Finding, Scope};
use crate::signals::{FileSignals, Polarity, Signal};
use crate::store::SlotName;

const TEMPORAL: &[SlotName] = &[SlotName::SignalField, SlotName::Temporal];

fn has_team(ctx: &FinderContext<'_>) -> bool {
    ctx.field.global.team_size.unwrap_or(0) > 1
}

/// Important file only one person has ever changed
pub struct TruckFactorFinder;

const TRUCK_BLAST_RADIUS: usize = 3;

impl Finder for TruckFactorFinder {
    fn name(&self) -> &'static str {
        "truck_factor"
    }

    fn description(&self) -> &'static str {
        "Important files with a single author"
    }

    fn requires(&self) -> &'static [SlotName] {
        TEMPORAL
    }

    fn base_severity(&self) -> f64 {
        0.85
    }

    fn hotspot_filtered(&self) -> bool {
        true
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        if !has_team(ctx) {
            return Ok(Vec::new());
        }
        let mut findings = Vec::new();
        for fs in ctx.files() {
            let Some(bus) = fs.bus_factor else {
                continue;
            };
            if fs.lines < 50 || bus > 1.0 || fs.changes() == 0 {
                continue;
            }
            let central = ctx.is_high(fs, Signal::Pagerank, 0.70);
            let has_blast = fs.blast_radius_size >= TRUCK_BLAST_RADIUS;
            if !(central || has_blast) {
                continue;
            }

            let pr_pctl = ctx.percentile(fs, Signal::Pagerank);
            let mut severity = self.base_severity();
            if central && has_blast {
                severity = (severity + 0.10).min(0.95);
            }
            let mut conditions = Vec::new();
            if central {
                conditions.extend(ctx.high_condition(fs, Signal::Pagerank, 0.70));
            }
            if has_blast {
                conditions.push((
                    fs.blast_radius_size as f64,
                    TRUCK_BLAST_RADIUS as f64,
                    Polarity::HighIsBad,
                ));
            }

            let mut evidence = vec![
                Evidence::new("bus_factor", bus, "only one person has ever modified this file"),
                Evidence::new(
                    "pagerank",
                    fs.pagerank,
                    match pr_pctl {
                        Some(p) => format!("more central than {:.0}% of files", p * 100.0),
                        None => format!("{} files import this directly", fs.in_degree),
                    },
                )
                .with_percentile(pr_pctl),
            ];
            if has_blast {
                evidence.push(
                    Evidence::new(
                        "blast_radius_size",
                        fs.blast_radius_size as f64,
                        format!("changes here affect {} other files", fs.blast_radius_size),
                    )
                    .with_percentile(ctx.percentile(fs, Signal::BlastRadiusSize)),
                );
            }

            findings.push(Finding {
                finder: self.name().to_string(),
                severity,
                scope: Scope::File,
                title: format!("Truck factor risk: {}", fs.path),
                files: vec![fs.path.clone()],
                evidence,
                suggestion: "Document this code and have another team member review or pair on it.".to_string(),
                confidence: margin_confidence(&conditions),
                effort: Effort::Low,
                ..Default::default()
            });
        }
        Ok(findings)
    }
}

const SILO_BUS_FACTOR: f64 = 1.5;
const SILO_PAGERANK: f64 = 0.75;

/// Central, concentrated ownership: shared by knowledge_silo and review_blindspot.
fn is_silo(ctx: &FinderContext<'_>, fs: &FileSignals) -> Option<f64> {
    let bus = fs.bus_factor?;
    (bus <= SILO_BUS_FACTOR && ctx.is_high(fs, Signal::Pagerank, SILO_PAGERANK)).then_some(bus)
}

fn silo_confidence(ctx: &FinderContext<'_>, fs: &FileSignals, bus: f64) -> f64 {
    let mut conditions = vec![(bus, SILO_BUS_FACTOR, Polarity::HighIsGood)];
    conditions.extend(ctx.high_condition(fs, Signal::Pagerank, SILO_PAGERANK));
    margin_confidence(&conditions)
}

fn centrality_evidence(ctx: &FinderContext<'_>, fs: &FileSignals) -> Evidence {
    let p = ctx.percentile(fs, Signal::Pagerank);
    let description = match p {
        Some(p) => format!("top {:.0}% by centrality", (1.0 - p) * 100.0),
        None => format!("{} files import this directly", fs.in_degree),
    };
    Evidence::new("pagerank", fs.pagerank, description).with_percentile(p)
}

/// Central file whose knowledge sits with one or two people
pub struct KnowledgeSiloFinder;

impl Finder for KnowledgeSiloFinder {
    fn name(&self) -> &'static str {
        "knowledge_silo"
    }

    fn description(&self) -> &'static str {
        "Central files with concentrated ownership"
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
        if !has_team(ctx) {
            return Ok(Vec::new());
        }
        let mut findings = Vec::new();
        for fs in ctx.files() {
            let Some(bus) = is_silo(ctx, fs) else {
                continue;
            };
            let entropy = fs.author_entropy.unwrap_or(0.0);
            findings.push(Finding {
                finder: self.name().to_string(),
                severity: self.base_severity(),
                scope: Scope::File,
                title: format!("Knowledge silo: {} (bus factor = {:.1})", fs.path, bus),
                files: vec![fs.path.clone()],
                evidence: vec![
                    Evidence::new(
                        "bus_factor",
                        bus,
                        format!("bus factor {:.1}, a single point of knowledge", bus),
                    )
                    .with_percentile(ctx.percentile(fs, Signal::BusFactor)),
                    centrality_evidence(ctx, fs),
                    Evidence::new(
                        "author_entropy",
                        entropy,
                        format!("author entropy {:.2}", entropy),
                    ),
                ],
                suggestion: "Pair-program or rotate ownership so more than one person knows this code.".to_string(),
                confidence: silo_confidence(ctx, fs, bus),
                effort: Effort::Low,
                ..Default::default()
            });
        }
        Ok(findings)
    }
}

/// Central single-owner file without tests
pub struct ReviewBlindspotFinder;

const MAX_BLINDSPOTS: usize = 10;

impl Finder for ReviewBlindspotFinder {
    fn name(&self) -> &'static str {
        "review_blindspot"
    }

    fn description(&self) -> &'static str {
        "Central single-owner files with no tests"
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
        if !has_team(ctx) {
            return Ok(Vec::new());
        }
        let mut findings = Vec::new();
        for fs in ctx.files() {
            if fs.role == FileRole::Test {
                continue;
            }
            let Some(bus) = is_silo(ctx, fs) else {
                continue;
            };
            if has_test_file(ctx.field, &fs.path) {
                continue;
            }
            findings.push(Finding {
                finder: self.name().to_string(),
                severity: self.base_severity(),
                scope: Scope::File,
                title: format!("Review blindspot: {} (no tests, single owner)", fs.path),
                files: vec![fs.path.clone()],
                evidence: vec![
                    centrality_evidence(ctx, fs),
                    Evidence::new("bus_factor", bus, format!("bus factor {:.1}", bus))
                        .with_percentile(ctx.percentile(fs, Signal::BusFactor)),
                    Evidence::new("has_test", 0.0, "no test file found"),
                ],
                suggestion: "Add tests for this file and a second reviewer for changes to it.".to_string(),
                confidence: silo_confidence(ctx, fs, bus),
                effort: Effort::Medium,
                ..Default::default()
            });
            if findings.len() >= MAX_BLINDSPOTS {
                break;
            }
        }
        Ok(findings)
    }
}

/// Coupled modules maintained by different people
pub struct ConwayViolationFinder;

const CONWAY_DISTANCE: f64 = 0.8;
const CONWAY_COUPLING: f64 = 0.3;

impl Finder for ConwayViolationFinder {
    fn name(&self) -> &'static str {
        "conway_violation"
    }

    fn description(&self) -> &'static str {
        "Structurally coupled modules with disjoint authors"
    }

    fn requires(&self) -> &'static [SlotName] {
        &[
            SlotName::SignalField,
            SlotName::AuthorDistances,
            SlotName::Architecture,
        ]
    }

    fn base_severity(&self) -> f64 {
        0.55
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let (Some(distances), Some(arch)) =
            (ctx.store.author_distances.get(), ctx.store.architecture.get())
        else {
            return Ok(Vec::new());
        };

        let mut findings = Vec::new();
        for d in distances {
            if d.distance <= CONWAY_DISTANCE {
                continue;
            }
            let coupling = arch.pair_coupling(&d.module_a, &d.module_b);
            if coupling <= CONWAY_COUPLING {
                continue;
            }
            findings.push(Finding {
                finder: self.name().to_string(),
                severity: self.base_severity(),
                scope: Scope::ModulePair,
                title: format!("Conway violation: {} <-> {}", d.module_a, d.module_b),
                files: vec![d.module_a.clone(), d.module_b.clone()],
                evidence: vec![
                    Evidence::new(
                        "author_distance",
                        d.distance,
                        format!("author distance {:.2}, {} shared author(s)", d.distance, d.shared_authors),
                    ),
                    Evidence::new(
                        "structural_coupling",
                        coupling,
                        format!("{} file edges between them", arch.edges_between(&d.module_a, &d.module_b)),
                    ),
                ],
                suggestion: "These modules depend on each other but are maintained by different people. Align ownership with the dependency or cut the coupling.".to_string(),
                confidence: margin_confidence(&[
                    (d.distance, CONWAY_DISTANCE, Polarity::HighIsBad),
                    (coupling, CONWAY_COUPLING, Polarity::HighIsBad),
                ]),
                effort: Effort::High,
                ..Default::default()
            });
        }
        Ok(findings)
    }
}
