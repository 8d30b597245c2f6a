//! Clone finders
//!
//! Pairs flagged by compression distance, alone or where both copies are
//! unfinished.

use super::helpers::{margin_confidence, percent};
use super::{Finder, FinderContext};
use crate::error::PipelineResult;
use crate::models::{Effort, Evidence, Finding, Scope};
use crate::signals::{FileSignals, Polarity, Tier};
use crate::store::SlotName;

const NCD_THRESHOLD: f64 = 0.3;

/// Near-identical file pair
pub struct CopyPasteCloneFinder;

impl Finder for CopyPasteCloneFinder {
    fn name(&self) -> &'static str {
        "copy_paste_clone"
    }

    fn description(&self) -> &'static str {
        "File pairs that are near-duplicates by compression distance"
    }

    fn requires(&self) -> &'static [SlotName] {
        &[SlotName::SignalField, SlotName::Clones]
    }

    fn base_severity(&self) -> f64 {
        0.50
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Absolute
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let Some(clones) = ctx.store.clones.get() else {
            return Ok(Vec::new());
        };

        let mut findings: Vec<Finding> = clones
            .pairs
            .iter()
            .filter(|pair| pair.ncd < NCD_THRESHOLD)
            .map(|pair| {
                let mut files = vec![pair.file_a.clone(), pair.file_b.clone()];
                files.sort();
                Finding {
                    finder: self.name().to_string(),
                    // identical files reach 0.60
                    severity: self.base_severity() + (NCD_THRESHOLD - pair.ncd) * 0.33,
                    scope: Scope::FilePair,
                    title: format!("Copy-paste clone: {} <-> {}", files[0], files[1]),
                    evidence: vec![Evidence::new(
                        "ncd",
                        pair.ncd,
                        format!("NCD={:.2} (< {} = clone)", pair.ncd, NCD_THRESHOLD),
                    )],
                    files,
                    suggestion: "Extract shared logic into a common module.".to_string(),
                    confidence: margin_confidence(&[(
                        pair.ncd,
                        NCD_THRESHOLD,
                        Polarity::HighIsGood,
                    )]),
                    effort: Effort::Medium,
                    ..Default::default()
                }
            })
            .collect();
        findings.sort_by(|a, b| b.severity.total_cmp(&a.severity));
        Ok(findings)
    }
}

const INCOMPLETE_STUB_RATIO: f64 = 0.3;

fn is_incomplete(fs: &FileSignals) -> bool {
    fs.stub_ratio > INCOMPLETE_STUB_RATIO || fs.phantom_import_count > 0
}

/// The condition that made `fs` count as incomplete, stubs first.
fn incomplete_condition(fs: &FileSignals) -> (f64, f64, Polarity) {
    if fs.stub_ratio > INCOMPLETE_STUB_RATIO {
        (fs.stub_ratio, INCOMPLETE_STUB_RATIO, Polarity::HighIsBad)
    } else {
        (fs.phantom_import_count as f64, 0.0, Polarity::HighIsBad)
    }
}

/// Clone pair where both copies are unfinished
pub struct DuplicateIncompleteFinder;

impl Finder for DuplicateIncompleteFinder {
    fn name(&self) -> &'static str {
        "duplicate_incomplete"
    }

    fn description(&self) -> &'static str {
        "Clone pairs where both files are stubs or have broken imports"
    }

    fn requires(&self) -> &'static [SlotName] {
        &[SlotName::SignalField, SlotName::Clones]
    }

    fn base_severity(&self) -> f64 {
        0.75
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Absolute
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let Some(clones) = ctx.store.clones.get() else {
            return Ok(Vec::new());
        };

        let mut findings = Vec::new();
        for pair in &clones.pairs {
            let (Some(a), Some(b)) = (ctx.field.file(&pair.file_a), ctx.field.file(&pair.file_b))
            else {
                continue;
            };
            if !(is_incomplete(a) && is_incomplete(b)) {
                continue;
            }

            let mut severity = self.base_severity();
            if a.stub_ratio > 0.5 && b.stub_ratio > 0.5 {
                severity += 0.1;
            }
            if a.phantom_import_count > 0 && b.phantom_import_count > 0 {
                severity += 0.1;
            }
            let phantoms = a.phantom_import_count + b.phantom_import_count;

            findings.push(Finding {
                finder: self.name().to_string(),
                severity: severity.min(0.90),
                scope: Scope::FilePair,
                title: format!("Duplicate incomplete: {} ≈ {}", a.path, b.path),
                files: vec![a.path.clone(), b.path.clone()],
                evidence: vec![
                    Evidence::new("ncd", pair.ncd, format!("clone similarity {:.2}", pair.ncd)),
                    Evidence::new(
                        "stub_ratio",
                        a.stub_ratio,
                        format!("{}: {} stubs", a.path, percent(a.stub_ratio)),
                    ),
                    Evidence::new(
                        "stub_ratio",
                        b.stub_ratio,
                        format!("{}: {} stubs", b.path, percent(b.stub_ratio)),
                    ),
                    Evidence::new(
                        "phantom_import_count",
                        phantoms as f64,
                        format!("{} unresolved imports across both", phantoms),
                    ),
                ],
                suggestion: "Both files are incomplete copies. Finish one implementation and delete the other.".to_string(),
                confidence: margin_confidence(&[
                    (pair.ncd, NCD_THRESHOLD, Polarity::HighIsGood),
                    incomplete_condition(a),
                    incomplete_condition(b),
                ]),
                effort: Effort::High,
                ..Default::default()
            });
        }
        findings.sort_by(|x, y| y.severity.total_cmp(&x.severity));
        Ok(findings)
    }
}
