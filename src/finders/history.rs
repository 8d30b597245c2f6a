//! Finders that look back at prior snapshots
//!
//! Both are skipped when no history store was supplied.

use super::{Finder, FinderContext};
use crate::error::PipelineResult;
use crate::models::{Effort, Evidence, Finding, Scope};
use crate::signals::Tier;
use crate::store::SlotName;

const SNAPSHOTS: &[SlotName] = &[SlotName::SignalField, SlotName::Snapshots];

/// Layer-violation rate rising across consecutive snapshots
pub struct ArchitectureErosionFinder;

impl ArchitectureErosionFinder {
    fn suggestion(current: f64, increases: usize) -> String {
        let (urgency, action) = if current > 0.2 {
            (
                "Critical",
                "Pause feature work and fix the layer violations. Add a pre-commit check so no new ones land.",
            )
        } else if current > 0.1 {
            (
                "High",
                "Reserve time each iteration for layer violations, fail CI on new ones and document the intended layering.",
            )
        } else {
            (
                "Medium",
                "The rate is still low but trending upward. Track it and add architecture tests before violations accumulate.",
            )
        };
        format!(
            "[{} priority] Architecture integrity is degrading: the violation rate rose in {} consecutive snapshots. {}",
            urgency, increases, action
        )
    }
}

impl Finder for ArchitectureErosionFinder {
    fn name(&self) -> &'static str {
        "architecture_erosion"
    }

    fn description(&self) -> &'static str {
        "Layer-violation rate increasing over recent snapshots"
    }

    fn requires(&self) -> &'static [SlotName] {
        SNAPSHOTS
    }

    fn base_severity(&self) -> f64 {
        0.65
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Absolute
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let Some(history) = ctx.history() else {
            return Ok(Vec::new());
        };
        let min_snapshots = ctx.config.history.erosion_min_snapshots;
        let mut values = history.violation_rate_series(min_snapshots + 2);
        if let Some(current) = ctx.field.global.violation_rate {
            values.push(current);
        }
        if values.len() < min_snapshots.max(2) {
            return Ok(Vec::new());
        }

        let increases = values.windows(2).filter(|w| w[1] > w[0]).count();
        if increases + 1 < min_snapshots {
            return Ok(Vec::new());
        }
        let (first, last) = (values[0], values[values.len() - 1]);
        let total_increase = last - first;
        if total_increase < ctx.config.history.erosion_threshold {
            return Ok(Vec::new());
        }
        let rate = total_increase / values.len() as f64;

        Ok(vec![Finding {
            finder: self.name().to_string(),
            severity: (self.base_severity() + rate * 2.0).min(1.0),
            scope: Scope::Codebase,
            title: format!(
                "Architecture erosion: violation rate up {:.1}% over {} snapshots",
                total_increase * 100.0,
                values.len()
            ),
            files: Vec::new(),
            evidence: vec![
                Evidence::new(
                    "violation_rate",
                    last,
                    format!(
                        "rose from {:.1}% to {:.1}% over {} snapshots",
                        first * 100.0,
                        last * 100.0,
                        values.len()
                    ),
                ),
                Evidence::new(
                    "erosion_rate",
                    rate,
                    format!("{:.2}% average increase per snapshot", rate * 100.0),
                ),
            ],
            suggestion: Self::suggestion(last, increases),
            confidence: (increases as f64 / values.len() as f64).min(1.0),
            effort: Effort::High,
            ..Default::default()
        }])
    }
}

/// Findings that persisted, unaddressed, across prior snapshots
pub struct ChronicProblemFinder;

impl Finder for ChronicProblemFinder {
    fn name(&self) -> &'static str {
        "chronic_problem"
    }

    fn description(&self) -> &'static str {
        "Findings that have appeared in several consecutive runs"
    }

    fn requires(&self) -> &'static [SlotName] {
        SNAPSHOTS
    }

    fn base_severity(&self) -> f64 {
        0.75
    }

    fn tier_minimum(&self) -> Tier {
        Tier::Absolute
    }

    fn is_dependent(&self) -> bool {
        true
    }

    fn find(&self, ctx: &FinderContext<'_>) -> PipelineResult<Vec<Finding>> {
        let Some(history) = ctx.history() else {
            return Ok(Vec::new());
        };
        let min_snapshots = ctx.config.history.chronic_min_snapshots;
        let multiplier = ctx.config.history.chronic_multiplier;

        let mut findings = Vec::new();
        for original in ctx.prior {
            if original.finder == self.name() {
                continue;
            }
            let runs = history.lookup_persistence(&original.signature());
            if runs < min_snapshots {
                continue;
            }

            let mut evidence = vec![Evidence::new(
                "persistence",
                runs as f64,
                format!("present in {} prior runs without being addressed", runs),
            )];
            evidence.extend(original.evidence.iter().cloned());

            findings.push(Finding {
                finder: self.name().to_string(),
                severity: (original.severity * multiplier).min(1.0),
                scope: original.scope,
                title: format!("{} (unresolved for {} runs)", original.title, runs),
                files: original.files.clone(),
                evidence,
                suggestion: format!(
                    "Flagged by {} in {} runs. Prioritise a fix or suppress it explicitly. {}",
                    original.finder, runs, original.suggestion
                ),
                confidence: original.confidence,
                effort: original.effort,
                ..Default::default()
            });
        }
        Ok(findings)
    }
}
