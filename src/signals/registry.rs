//! Per-file signal registry
//!
//! Every numeric per-file signal has a stable name, a polarity used for
//! presentation, an optional absolute threshold consulted in the ABSOLUTE
//! tier, and an optional percentile floor.

use serde::{Deserialize, Serialize};

/// Whether higher values of a signal are worse, better or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HighIsBad,
    HighIsGood,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    // size and code health
    Lines,
    FunctionCount,
    ClassCount,
    MaxNesting,
    ImplGini,
    StubRatio,
    CognitiveLoad,
    ConceptCount,
    ConceptEntropy,
    SemanticCoherence,
    NamingDrift,
    TodoDensity,
    CompressionRatio,
    // graph position
    Pagerank,
    Betweenness,
    InDegree,
    OutDegree,
    BlastRadiusSize,
    Depth,
    PhantomImportCount,
    BrokenCallCount,
    // temporal
    TotalChanges,
    ChurnSlope,
    ChurnCv,
    ChangeEntropy,
    BusFactor,
    AuthorEntropy,
    FixRatio,
    RefactorRatio,
    // composites
    WiringQuality,
    RawRisk,
}

impl Signal {
    pub const ALL: [Signal; 31] = [
        Signal::Lines,
        Signal::FunctionCount,
        Signal::ClassCount,
        Signal::MaxNesting,
        Signal::ImplGini,
        Signal::StubRatio,
        Signal::CognitiveLoad,
        Signal::ConceptCount,
        Signal::ConceptEntropy,
        Signal::SemanticCoherence,
        Signal::NamingDrift,
        Signal::TodoDensity,
        Signal::CompressionRatio,
        Signal::Pagerank,
        Signal::Betweenness,
        Signal::InDegree,
        Signal::OutDegree,
        Signal::BlastRadiusSize,
        Signal::Depth,
        Signal::PhantomImportCount,
        Signal::BrokenCallCount,
        Signal::TotalChanges,
        Signal::ChurnSlope,
        Signal::ChurnCv,
        Signal::ChangeEntropy,
        Signal::BusFactor,
        Signal::AuthorEntropy,
        Signal::FixRatio,
        Signal::RefactorRatio,
        Signal::WiringQuality,
        Signal::RawRisk,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Signal::Lines => "lines",
            Signal::FunctionCount => "function_count",
            Signal::ClassCount => "class_count",
            Signal::MaxNesting => "max_nesting",
            Signal::ImplGini => "impl_gini",
            Signal::StubRatio => "stub_ratio",
            Signal::CognitiveLoad => "cognitive_load",
            Signal::ConceptCount => "concept_count",
            Signal::ConceptEntropy => "concept_entropy",
            Signal::SemanticCoherence => "semantic_coherence",
            Signal::NamingDrift => "naming_drift",
            Signal::TodoDensity => "todo_density",
            Signal::CompressionRatio => "compression_ratio",
            Signal::Pagerank => "pagerank",
            Signal::Betweenness => "betweenness",
            Signal::InDegree => "in_degree",
            Signal::OutDegree => "out_degree",
            Signal::BlastRadiusSize => "blast_radius_size",
            Signal::Depth => "depth",
            Signal::PhantomImportCount => "phantom_import_count",
            Signal::BrokenCallCount => "broken_call_count",
            Signal::TotalChanges => "total_changes",
            Signal::ChurnSlope => "churn_slope",
            Signal::ChurnCv => "churn_cv",
            Signal::ChangeEntropy => "change_entropy",
            Signal::BusFactor => "bus_factor",
            Signal::AuthorEntropy => "author_entropy",
            Signal::FixRatio => "fix_ratio",
            Signal::RefactorRatio => "refactor_ratio",
            Signal::WiringQuality => "wiring_quality",
            Signal::RawRisk => "raw_risk",
        }
    }

    pub fn polarity(self) -> Polarity {
        use Signal::*;
        match self {
            SemanticCoherence | BusFactor | AuthorEntropy | WiringQuality => Polarity::HighIsGood,
            ClassCount | ConceptCount | CompressionRatio | OutDegree | Depth | ChurnSlope
            | ChangeEntropy | RefactorRatio => Polarity::Neutral,
            _ => Polarity::HighIsBad,
        }
    }

    /// Fixed raw-value threshold used instead of a percentile in small
    /// codebases. For `HighIsGood` signals the condition is "at or below".
    pub fn absolute_threshold(self) -> Option<f64> {
        match self {
            Signal::Lines => Some(500.0),
            Signal::FunctionCount => Some(30.0),
            Signal::MaxNesting => Some(4.0),
            Signal::ImplGini => Some(0.6),
            Signal::StubRatio => Some(0.5),
            Signal::ConceptEntropy => Some(1.5),
            Signal::NamingDrift => Some(0.7),
            Signal::TodoDensity => Some(0.05),
            Signal::PhantomImportCount => Some(0.0),
            Signal::BrokenCallCount => Some(0.0),
            Signal::ChurnCv => Some(1.0),
            Signal::BusFactor => Some(1.0),
            Signal::FixRatio => Some(0.4),
            Signal::Pagerank => Some(0.005),
            Signal::BlastRadiusSize => Some(5.0),
            Signal::CognitiveLoad => Some(20.0),
            _ => None,
        }
    }

    /// Raw values below the floor rank at percentile 0.
    pub fn percentile_floor(self) -> Option<f64> {
        match self {
            Signal::Pagerank => Some(0.005),
            Signal::BlastRadiusSize => Some(5.0),
            Signal::CognitiveLoad => Some(10.0),
            Signal::Lines => Some(100.0),
            _ => None,
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_unique() {
        let names: HashSet<&str> = Signal::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names.len(), Signal::ALL.len());
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(Signal::Lines.absolute_threshold(), Some(500.0));
        assert_eq!(Signal::BusFactor.absolute_threshold(), Some(1.0));
        assert_eq!(Signal::Betweenness.absolute_threshold(), None);
        assert_eq!(Signal::CognitiveLoad.percentile_floor(), Some(10.0));
    }

    #[test]
    fn test_polarity() {
        assert_eq!(Signal::BusFactor.polarity(), Polarity::HighIsGood);
        assert_eq!(Signal::Pagerank.polarity(), Polarity::HighIsBad);
        assert_eq!(Signal::Depth.polarity(), Polarity::Neutral);
    }
}
