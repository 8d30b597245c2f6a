//! Error types for the analysis pipeline

use thiserror::Error;

use crate::graph::algorithms::GraphError;
use crate::store::SlotName;

/// Errors surfaced by [`crate::run`].
///
/// Degraded inputs (no history, too few commits, tiny graphs) are never
/// errors; they show up as unavailable slots. Only configuration problems and
/// broken invariants reach the caller.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Step dependency cycle involving '{0}'")]
    StepCycle(String),

    #[error("Slot {slot} is provided by both '{first}' and '{second}'")]
    DuplicateProvider {
        slot: SlotName,
        first: String,
        second: String,
    },

    #[error("'{step}' requires slot {slot} which nothing provides")]
    UnknownSlot { step: String, slot: SlotName },

    #[error("Slot {0} was already set")]
    SlotAlreadySet(SlotName),

    #[error("Fusion weights must sum to 1.0 (got {0:.4})")]
    InvalidWeights(f64),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
