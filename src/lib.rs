//! Signalscope - signal pipeline and finder engine
//!
//! Fuses the structural, temporal and team signals of a repository into a
//! [`SignalField`](signals::SignalField) and evaluates a catalogue of finders
//! over it, producing ranked, evidence-backed findings.
//!
//! ```text
//!   FileFacts ─┐
//!   GitHistory ┼─► SignalStore ─► Kernel (analyzer steps) ─► SignalField
//!   Snapshots ─┘                                                │
//!                                            FinderEngine ◄─────┘
//!                                                 │
//!                                           Vec<Finding>
//! ```
//!
//! The scanner and the history extractor are collaborators: the engine only
//! consumes their records.

pub mod config;
pub mod error;
pub mod finders;
pub mod git;
pub mod graph;
pub mod history;
pub mod kernel;
pub mod models;
pub mod signals;
pub mod store;
pub mod temporal;

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

pub use config::AnalysisConfig;
pub use error::{PipelineError, PipelineResult};
pub use finders::FinderEngine;
pub use history::HistoryStore;
pub use models::{FileFact, Finding, GitHistory};
pub use signals::SignalField;

use kernel::Kernel;
use store::SignalStore;

/// Analyze a repository's facts, with optional history.
///
/// Deterministic for identical inputs and configuration. Degraded inputs
/// yield a smaller signal field rather than an error; only configuration and
/// invariant failures are returned as `Err`.
pub fn run(
    facts: Vec<FileFact>,
    history: Option<GitHistory>,
    config: &AnalysisConfig,
) -> PipelineResult<(SignalField, Vec<Finding>)> {
    run_with_history(facts, history, None, config)
}

/// [`run`] with a store of prior snapshots for the history finders.
pub fn run_with_history(
    facts: Vec<FileFact>,
    history: Option<GitHistory>,
    snapshots: Option<Arc<dyn HistoryStore>>,
    config: &AnalysisConfig,
) -> PipelineResult<(SignalField, Vec<Finding>)> {
    config.validate()?;
    let start = Instant::now();
    let file_count = facts.len();

    let kernel = Kernel::with_default_steps(config.engine.workers)?;
    let mut store = SignalStore::with_inputs(facts, history, snapshots)?;
    kernel.execute(&mut store, config)?;

    let findings = FinderEngine::from_config(config).run(&store, config)?;
    let field = store.signal_field.get().cloned().unwrap_or_default();

    info!(
        "Analyzed {} files ({} tier): {} findings in {:?}",
        file_count,
        field.tier,
        findings.len(),
        start.elapsed()
    );
    Ok((field, findings))
}
