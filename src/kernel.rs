//! Step kernel
//!
//! Schedules the analyzer steps over the [`SignalStore`]. Every step declares
//! the slots it `requires`, the optional slots it reads when present (`after`)
//! and the one slot it `provides`:
//!
//! ```text
//!   file_facts ─┬─► structural ─┬─► spectral ───────────────┐
//!               │               ├─► architecture ─┐         │
//!               ├─► clones      │                 ▼         ▼
//!   git_history ┼─► temporal ───┼──────► author_distances ► signal_field
//!               └─► cochange    └───────────────────────────▲
//! ```
//!
//! Declarations are validated before anything runs. Steps are grouped into
//! dependency levels; the steps of one level run on a rayon pool and their
//! outputs are written to the store afterwards, in declaration order. A step
//! whose required slots are not ready is skipped and its slot becomes
//! `Unavailable`, so missing history propagates without special cases.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::time::Instant;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::graph::{analyze_structure, clones, modules, spectral};
use crate::models::GitHistory;
use crate::signals::{fuse, FusionInputs};
use crate::store::{Artifact, SignalStore, Slot, SlotName};
use crate::temporal::{self, authorship, cochange};

/// One analyzer in the pipeline.
///
/// Steps are pure: they read the store and return the artifact for their
/// slot, or `None` when there is nothing meaningful to compute.
pub trait Step: Send + Sync {
    fn name(&self) -> &'static str;

    /// Slots that must be ready for the step to run.
    fn requires(&self) -> &'static [SlotName];

    /// Slots read when ready. Ordering only; absence does not skip the step.
    fn after(&self) -> &'static [SlotName] {
        &[]
    }

    fn provides(&self) -> SlotName;

    fn run(&self, store: &SignalStore, config: &AnalysisConfig) -> PipelineResult<Option<Artifact>>;
}

/// Read a slot a step declared as required.
fn ready<'a, T>(slot: &'a Slot<T>, name: SlotName) -> PipelineResult<&'a T> {
    slot.get()
        .ok_or_else(|| PipelineError::Invariant(format!("slot {} read before it was ready", name)))
}

enum Outcome {
    Skipped(Vec<SlotName>),
    Produced(Option<Artifact>),
}

/// Validated step schedule.
pub struct Kernel {
    steps: Vec<Box<dyn Step>>,
    levels: Vec<Vec<usize>>,
    workers: usize,
}

impl Kernel {
    /// Validate the step declarations and compute the schedule.
    ///
    /// Fails on duplicate providers, required slots nothing provides, and
    /// dependency cycles.
    pub fn new(steps: Vec<Box<dyn Step>>, workers: usize) -> PipelineResult<Self> {
        let levels = schedule(&steps)?;
        let workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
                .min(16)
        } else {
            workers
        };
        Ok(Self {
            steps,
            levels,
            workers,
        })
    }

    /// Kernel over the built-in analyzer steps.
    pub fn with_default_steps(workers: usize) -> PipelineResult<Self> {
        Self::new(default_steps(), workers)
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Dependency levels as step names.
    pub fn levels(&self) -> Vec<Vec<&'static str>> {
        self.levels
            .iter()
            .map(|level| level.iter().map(|&i| self.steps[i].name()).collect())
            .collect()
    }

    /// Run every step, writing its slot.
    pub fn execute(&self, store: &mut SignalStore, config: &AnalysisConfig) -> PipelineResult<()> {
        let start = Instant::now();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| PipelineError::InvalidConfig(format!("thread pool: {}", e)))?;

        for level in &self.levels {
            let outcomes: Vec<(usize, PipelineResult<Outcome>)> = {
                let snapshot: &SignalStore = store;
                pool.install(|| {
                    level
                        .par_iter()
                        .map(|&i| (i, self.run_step(i, snapshot, config)))
                        .collect()
                })
            };

            for (i, outcome) in outcomes {
                let step = &self.steps[i];
                match outcome? {
                    Outcome::Skipped(missing) => {
                        debug!("Skipping step {}: missing {:?}", step.name(), missing);
                        store.mark_unavailable(step.provides())?;
                    }
                    Outcome::Produced(Some(artifact)) => {
                        if artifact.slot() != step.provides() {
                            return Err(PipelineError::Invariant(format!(
                                "step {} produced {} but declares {}",
                                step.name(),
                                artifact.slot(),
                                step.provides()
                            )));
                        }
                        store.put(artifact)?;
                    }
                    Outcome::Produced(None) => {
                        debug!("Step {} produced nothing", step.name());
                        store.mark_unavailable(step.provides())?;
                    }
                }
            }
        }

        info!(
            "Analysis steps complete: {} steps in {:?}",
            self.steps.len(),
            start.elapsed()
        );
        Ok(())
    }

    fn run_step(
        &self,
        index: usize,
        store: &SignalStore,
        config: &AnalysisConfig,
    ) -> PipelineResult<Outcome> {
        let step = &self.steps[index];
        let missing = store.missing(step.requires());
        if !missing.is_empty() {
            return Ok(Outcome::Skipped(missing));
        }
        let start = Instant::now();
        let artifact = step.run(store, config)?;
        debug!("Step {} finished in {:?}", step.name(), start.elapsed());
        Ok(Outcome::Produced(artifact))
    }
}

/// Validate declarations and group steps into dependency levels.
fn schedule(steps: &[Box<dyn Step>]) -> PipelineResult<Vec<Vec<usize>>> {
    let mut providers: BTreeMap<SlotName, usize> = BTreeMap::new();
    for (i, step) in steps.iter().enumerate() {
        let slot = step.provides();
        if slot.is_input() {
            return Err(PipelineError::InvalidConfig(format!(
                "step {} provides input slot {}",
                step.name(),
                slot
            )));
        }
        if let Some(&first) = providers.get(&slot) {
            return Err(PipelineError::DuplicateProvider {
                slot,
                first: steps[first].name().to_string(),
                second: step.name().to_string(),
            });
        }
        providers.insert(slot, i);
    }

    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..steps.len()).map(|i| graph.add_node(i)).collect();
    let mut deps: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); steps.len()];

    for (i, step) in steps.iter().enumerate() {
        for &slot in step.requires() {
            if slot.is_input() {
                continue;
            }
            match providers.get(&slot) {
                Some(&p) => {
                    deps[i].insert(p);
                }
                None => {
                    return Err(PipelineError::UnknownSlot {
                        step: step.name().to_string(),
                        slot,
                    })
                }
            }
        }
        for slot in step.after() {
            if let Some(&p) = providers.get(slot) {
                deps[i].insert(p);
            }
        }
        for &p in &deps[i] {
            graph.add_edge(nodes[p], nodes[i], ());
        }
    }

    let order = toposort(&graph, None)
        .map_err(|cycle| PipelineError::StepCycle(steps[graph[cycle.node_id()]].name().to_string()))?;

    let mut level_of = vec![0usize; steps.len()];
    for node in order {
        let i = graph[node];
        level_of[i] = deps[i].iter().map(|&d| level_of[d] + 1).max().unwrap_or(0);
    }
    let depth = level_of.iter().copied().max().map_or(0, |m| m + 1);
    let mut levels: Vec<Vec<usize>> = vec![Vec::new(); depth];
    for (i, &level) in level_of.iter().enumerate() {
        levels[level].push(i);
    }
    Ok(levels)
}

/// The built-in analyzer steps.
pub fn default_steps() -> Vec<Box<dyn Step>> {
    vec![
        Box::new(StructuralStep),
        Box::new(SpectralStep),
        Box::new(ArchitectureStep),
        Box::new(CloneStep),
        Box::new(TemporalStep),
        Box::new(CoChangeStep),
        Box::new(AuthorDistanceStep),
        Box::new(FusionStep),
    ]
}

fn scanned_paths(store: &SignalStore) -> PipelineResult<BTreeSet<String>> {
    Ok(ready(&store.file_facts, SlotName::FileFacts)?
        .iter()
        .map(|f| f.path.clone())
        .collect())
}

fn enough_history(history: &GitHistory, config: &AnalysisConfig) -> bool {
    history.total_commits() >= config.temporal.min_commits
}

pub struct StructuralStep;

impl Step for StructuralStep {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn requires(&self) -> &'static [SlotName] {
        &[SlotName::FileFacts]
    }

    fn provides(&self) -> SlotName {
        SlotName::Structural
    }

    fn run(&self, store: &SignalStore, config: &AnalysisConfig) -> PipelineResult<Option<Artifact>> {
        let facts = ready(&store.file_facts, SlotName::FileFacts)?;
        let structural = analyze_structure(facts, config)?;
        Ok(Some(Artifact::Structural(structural)))
    }
}

pub struct SpectralStep;

impl Step for SpectralStep {
    fn name(&self) -> &'static str {
        "spectral"
    }

    fn requires(&self) -> &'static [SlotName] {
        &[SlotName::Structural]
    }

    fn provides(&self) -> SlotName {
        SlotName::Spectral
    }

    fn run(&self, store: &SignalStore, config: &AnalysisConfig) -> PipelineResult<Option<Artifact>> {
        let structural = ready(&store.structural, SlotName::Structural)?;
        Ok(spectral::spectral_summary(&structural.graph, &config.spectral).map(Artifact::Spectral))
    }
}

pub struct ArchitectureStep;

impl Step for ArchitectureStep {
    fn name(&self) -> &'static str {
        "architecture"
    }

    fn requires(&self) -> &'static [SlotName] {
        &[SlotName::FileFacts, SlotName::Structural]
    }

    fn provides(&self) -> SlotName {
        SlotName::Architecture
    }

    fn run(&self, store: &SignalStore, _config: &AnalysisConfig) -> PipelineResult<Option<Artifact>> {
        let facts = ready(&store.file_facts, SlotName::FileFacts)?;
        let structural = ready(&store.structural, SlotName::Structural)?;
        let architecture = modules::analyze_architecture(facts, structural);
        if architecture.modules.is_empty() {
            return Ok(None);
        }
        Ok(Some(Artifact::Architecture(architecture)))
    }
}

pub struct CloneStep;

impl Step for CloneStep {
    fn name(&self) -> &'static str {
        "clones"
    }

    fn requires(&self) -> &'static [SlotName] {
        &[SlotName::FileFacts]
    }

    fn provides(&self) -> SlotName {
        SlotName::Clones
    }

    fn run(&self, store: &SignalStore, config: &AnalysisConfig) -> PipelineResult<Option<Artifact>> {
        let facts = ready(&store.file_facts, SlotName::FileFacts)?;
        if !facts.iter().any(|f| f.content.is_some()) {
            return Ok(None);
        }
        Ok(Some(Artifact::Clones(clones::detect_clones(
            facts,
            &config.clones,
        ))))
    }
}

pub struct TemporalStep;

impl Step for TemporalStep {
    fn name(&self) -> &'static str {
        "temporal"
    }

    fn requires(&self) -> &'static [SlotName] {
        &[SlotName::FileFacts, SlotName::GitHistory]
    }

    fn provides(&self) -> SlotName {
        SlotName::Temporal
    }

    fn run(&self, store: &SignalStore, config: &AnalysisConfig) -> PipelineResult<Option<Artifact>> {
        let history = ready(&store.git_history, SlotName::GitHistory)?;
        let scanned = scanned_paths(store)?;
        Ok(temporal::analyze_temporal(history, &scanned, &config.temporal).map(Artifact::Temporal))
    }
}

pub struct CoChangeStep;

impl Step for CoChangeStep {
    fn name(&self) -> &'static str {
        "cochange"
    }

    fn requires(&self) -> &'static [SlotName] {
        &[SlotName::FileFacts, SlotName::GitHistory]
    }

    fn provides(&self) -> SlotName {
        SlotName::CoChange
    }

    fn run(&self, store: &SignalStore, config: &AnalysisConfig) -> PipelineResult<Option<Artifact>> {
        let history = ready(&store.git_history, SlotName::GitHistory)?;
        if !enough_history(history, config) {
            return Ok(None);
        }
        let scanned = scanned_paths(store)?;
        let matrix = cochange::build_cochange_matrix(history, &scanned, &config.temporal);
        Ok(Some(Artifact::CoChange(matrix)))
    }
}

pub struct AuthorDistanceStep;

impl Step for AuthorDistanceStep {
    fn name(&self) -> &'static str {
        "author_distances"
    }

    fn requires(&self) -> &'static [SlotName] {
        &[SlotName::Temporal, SlotName::Architecture]
    }

    fn provides(&self) -> SlotName {
        SlotName::AuthorDistances
    }

    fn run(&self, store: &SignalStore, _config: &AnalysisConfig) -> PipelineResult<Option<Artifact>> {
        let temporal = ready(&store.temporal, SlotName::Temporal)?;
        let architecture = ready(&store.architecture, SlotName::Architecture)?;
        Ok(authorship::module_author_distances(temporal, architecture)
            .map(Artifact::AuthorDistances))
    }
}

pub struct FusionStep;

impl Step for FusionStep {
    fn name(&self) -> &'static str {
        "signal_fusion"
    }

    fn requires(&self) -> &'static [SlotName] {
        &[SlotName::FileFacts, SlotName::Structural]
    }

    fn after(&self) -> &'static [SlotName] {
        &[
            SlotName::Spectral,
            SlotName::Architecture,
            SlotName::Clones,
            SlotName::Temporal,
            SlotName::AuthorDistances,
        ]
    }

    fn provides(&self) -> SlotName {
        SlotName::SignalField
    }

    fn run(&self, store: &SignalStore, config: &AnalysisConfig) -> PipelineResult<Option<Artifact>> {
        let facts = ready(&store.file_facts, SlotName::FileFacts)?;
        let structural = ready(&store.structural, SlotName::Structural)?;
        let inputs = FusionInputs {
            facts,
            structural,
            spectral: store.spectral.get(),
            architecture: store.architecture.get(),
            clones: store.clones.get(),
            temporal: store.temporal.get(),
            author_distances: store.author_distances.get().map(Vec::as_slice),
        };
        Ok(Some(Artifact::SignalField(fuse(&inputs, config))))
    }
}
