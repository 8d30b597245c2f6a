//! Signal store (blackboard)
//!
//! One typed slot per derived artifact. A slot is `Unset` until its producer
//! step has run, then either `Ready(value)` or `Unavailable` when the step was
//! skipped or found nothing to compute. Slots are write-once.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::graph::{ArchitectureAnalysis, CloneAnalysis, SpectralSummary, StructuralAnalysis};
use crate::history::HistoryStore;
use crate::models::{FileFact, GitHistory};
use crate::signals::SignalField;
use crate::temporal::{AuthorDistance, CoChangeMatrix, TemporalAnalysis};

/// Name of every slot in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotName {
    FileFacts,
    GitHistory,
    Snapshots,
    Structural,
    Spectral,
    Architecture,
    Clones,
    Temporal,
    CoChange,
    AuthorDistances,
    SignalField,
}

impl SlotName {
    /// Slots filled by the caller rather than by a step.
    pub const INPUTS: [SlotName; 3] = [SlotName::FileFacts, SlotName::GitHistory, SlotName::Snapshots];

    pub fn is_input(self) -> bool {
        Self::INPUTS.contains(&self)
    }
}

impl std::fmt::Display for SlotName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SlotName::FileFacts => "file_facts",
            SlotName::GitHistory => "git_history",
            SlotName::Snapshots => "snapshots",
            SlotName::Structural => "structural",
            SlotName::Spectral => "spectral",
            SlotName::Architecture => "architecture",
            SlotName::Clones => "clones",
            SlotName::Temporal => "temporal",
            SlotName::CoChange => "cochange",
            SlotName::AuthorDistances => "author_distances",
            SlotName::SignalField => "signal_field",
        };
        write!(f, "{}", name)
    }
}

/// State of a slot without its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Unset,
    Unavailable,
    Ready,
}

/// A write-once cell.
#[derive(Debug, Clone, Default)]
pub enum Slot<T> {
    #[default]
    Unset,
    Unavailable,
    Ready(T),
}

impl<T> Slot<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Slot::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Slot::Ready(_))
    }

    pub fn state(&self) -> SlotState {
        match self {
            Slot::Unset => SlotState::Unset,
            Slot::Unavailable => SlotState::Unavailable,
            Slot::Ready(_) => SlotState::Ready,
        }
    }

    fn set(&mut self, name: SlotName, value: T) -> PipelineResult<()> {
        match self {
            Slot::Unset => {
                *self = Slot::Ready(value);
                Ok(())
            }
            _ => Err(PipelineError::SlotAlreadySet(name)),
        }
    }

    fn set_unavailable(&mut self, name: SlotName) -> PipelineResult<()> {
        match self {
            Slot::Unset => {
                *self = Slot::Unavailable;
                Ok(())
            }
            _ => Err(PipelineError::SlotAlreadySet(name)),
        }
    }
}

/// A value produced for one slot.
pub enum Artifact {
    FileFacts(Vec<FileFact>),
    GitHistory(GitHistory),
    Snapshots(Arc<dyn HistoryStore>),
    Structural(StructuralAnalysis),
    Spectral(SpectralSummary),
    Architecture(ArchitectureAnalysis),
    Clones(CloneAnalysis),
    Temporal(TemporalAnalysis),
    CoChange(CoChangeMatrix),
    AuthorDistances(Vec<AuthorDistance>),
    SignalField(SignalField),
}

impl Artifact {
    pub fn slot(&self) -> SlotName {
        match self {
            Artifact::FileFacts(_) => SlotName::FileFacts,
            Artifact::GitHistory(_) => SlotName::GitHistory,
            Artifact::Snapshots(_) => SlotName::Snapshots,
            Artifact::Structural(_) => SlotName::Structural,
            Artifact::Spectral(_) => SlotName::Spectral,
            Artifact::Architecture(_) => SlotName::Architecture,
            Artifact::Clones(_) => SlotName::Clones,
            Artifact::Temporal(_) => SlotName::Temporal,
            Artifact::CoChange(_) => SlotName::CoChange,
            Artifact::AuthorDistances(_) => SlotName::AuthorDistances,
            Artifact::SignalField(_) => SlotName::SignalField,
        }
    }
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Artifact({})", self.slot())
    }
}

/// The blackboard shared by steps and finders.
#[derive(Default)]
pub struct SignalStore {
    pub file_facts: Slot<Vec<FileFact>>,
    pub git_history: Slot<GitHistory>,
    pub snapshots: Slot<Arc<dyn HistoryStore>>,
    pub structural: Slot<StructuralAnalysis>,
    pub spectral: Slot<SpectralSummary>,
    pub architecture: Slot<ArchitectureAnalysis>,
    pub clones: Slot<CloneAnalysis>,
    pub temporal: Slot<TemporalAnalysis>,
    pub cochange: Slot<CoChangeMatrix>,
    pub author_distances: Slot<Vec<AuthorDistance>>,
    pub signal_field: Slot<SignalField>,
}

impl SignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store populated with the run inputs. Absent inputs are `Unavailable`.
    pub fn with_inputs(
        facts: Vec<FileFact>,
        history: Option<GitHistory>,
        snapshots: Option<Arc<dyn HistoryStore>>,
    ) -> PipelineResult<Self> {
        let mut store = Self::new();
        store.put(Artifact::FileFacts(facts))?;
        match history {
            Some(h) => store.put(Artifact::GitHistory(h))?,
            None => store.mark_unavailable(SlotName::GitHistory)?,
        }
        match snapshots {
            Some(s) => store.put(Artifact::Snapshots(s))?,
            None => store.mark_unavailable(SlotName::Snapshots)?,
        }
        Ok(store)
    }

    /// Write a slot. Fails if the slot was already written.
    pub fn put(&mut self, artifact: Artifact) -> PipelineResult<()> {
        let name = artifact.slot();
        match artifact {
            Artifact::FileFacts(v) => self.file_facts.set(name, v),
            Artifact::GitHistory(v) => self.git_history.set(name, v),
            Artifact::Snapshots(v) => self.snapshots.set(name, v),
            Artifact::Structural(v) => self.structural.set(name, v),
            Artifact::Spectral(v) => self.spectral.set(name, v),
            Artifact::Architecture(v) => self.architecture.set(name, v),
            Artifact::Clones(v) => self.clones.set(name, v),
            Artifact::Temporal(v) => self.temporal.set(name, v),
            Artifact::CoChange(v) => self.cochange.set(name, v),
            Artifact::AuthorDistances(v) => self.author_distances.set(name, v),
            Artifact::SignalField(v) => self.signal_field.set(name, v),
        }
    }

    /// Record that a slot will never be produced in this run.
    pub fn mark_unavailable(&mut self, name: SlotName) -> PipelineResult<()> {
        match name {
            SlotName::FileFacts => self.file_facts.set_unavailable(name),
            SlotName::GitHistory => self.git_history.set_unavailable(name),
            SlotName::Snapshots => self.snapshots.set_unavailable(name),
            SlotName::Structural => self.structural.set_unavailable(name),
            SlotName::Spectral => self.spectral.set_unavailable(name),
            SlotName::Architecture => self.architecture.set_unavailable(name),
            SlotName::Clones => self.clones.set_unavailable(name),
            SlotName::Temporal => self.temporal.set_unavailable(name),
            SlotName::CoChange => self.cochange.set_unavailable(name),
            SlotName::AuthorDistances => self.author_distances.set_unavailable(name),
            SlotName::SignalField => self.signal_field.set_unavailable(name),
        }
    }

    pub fn state(&self, name: SlotName) -> SlotState {
        match name {
            SlotName::FileFacts => self.file_facts.state(),
            SlotName::GitHistory => self.git_history.state(),
            SlotName::Snapshots => self.snapshots.state(),
            SlotName::Structural => self.structural.state(),
            SlotName::Spectral => self.spectral.state(),
            SlotName::Architecture => self.architecture.state(),
            SlotName::Clones => self.clones.state(),
            SlotName::Temporal => self.temporal.state(),
            SlotName::CoChange => self.cochange.state(),
            SlotName::AuthorDistances => self.author_distances.state(),
            SlotName::SignalField => self.signal_field.state(),
        }
    }

    pub fn is_ready(&self, name: SlotName) -> bool {
        self.state(name) == SlotState::Ready
    }

    /// Required slots that are not ready.
    pub fn missing(&self, required: &[SlotName]) -> Vec<SlotName> {
        required
            .iter()
            .copied()
            .filter(|&name| !self.is_ready(name))
            .collect()
    }
}
