//! Signal field
//!
//! The fused view of every analyzer output that finders evaluate:
//!
//! ```text
//!   SignalField
//!     tier      ABSOLUTE (<15 files) | BAYESIAN (15..50) | FULL (≥50)
//!     files     path → FileSignals    raw values, percentiles, risk, Δh
//!     modules   dir  → ModuleSignals  Martin metrics, team and directory stats
//!     global    GlobalSignals         codebase scalars and health composites
//! ```

pub mod composites;
pub mod fusion;
pub mod laplacian;
pub mod percentile;
pub mod registry;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use composites::GlobalSignals;
pub use fusion::{fuse, FileSignals, FusionInputs, ModuleSignals};
pub use percentile::{percentile_of, percentile_ranks};
pub use registry::{Polarity, Signal};

/// Files below which percentiles are not trusted.
pub const BAYESIAN_MIN_FILES: usize = 15;
/// Files from which the full percentile machinery is used.
pub const FULL_MIN_FILES: usize = 50;

/// How far percentiles can be trusted for a codebase of a given size.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    #[default]
    Absolute,
    Bayesian,
    Full,
}

impl Tier {
    pub fn from_file_count(count: usize) -> Self {
        if count < BAYESIAN_MIN_FILES {
            Tier::Absolute
        } else if count < FULL_MIN_FILES {
            Tier::Bayesian
        } else {
            Tier::Full
        }
    }

    pub fn uses_percentiles(self) -> bool {
        self != Tier::Absolute
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Absolute => write!(f, "ABSOLUTE"),
            Tier::Bayesian => write!(f, "BAYESIAN"),
            Tier::Full => write!(f, "FULL"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalField {
    pub tier: Tier,
    pub files: BTreeMap<String, FileSignals>,
    pub modules: BTreeMap<String, ModuleSignals>,
    pub global: GlobalSignals,
}

impl SignalField {
    pub fn file(&self, path: &str) -> Option<&FileSignals> {
        self.files.get(path)
    }

    pub fn module(&self, path: &str) -> Option<&ModuleSignals> {
        self.modules.get(path)
    }

    /// Lower median of total changes over changed non-test files.
    pub fn hotspot_median(&self) -> usize {
        fusion::hotspot_median(&self.files)
    }
}
