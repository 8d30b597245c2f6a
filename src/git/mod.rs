//! Git history collaborator
//!
//! Reads a repository's commit log into the [`GitHistory`](crate::models::GitHistory)
//! input record consumed by the temporal analyzer.
//!
//! # Example
//!
//! ```no_run
//! use signalscope::git::extract_history;
//! use std::path::Path;
//! use std::time::Duration;
//!
//! let history = extract_history(Path::new("/path/to/repo"), 5000, Duration::from_secs(30));
//! ```

pub mod history;

pub use history::{extract_history, GitExtractor};
