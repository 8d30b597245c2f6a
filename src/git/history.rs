//! Git history extraction using libgit2
//!
//! Walks HEAD newest-first and turns every commit into a [`CommitRecord`]
//! (id, timestamp, author, subject line, touched paths). The walk is bounded
//! by a commit count and a wall-clock deadline.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use git2::{Repository, Sort};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::models::{CommitRecord, GitHistory};
use crate::temporal::intent::classify_intent;

/// Commit history reader over a libgit2 repository.
pub struct GitExtractor {
    repo: Repository,
}

impl GitExtractor {
    /// Open a git repository.
    ///
    /// # Arguments
    /// * `path` - Path to the repository (or any subdirectory)
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)
            .with_context(|| format!("Failed to open git repository at {:?}", path))?;
        debug!("Opened git repository at {:?}", repo.path());
        Ok(Self { repo })
    }

    /// Check if a path is inside a git repository.
    pub fn is_git_repo(path: &Path) -> bool {
        Repository::discover(path).is_ok()
    }

    /// Get the repository root path.
    pub fn repo_root(&self) -> Result<&Path> {
        self.repo
            .workdir()
            .context("Repository has no working directory (bare repo?)")
    }

    /// Read up to `max_commits` commits reachable from HEAD.
    ///
    /// Stops early once `timeout` has elapsed, returning what was read so far.
    /// Commits older than `since` end the walk.
    pub fn extract(
        &self,
        max_commits: usize,
        timeout: Duration,
        since: Option<DateTime<Utc>>,
    ) -> Result<GitHistory> {
        let started = Instant::now();
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.push_head()?;

        let mut commits = Vec::new();

        for oid_result in revwalk {
            if commits.len() >= max_commits {
                break;
            }
            if started.elapsed() > timeout {
                warn!(
                    "Git history extraction timed out after {} commits",
                    commits.len()
                );
                break;
            }

            let oid = oid_result?;
            let commit = self.repo.find_commit(oid)?;

            // Filter by timestamp if specified
            if let Some(since_ts) = since {
                let commit_dt = Utc.timestamp_opt(commit.time().seconds(), 0).single();
                if commit_dt.is_some_and(|dt| dt < since_ts) {
                    break; // Commits are sorted by time, so we can stop
                }
            }

            commits.push(self.extract_commit_record(&commit)?);
        }

        debug!("Extracted {} commits", commits.len());
        Ok(GitHistory::new(commits))
    }

    /// Convert a git2 Commit into a [`CommitRecord`].
    fn extract_commit_record(&self, commit: &git2::Commit) -> Result<CommitRecord> {
        let author = commit.author();
        let message = commit
            .message()
            .unwrap_or("")
            .lines()
            .next()
            .unwrap_or("")
            .to_string();

        // Get changed files
        let parent = commit.parent(0).ok();
        let tree = commit.tree()?;
        let parent_tree = parent.as_ref().map(|p| p.tree()).transpose()?;

        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

        let mut files = Vec::new();
        diff.foreach(
            &mut |delta, _| {
                if let Some(path) = delta.new_file().path().or_else(|| delta.old_file().path()) {
                    files.push(path.to_string_lossy().to_string());
                }
                true
            },
            None,
            None,
            None,
        )?;
        files.sort();
        files.dedup();

        let author_id = match (author.email(), author.name()) {
            (Some(email), _) if !email.is_empty() => email.to_string(),
            (_, Some(name)) => name.to_string(),
            _ => "unknown".to_string(),
        };

        Ok(CommitRecord {
            id: commit.id().to_string(),
            timestamp: commit.time().seconds(),
            author: author_id,
            intent: Some(classify_intent(&message)),
            message,
            files,
        })
    }
}

/// History extractor collaborator: `None` when no repository is accessible.
pub fn extract_history(path: &Path, max_commits: usize, timeout: Duration) -> Option<GitHistory> {
    if !GitExtractor::is_git_repo(path) {
        info!("No git repository at {}, temporal analysis disabled", path.display());
        return None;
    }
    match GitExtractor::open(path).and_then(|g| g.extract(max_commits, timeout, None)) {
        Ok(history) => Some(history),
        Err(e) => {
            warn!("Failed to read git history: {:#}", e);
            None
        }
    }
}
