//! Commit intent classification by keyword patterns.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{CommitIntent, CommitRecord};

static INTENT_PATTERNS: OnceLock<Vec<(CommitIntent, Regex)>> = OnceLock::new();

/// Patterns checked in order; the first match wins, anything else is a feature.
fn intent_patterns() -> &'static Vec<(CommitIntent, Regex)> {
    INTENT_PATTERNS.get_or_init(|| {
        vec![
            (
                CommitIntent::Fix,
                Regex::new(r"(?i)\b(fix(e[sd])?|bug(s|fix)?|hotfix|patch(ed)?|repair(ed)?|resolve[sd]?|regression)\b")
                    .expect("valid regex"),
            ),
            (
                CommitIntent::Refactor,
                Regex::new(r"(?i)\b(refactor\w*|clean\s?up|reorgani[sz]e\w*|restructure\w*|rename[sd]?|simplif(y|ied|ies))\b")
                    .expect("valid regex"),
            ),
            (
                CommitIntent::Test,
                Regex::new(r"(?i)\b(tests?|testing|specs?|coverage)\b").expect("valid regex"),
            ),
            (
                CommitIntent::Docs,
                Regex::new(r"(?i)\b(docs?|documentation|readme|changelog|typo)\b")
                    .expect("valid regex"),
            ),
            (
                CommitIntent::Deps,
                Regex::new(r"(?i)\b(deps?|dependenc(y|ies)|bump(ed|s)?|upgrade[sd]?|lockfile)\b")
                    .expect("valid regex"),
            ),
            (
                CommitIntent::Chore,
                Regex::new(r"(?i)\b(chore|ci|build|release|format(ting)?|lint|merge|wip)\b")
                    .expect("valid regex"),
            ),
        ]
    })
}

/// Classify a commit message.
pub fn classify_intent(message: &str) -> CommitIntent {
    intent_patterns()
        .iter()
        .find(|(_, re)| re.is_match(message))
        .map_or(CommitIntent::Feature, |(intent, _)| *intent)
}

/// The commit's declared intent, or the one classified from its message.
pub fn resolve_intent(commit: &CommitRecord) -> CommitIntent {
    commit
        .intent
        .unwrap_or_else(|| classify_intent(&commit.message))
}
