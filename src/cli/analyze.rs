//! Analyze command - run the pipeline over scanner facts

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, info};

use signalscope::config::{load_config, load_project_config, AnalysisConfig};
use signalscope::git::extract_history;
use signalscope::history::{HistoryStore, JsonHistoryStore, Snapshot};
use signalscope::models::{FileFact, Finding, FindingsSummary};
use signalscope::{run_with_history, SignalField};

use super::parse_workers;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Scanner output: a JSON array of file facts
    pub facts: PathBuf,

    /// Repository to read git history from
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Skip git history (structural signals only)
    #[arg(long)]
    pub no_git: bool,

    /// Config file (default: signalscope.toml in the repository)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON file of prior snapshots, enables chronic_problem and architecture_erosion
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Append this run to the history file
    #[arg(long, requires = "history")]
    pub record: bool,

    /// Maximum findings to keep
    #[arg(long)]
    pub max_findings: Option<usize>,

    /// Worker threads (0 = auto)
    #[arg(long, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Output format
    #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

fn resolve_config(args: &AnalyzeArgs) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => load_project_config(&args.repo),
    };
    if let Some(max) = args.max_findings {
        config.engine.max_findings = max;
    }
    if let Some(workers) = args.workers {
        config.engine.workers = workers;
    }
    Ok(config)
}

fn load_facts(path: &Path) -> Result<Vec<FileFact>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read facts file {}", path.display()))?;
    let facts: Vec<FileFact> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse facts file {}", path.display()))?;
    debug!("Loaded {} file facts from {}", facts.len(), path.display());
    Ok(facts)
}

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let facts = load_facts(&args.facts)?;

    let history = if args.no_git {
        None
    } else {
        extract_history(
            &args.repo,
            config.temporal.max_commits,
            Duration::from_secs(config.temporal.extract_timeout_secs),
        )
    };

    let snapshots: Option<Arc<dyn HistoryStore>> = match &args.history {
        Some(path) => Some(Arc::new(JsonHistoryStore::open(path)?)),
        None => None,
    };

    let (field, findings) = run_with_history(facts, history, snapshots, &config)
        .context("Analysis failed")?;

    let rendered = match args.format.as_str() {
        "json" => render_json(&field, &findings)?,
        _ => render_text(&field, &findings),
    };
    match &args.output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} findings to {}", findings.len(), path.display());
        }
        None => print!("{}", rendered),
    }

    if args.record {
        if let Some(path) = &args.history {
            let mut store = JsonHistoryStore::open(path)?;
            store.record(Snapshot::from_run(&field, &findings, chrono::Utc::now().timestamp()))?;
            info!("Recorded snapshot {} in {}", store.len(), path.display());
        }
    }
    Ok(())
}

fn render_json(field: &SignalField, findings: &[Finding]) -> Result<String> {
    let report = serde_json::json!({
        "tier": field.tier,
        "files": field.files.len(),
        "global": field.global,
        "summary": FindingsSummary::from_findings(findings),
        "findings": findings,
    });
    let mut out = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    out.push('\n');
    Ok(out)
}

fn render_text(field: &SignalField, findings: &[Finding]) -> String {
    let summary = FindingsSummary::from_findings(findings);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} files, {} tier, codebase health {:.1}/10",
        field.files.len(),
        field.tier,
        field.global.codebase_health * 10.0
    );
    let _ = writeln!(
        out,
        "{} findings: {} critical, {} high, {} medium, {} low, {} info\n",
        summary.total, summary.critical, summary.high, summary.medium, summary.low, summary.info
    );

    for finding in findings {
        let _ = writeln!(
            out,
            "[{:<8} {:.2}] {}: {}",
            finding.severity_band().to_string().to_uppercase(),
            finding.severity,
            finding.finder,
            finding.title
        );
        for evidence in &finding.evidence {
            let _ = writeln!(out, "    - {}", evidence.description);
        }
        if !finding.suggestion.is_empty() {
            let _ = writeln!(out, "    => {}", finding.suggestion);
        }
    }
    out
}
