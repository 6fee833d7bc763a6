//! `slugline` -- screenplay parsing and breakdown from the command line.
//!
//! A local driver for the parsing crates: reads a script file, runs the
//! full structural pipeline, and prints summaries, diffs, or production
//! breakdowns. Configuration comes from `SLUGLINE_*` environment
//! variables (see `slugline_pipeline::config::PipelineConfig`). Without
//! `SLUGLINE_ANALYSIS_URL` the offline heuristic analyzer is used, so
//! the tool works with no services running.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slugline_core::config::EngineConfig;
use slugline_core::diff::{DiffStatus, RevisionDiff};
use slugline_core::error::Issue;
use slugline_nlp::{Analyzer, HttpAnalyzer, StubAnalyzer};
use slugline_pipeline::{ParseService, PipelineConfig, SubmitRequest, Submitted};

#[derive(Debug, Parser)]
#[command(name = "slugline")]
#[command(about = "Screenplay structural parser and production breakdown")]
struct Cli {
    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse a script and print its structural summary.
    Parse {
        /// Script file (Fountain or plain text).
        path: PathBuf,

        /// Production identifier stored in the revision metadata.
        #[arg(long)]
        production: Option<String>,
    },
    /// Parse two drafts and print the scene and element changes.
    Diff {
        /// Earlier draft.
        old: PathBuf,
        /// Later draft.
        new: PathBuf,
    },
    /// Parse a script and print its production breakdown.
    Breakdown {
        /// Script file (Fountain or plain text).
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slugline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::from_env();
    let analyzer = build_analyzer(&config)?;
    let service = ParseService::new(analyzer, EngineConfig::default(), config);

    let result = match cli.command {
        Commands::Parse { path, production } => {
            run_parse(&service, &path, production.as_deref(), cli.json).await
        }
        Commands::Diff { old, new } => run_diff(&service, &old, &new, cli.json).await,
        Commands::Breakdown { path } => run_breakdown(&service, &path, cli.json).await,
    };

    service.shutdown();
    result
}

/// HTTP analyzer when an analysis service is configured, the offline
/// heuristics otherwise.
fn build_analyzer(config: &PipelineConfig) -> anyhow::Result<Arc<dyn Analyzer>> {
    match &config.analysis_url {
        Some(url) => {
            tracing::info!(url = %url, "Using the HTTP analysis service");
            let client = HttpAnalyzer::new(url.clone(), config.analysis_timeout())
                .context("could not build the analysis client")?;
            Ok(Arc::new(client))
        }
        None => {
            tracing::info!("No analysis service configured; using offline heuristics");
            Ok(Arc::new(StubAnalyzer))
        }
    }
}

async fn submit_file(
    service: &ParseService,
    path: &Path,
    production: Option<&str>,
) -> anyhow::Result<Submitted> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let submitted = service
        .submit(SubmitRequest {
            bytes: &bytes,
            declared_format: None,
            filename: path.file_name().and_then(|n| n.to_str()),
            production,
        })
        .await
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(submitted)
}

async fn run_parse(
    service: &ParseService,
    path: &Path,
    production: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let submitted = submit_file(service, path, production).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&submitted.summary)?);
        return Ok(());
    }

    let summary = &submitted.summary;
    println!(
        "Parsed {}: {} scenes, {} characters, {} elements ({}, {} pages)",
        path.display(),
        summary.scene_count,
        summary.character_count,
        summary.element_count,
        summary.format,
        summary.page_count,
    );
    println!("Revision {}", summary.revision_id);
    println!(
        "Dialogue/action lines: {}/{}, estimated {} min",
        summary.dialogue_lines, summary.action_lines, summary.estimated_minutes,
    );
    if summary.unresolved_lines > 0 {
        println!("Unresolved lines: {}", summary.unresolved_lines);
    }
    print_issues(&submitted.parsed.issues);
    Ok(())
}

async fn run_diff(
    service: &ParseService,
    old: &Path,
    new: &Path,
    json: bool,
) -> anyhow::Result<()> {
    let old_rev = submit_file(service, old, None).await?;
    let new_rev = submit_file(service, new, None).await?;
    let (diff, _) = service
        .diff_and_carry(old_rev.revision_id, new_rev.revision_id)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&diff)?);
        return Ok(());
    }

    println!("Diff {} -> {}", old.display(), new.display());
    print_diff(&diff);
    Ok(())
}

async fn run_breakdown(service: &ParseService, path: &Path, json: bool) -> anyhow::Result<()> {
    let submitted = submit_file(service, path, None).await?;
    let report = service.breakdown(submitted.revision_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match &report.title {
        Some(title) => println!("Breakdown: {title}"),
        None => println!("Breakdown: {}", path.display()),
    }
    println!(
        "{} scenes ({} interior, {} exterior), {} pages, estimated {} min",
        report.scene_count,
        report.interior_scenes,
        report.exterior_scenes,
        report.page_count,
        report.estimated_minutes,
    );
    println!(
        "{} speaking characters, {} locations, {} props",
        report.speaking_characters, report.location_count, report.prop_count,
    );
    for element in &report.elements {
        println!(
            "  [{}] {} (confidence {:.2}, {} occurrence(s), scenes {})",
            element.category.as_str(),
            element.label,
            element.confidence,
            element.occurrences,
            element.scenes.join(", "),
        );
    }
    Ok(())
}

// ---- output helpers ----

fn print_diff(diff: &RevisionDiff) {
    if diff.scenes.is_empty() && diff.elements.is_empty() {
        println!("No structural changes.");
        return;
    }

    for delta in &diff.scenes {
        match delta.status {
            DiffStatus::Added => {
                println!("  + scene {}", delta.new_number.as_deref().unwrap_or("?"));
            }
            DiffStatus::Removed => {
                println!("  - scene {}", delta.old_number.as_deref().unwrap_or("?"));
            }
            DiffStatus::Changed | DiffStatus::Unchanged => {
                let changes: Vec<&str> =
                    delta.modifications.iter().map(|m| m.as_str()).collect();
                let mut line = format!(
                    "  ~ scene {} ({})",
                    delta.new_number.as_deref().unwrap_or("?"),
                    changes.join(", "),
                );
                if delta.substantial_rewrite {
                    line.push_str(" [substantial rewrite]");
                }
                println!("{line}");
            }
        }
        if let Some(note) = &delta.note {
            println!("      note: {note}");
        }
    }

    for delta in &diff.elements {
        let sign = match delta.status {
            DiffStatus::Added => '+',
            DiffStatus::Removed => '-',
            DiffStatus::Changed | DiffStatus::Unchanged => '~',
        };
        println!("  {sign} {} {}", delta.category.as_str(), delta.label);
    }

    print_issues(&diff.issues);
}

fn print_issues(issues: &[Issue]) {
    if issues.is_empty() {
        return;
    }
    println!("Issues:");
    for issue in issues {
        let anchor = match (issue.line, issue.scene_key.as_deref()) {
            (Some(line), _) => format!("line {line}"),
            (None, Some(key)) => format!("scene {key}"),
            (None, None) => "document".to_string(),
        };
        println!("  [{}] {}: {}", issue.kind.as_str(), anchor, issue.detail);
    }
}
