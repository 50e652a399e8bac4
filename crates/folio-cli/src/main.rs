//! folio command-line tool.
//!
//! Usage:
//!   folio new proposal.json --title "Website redesign"
//!   folio apply proposal.json edits.json --config session.ron
//!   folio evaluate proposal.json
//!   folio pricing proposal.json
//!   folio check proposal.json        # exit 1 while signatures are missing
//!
//! Logs go to stderr (`RUST_LOG=debug` for per-command detail); results are
//! JSON on stdout.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt};

use folio_engine::{Evaluation, Outcome, PricingSummary, can_submit, compute_pricing, format_money};
use folio_kernel::{
    DocumentPersistence, EditorSession, JsonFilePersistence, SaveStatus, SessionConfig,
    parse_script,
};
use folio_types::{BlockId, Document};

/// Proposal document tool.
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(about = "Evaluate and edit folio proposal documents")]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print visibility, pricing and submission state as JSON
    Evaluate {
        document: PathBuf,
    },
    /// Print the totals of every pricing table
    Pricing {
        document: PathBuf,
    },
    /// Exit 0 when the document can be submitted, 1 otherwise
    Check {
        document: PathBuf,
    },
    /// Run a JSON script of edits (plus undo/redo) and save the result
    Apply {
        document: PathBuf,
        script: PathBuf,
        /// Session config (RON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write here instead of over the input document
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Create an empty document
    New {
        document: PathBuf,
        #[arg(long, default_value = folio_types::document::UNTITLED)]
        title: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();

    match args.command {
        Cmd::Evaluate { document } => {
            let doc = load(&document).await?;
            print_json(&Evaluation::compute(&doc.blocks))?;
        }
        Cmd::Pricing { document } => {
            let doc = load(&document).await?;
            print_json(&pricing_report(&doc))?;
        }
        Cmd::Check { document } => {
            let doc = load(&document).await?;
            let check = can_submit(&doc.blocks);
            if !check.ok {
                println!("missing signatures: {}", check.missing_roles.join(", "));
                return Ok(ExitCode::FAILURE);
            }
            println!("ready to submit ({} of {} signatures)", check.completed, check.required);
        }
        Cmd::Apply {
            document,
            script,
            config,
            out,
        } => {
            let config = match config {
                Some(path) => SessionConfig::load(&path)
                    .with_context(|| format!("reading config {}", path.display()))?,
                None => SessionConfig::default(),
            };
            let out = out.unwrap_or_else(|| document.clone());
            let summary = run_script(&document, &script, &out, config).await?;
            print_json(&summary)?;
        }
        Cmd::New {
            document,
            title,
            force,
        } => {
            if !force && tokio::fs::try_exists(&document).await.unwrap_or(false) {
                bail!("{} exists (use --force to overwrite)", document.display());
            }
            JsonFilePersistence::new(&document)
                .save(&Document::new(title))
                .await
                .with_context(|| format!("writing {}", document.display()))?;
            tracing::info!(path = %document.display(), "created document");
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn load(path: &Path) -> Result<Document> {
    JsonFilePersistence::new(path)
        .load()
        .await
        .with_context(|| format!("loading {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// pricing
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PricingReport {
    block_id: BlockId,
    currency: String,
    #[serde(flatten)]
    summary: PricingSummary,
    /// Total rounded to cents with the currency code.
    display_total: String,
}

fn pricing_report(doc: &Document) -> Vec<PricingReport> {
    doc.pricing_tables()
        .map(|(block, data)| {
            let summary = compute_pricing(data);
            PricingReport {
                block_id: block.id.clone(),
                currency: data.currency.clone(),
                display_total: format_money(summary.total, &data.currency),
                summary,
            }
        })
        .collect()
}

// ============================================================================
// apply
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptSummary {
    steps: usize,
    applied: usize,
    no_ops: usize,
    revision: u64,
    status: SaveStatus,
    output: PathBuf,
    evaluation: Evaluation,
}

async fn run_script(
    document: &Path,
    script: &Path,
    out: &Path,
    config: SessionConfig,
) -> Result<ScriptSummary> {
    let doc = load(document).await?;
    let text = tokio::fs::read_to_string(script)
        .await
        .with_context(|| format!("reading script {}", script.display()))?;
    let steps = parse_script(&text).with_context(|| format!("parsing {}", script.display()))?;

    let session = EditorSession::new(doc, Arc::new(JsonFilePersistence::new(out)), config);
    let mut applied = 0;
    for (index, step) in steps.iter().enumerate() {
        match session.run_step(step) {
            Ok(Outcome::Applied) => applied += 1,
            Ok(Outcome::NoOp) => {}
            Err(e) => {
                session.close().await;
                bail!("step {index} refused: {e}");
            }
        }
    }

    session.save_now().await.context("saving document")?;
    let summary = ScriptSummary {
        steps: steps.len(),
        applied,
        no_ops: steps.len() - applied,
        revision: session.revision(),
        status: session.save_status(),
        output: out.to_path_buf(),
        evaluation: Evaluation::clone(&session.evaluation()),
    };
    session.close().await;
    Ok(summary)
}
