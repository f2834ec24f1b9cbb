//! kg: a thin command-line driver for a single research reasoning session.
//!
//! Runs one session in-process end to end (explore -> ground -> reason ->
//! synthesize), printing each phase's outcome. There is no persistence
//! between invocations here; a long-running session server is a separate,
//! out-of-scope concern.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use kg_mcts::EvaluationInput;
use kg_orchestrator::evidence::StructuredTriplet;
use kg_orchestrator::session_api::SessionApi;
use kg_orchestrator::SessionConfig;
use kg_resource::{NullVramProbe, ResourceGovernor};
use kg_serializer::OutputFormat;

#[derive(Parser)]
#[command(name = "kg")]
#[command(author, version, about = "Local-first research reasoning engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full exploration/grounding/reasoning/synthesis cycle.
    Run {
        /// The root question the session starts from.
        #[arg(long)]
        question: String,
        /// JSON file of axioms (spec §6 format: array of `Axiom`).
        #[arg(long)]
        axioms: Option<PathBuf>,
        /// JSON file of structured triplets to ground with.
        #[arg(long)]
        evidence: Option<PathBuf>,
        /// Entity id to serialize a neighborhood around in the synthesis phase.
        #[arg(long)]
        seed: String,
        /// Output format for synthesis: markdown, narrative, or json.
        #[arg(long, default_value = "markdown")]
        format: String,
    },
}

fn parse_format(raw: &str) -> Result<OutputFormat> {
    match raw {
        "markdown" => Ok(OutputFormat::Markdown),
        "narrative" => Ok(OutputFormat::Narrative),
        "json" => Ok(OutputFormat::Json),
        other => anyhow::bail!("unknown format '{other}', expected markdown|narrative|json"),
    }
}

fn load_axioms(path: &Option<PathBuf>) -> Result<Vec<kg_axioms::Axiom>> {
    match path {
        None => Ok(Vec::new()),
        Some(path) => {
            let raw = fs::read_to_string(path).with_context(|| format!("reading axioms file {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing axioms file {}", path.display()))
        }
    }
}

fn load_evidence(path: &Option<PathBuf>) -> Result<Vec<StructuredTriplet>> {
    match path {
        None => Ok(Vec::new()),
        Some(path) => {
            let raw = fs::read_to_string(path).with_context(|| format!("reading evidence file {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing evidence file {}", path.display()))
        }
    }
}

fn run(question: String, axioms_path: Option<PathBuf>, evidence_path: Option<PathBuf>, seed: String, format: String) -> Result<()> {
    let format = parse_format(&format)?;
    let axioms = load_axioms(&axioms_path)?;
    let evidence = load_evidence(&evidence_path)?;

    let governor = Arc::new(ResourceGovernor::new(Box::new(NullVramProbe)));
    let api = SessionApi::create(question, axioms, governor, SessionConfig::default());

    let node = api.advance_mcts()?;
    println!("{} selected node {}", "explore:".bold(), node);

    let reports = api.ground(evidence)?;
    for report in &reports {
        println!("{} {:?} edge={:?}", "ground:".bold(), report.outcome, report.edge_id);
    }

    let pending = api.pending_interventions();
    if !pending.is_empty() {
        println!("{}", format!("{} conflict(s) need a human call:", pending.len()).yellow());
        for p in &pending {
            println!("  [{}] {}", p.id, p.question);
        }
        println!("{}", "leaving them pending; resolve via a future invocation once a store exists".dimmed());
    }

    if api.phase() == kg_orchestrator::Phase::Reasoning {
        let value = api.reason(node, EvaluationInput::default())?;
        println!("{} node {} scored {:.3}", "reason:".bold(), node, value);
    } else {
        println!("{}", "reason: skipped, session held in grounding on a pending intervention".dimmed());
    }

    if api.phase() == kg_orchestrator::Phase::Synthesis {
        let text = api.synthesize(&seed, format)?;
        println!("{}", "synthesize:".bold());
        println!("{text}");
    } else {
        println!("{}", "synthesize: skipped, session did not reach the synthesis phase".dimmed());
    }

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { question, axioms, evidence, seed, format } => run(question, axioms, evidence, seed, format),
    }
}
