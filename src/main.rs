//! PolicyLens - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use policylens::{
    answer::{context_from, Answerer},
    bootstrap::{build_answerer, Components},
    cli::{Args, Commands, Verbosity},
    config::Config,
    embedding::Embedder,
    logging,
    types::Verdict,
    QueryReport,
};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = args.verbosity();
    logging::init(verbosity);

    let config = load_config(&args)?;

    match &args.command {
        Commands::Ingest { docs } => {
            run_ingest(&config, docs.clone(), verbosity).await?;
        }
        Commands::Query { text, answer, json } => {
            run_query(&config, text, *answer || config.answerer.enabled, *json, verbosity).await?;
        }
        Commands::Stats => {
            show_stats(&config).await?;
        }
        Commands::Config => {
            show_config(&args, &config)?;
        }
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn progress_bar(verbosity: Verbosity) -> ProgressBar {
    if !verbosity.show_progress() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.cyan} Embedding [{bar:40.cyan/blue}] {pos}/{len} chunks | {eta}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb
}

async fn run_ingest(config: &Config, docs: Option<PathBuf>, verbosity: Verbosity) -> Result<()> {
    let docs_dir = docs.unwrap_or_else(|| config.ingestion.docs_dir.clone());
    if !docs_dir.is_dir() {
        anyhow::bail!("Documents directory not found: {}", docs_dir.display());
    }

    let components = Components::load(config).await?;
    let ingestor = components
        .ingestor(config)
        .await?
        .with_progress(progress_bar(verbosity));

    let report = ingestor.ingest_dir(&docs_dir).await?;

    println!();
    println!("{}", "Ingestion complete".bold());
    println!("  Documents:  {} seen, {} ingested, {} skipped, {} failed",
        report.documents_seen,
        report.documents_ingested,
        report.documents_skipped,
        report.documents_failed,
    );
    println!("  Chunks:     {} created, {} embedded, {} stored",
        report.chunks_created,
        report.chunks_embedded,
        report.chunks_stored,
    );
    if report.embedding_failures > 0 {
        println!("  {} {} chunks could not be embedded", "!".yellow(), report.embedding_failures);
    }
    if report.is_clean() {
        println!("  {} Corpus holds {} chunks", "✓".green(), report.final_count);
    } else {
        println!("  {} Corpus holds {} chunks", "!".yellow(), report.final_count);
    }
    println!();

    Ok(())
}

async fn run_query(
    config: &Config,
    text: &str,
    with_answer: bool,
    json: bool,
    verbosity: Verbosity,
) -> Result<()> {
    let components = Components::load(config).await?;
    let pipeline = components.pipeline(config)?;

    let report = pipeline.process_detailed(text).await?;

    // the decision is final before the answerer runs
    let answer = if with_answer {
        let answerer = build_answerer(config)?;
        match answerer.answer(text, &context_from(&report.chunks)).await {
            Ok(answer) => Some(answer),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    } else {
        None
    };

    if json {
        let output = report.to_json(answer.as_ref())?;
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_report(&report, verbosity);
    if let Some(answer) = answer {
        println!("{}", "Answer:".bold());
        println!("  {}", answer.text);
        println!();
    }

    Ok(())
}

fn print_report(report: &QueryReport, verbosity: Verbosity) {
    let parsed = &report.parsed;
    let show = |value: Option<String>| value.unwrap_or_else(|| "-".dimmed().to_string());

    println!();
    println!("{}", "Query:".bold());
    println!("  Age:             {}", show(parsed.age.map(|a| a.to_string())));
    println!("  Gender:          {}", show(parsed.gender.as_ref().map(|g| g.to_string())));
    println!("  Procedure:       {}", show(parsed.procedure.clone()));
    println!("  Location:        {}", show(parsed.location.clone()));
    println!("  Policy duration: {}", show(parsed.policy_duration.clone()));
    println!();

    let decision = &report.decision;
    let verdict = match decision.verdict {
        Verdict::Approved => decision.verdict.to_string().green().bold(),
        Verdict::Rejected => decision.verdict.to_string().red().bold(),
        Verdict::Undetermined => decision.verdict.to_string().yellow().bold(),
    };
    println!("{} {}", "Decision:".bold(), verdict);
    println!("  Amount:        {}", decision.amount);
    println!("  Justification: {}", decision.justification);
    if !decision.is_decisive() {
        println!("  {}", "No retrieved clause settles coverage; check the policy wording".dimmed());
    }
    if !decision.applicable_clauses.is_empty() {
        println!("  Applicable clauses:");
        for clause in &decision.applicable_clauses {
            println!("    • {}", clause);
        }
    }
    println!();

    if verbosity.show_evidence() {
        println!("{}", "Retrieved chunks:".bold());
        for chunk in &report.chunks {
            println!(
                "  [{:.3}] {} #{}",
                chunk.distance,
                chunk.source().cyan(),
                chunk.chunk.index
            );
        }
        println!();
    }
}

async fn show_stats(config: &Config) -> Result<()> {
    let components = Components::load(config).await?;
    let pipeline = components.pipeline(config)?;
    let count = pipeline.retrieval_engine().corpus_size().await?;

    println!();
    println!("{}", "Corpus:".bold());
    println!("  Backend:  {:?}", config.store.backend);
    println!("  Chunks:   {}", count);
    println!("  Model:    {}", components.embedder.model_id());
    println!();

    Ok(())
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };

    println!();
    println!("{} {}", "Configuration:".bold(), path.display());
    println!();
    println!("{}", toml::to_string_pretty(config)?);
    println!("Verbosity: {}", args.verbosity().as_str());
    println!();

    Ok(())
}
