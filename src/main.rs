use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use mettool::{
    io::{self, Source},
    logging, AnalysisConfig, Pipeline,
};
use serde::Serialize;
use std::{fs, path::PathBuf};
use tracing::info;

/// Filter and analyse time-stamped measurement sheets
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the sheets of a source
    Sheets { input: PathBuf },
    /// List the columns left after pruning
    Columns {
        input: PathBuf,
        /// Sheet to load (defaults to the first one)
        #[arg(long)]
        sheet: Option<String>,
    },
    /// Correlation heatmap over a date range
    Correlation(Request),
    /// CUSUM trend per column over a date range
    Cusum(Request),
    /// Control chart of one column across periods
    Control(Request),
}

#[derive(Args, Debug)]
struct Request {
    input: PathBuf,
    /// YAML or JSON analysis config
    #[arg(long)]
    config: PathBuf,
    /// Sheet to load (defaults to the first one)
    #[arg(long)]
    sheet: Option<String>,
    /// Write the cleaned table here as a workbook
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    logging::init_tracing("info");
    let cli = Cli::parse();

    // ─── 2) dispatch ─────────────────────────────────────────────────
    match cli.command {
        Command::Sheets { input } => {
            for name in io::list_sheets(&Source::from(input)) {
                println!("{name}");
            }
        }
        Command::Columns { input, sheet } => {
            let pipeline = open(input, sheet)?;
            for name in pipeline.columns() {
                println!("{name}");
            }
        }
        Command::Correlation(req) => {
            let (mut pipeline, cfg) = prepare(&req)?;
            let out = pipeline.run_correlation(&cfg)?;
            finish(&out.plot, &out.export, req.export.as_ref())?;
        }
        Command::Cusum(req) => {
            let (mut pipeline, cfg) = prepare(&req)?;
            let out = pipeline.run_cusum(&cfg)?;
            finish(&out.plot, &out.export, req.export.as_ref())?;
        }
        Command::Control(req) => {
            let (mut pipeline, cfg) = prepare(&req)?;
            let out = pipeline.run_control_graph(&cfg)?;
            finish(&out.plot, &out.export, req.export.as_ref())?;
        }
    }
    Ok(())
}

fn open(input: PathBuf, sheet: Option<String>) -> Result<Pipeline> {
    let source = Source::from(input.clone());
    let sheet = match sheet {
        Some(s) => s,
        None => match io::list_sheets(&source).into_iter().next() {
            Some(s) => s,
            None => bail!("no sheets found in {}", input.display()),
        },
    };
    Pipeline::load(&source, &sheet)
        .with_context(|| format!("loading sheet \"{sheet}\" from {}", input.display()))
}

fn prepare(req: &Request) -> Result<(Pipeline, AnalysisConfig)> {
    let cfg = AnalysisConfig::from_path(&req.config)
        .with_context(|| format!("reading config {}", req.config.display()))?;
    let pipeline = open(req.input.clone(), req.sheet.clone())?;
    Ok((pipeline, cfg))
}

// ─── 3) emit plot JSON and the optional export ──────────────────────
fn finish<P: Serialize>(plot: &P, export: &[u8], path: Option<&PathBuf>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(plot)?);

    if let Some(path) = path {
        if export.is_empty() {
            bail!("export produced no data, nothing written to {}", path.display());
        }
        fs::write(path, export).with_context(|| format!("writing {}", path.display()))?;
        info!(bytes = export.len(), "exported → {}", path.display());
    }
    Ok(())
}
