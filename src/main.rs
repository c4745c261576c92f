use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use seqferry::config::Settings;
use seqferry::{metasheet, reconcile, upload};

#[derive(Parser)]
#[command(
    name = "seqferry",
    about = "Upload genomic sequence samples to a storage platform and drive \
             conversion and pangenome workflows over them"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate sequence and metadata files and upload them as a collection
    Upload(upload::UploadArgs),
    /// Run one reconciliation pass over uploaded samples
    Analyze(reconcile::AnalyzeArgs),
    /// Expand a tabular sample sheet into per-sample metadata documents
    Metasheet(metasheet::MetasheetArgs),
}

fn main() -> Result<()> {
    env_logger::init();
    info!("starting up");

    let cli = Cli::parse();
    match cli.command {
        Command::Upload(args) => upload::run(&Settings::from_env()?, &args),
        Command::Analyze(args) => reconcile::run(&Settings::from_env()?, &args),
        Command::Metasheet(args) => metasheet::run(&args),
    }
}
