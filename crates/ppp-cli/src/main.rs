//! Post-processor for particle tracking model output.
//!
//! Bins particle positions from a trajectory file onto a grid derived from
//! a topography file, computes per-cell counts and concentrations (overall
//! and stratified by particle id or state), and writes them to a netCDF
//! results file.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use ppp_cli::process::{self, ProcessArgs};

#[derive(Parser)]
#[command(name = "ppp")]
#[command(about = "Post-processing for particle tracking model output", long_about = None)]
struct Cli {
    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process particle file
    Process(ProcessArgs),

    /// Plot particle distribution
    Plot {
        /// Path to data file
        #[arg(short, long)]
        source: PathBuf,

        /// Results file
        #[arg(short, long, default_value = "counts.nc")]
        out_file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    particle_io::silence_hdf5_errors();

    match cli.command {
        Commands::Process(args) => process::run(&args),
        Commands::Plot { .. } => bail!("plotting is not implemented yet"),
    }
}
