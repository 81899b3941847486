//! The `process` subcommand: trajectory file to gridded statistics.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::{info, warn};

use particle_grid::{Concentration, Counts, GroupKey, HorizontalGrid, Quantity};
use particle_io::{ParticleFile, ResultsFile, Topography};

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Path to trajectory data file
    #[arg(short, long)]
    pub source: PathBuf,

    /// Results file
    #[arg(short, long, default_value = "counts.nc")]
    pub out_file: PathBuf,

    /// Overwrite results file
    #[arg(short = 'O', long)]
    pub overwrite: bool,

    /// Topography (grid) file
    #[arg(long, default_value = "topo.nc")]
    pub topo: PathBuf,

    /// Resolution of grid (meters)
    #[arg(long = "dx", visible_alias = "resolution")]
    pub resolution: Option<f64>,

    /// Particle stratifications to compute
    #[arg(
        long = "sort",
        num_args = 1..,
        value_parser = parse_group_key,
        default_values_t = [GroupKey::All, GroupKey::Id, GroupKey::State],
    )]
    pub sort: Vec<GroupKey>,

    /// List of particle IDs to use in processing
    #[arg(long = "id-list", num_args = 1..)]
    pub id_list: Option<Vec<f64>>,

    /// Initial particle position file
    #[arg(long = "ini-file")]
    pub ini_file: Option<PathBuf>,

    /// Use only last active position of each particle
    #[arg(long)]
    pub last: bool,
}

fn parse_group_key(s: &str) -> Result<GroupKey, particle_grid::GridError> {
    s.parse()
}

/// Run the full processing pipeline.
pub fn run(args: &ProcessArgs) -> Result<()> {
    info!(source = %args.source.display(), "processing");

    let mut results = ResultsFile::create(&args.out_file, args.source.to_string_lossy())?;
    results.guard_overwrite(args.overwrite)?;

    if let Some(ini_file) = &args.ini_file {
        warn!(
            file = %ini_file.display(),
            "ignoring --ini-file: initial-position seeding is not implemented"
        );
    }

    let particles = ParticleFile::open(&args.source, args.id_list.as_deref())?;
    let topo = Topography::read(&args.topo)?;
    let grid = HorizontalGrid::new(topo.lon, topo.lat, args.resolution)?;
    results.initialize(&grid)?;

    let samples = particles.samples(args.last)?;

    let quantities: Vec<Box<dyn Quantity + '_>> = vec![
        Box::new(Counts::new(&grid)),
        Box::new(Concentration::new(&grid)),
    ];

    let mut done: Vec<GroupKey> = Vec::new();
    for &key in &args.sort {
        if done.contains(&key) {
            continue;
        }
        done.push(key);
        let counts = grid.grouped_counts(&samples, key)?;
        for quantity in &quantities {
            results.append(quantity.run(&counts), key);
        }
    }

    results.write()?;
    Ok(())
}
