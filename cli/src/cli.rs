use std::path::PathBuf;

/// Pedestrian Environment Index CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "pedindex", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Commercial Density Index for one year (logs to stderr)
    Cdi(RunArgs),

    /// Intersection Density Index for one year (logs to stderr)
    Idi(RunArgs),

    /// Land-use Diversity Index for one year (logs to stderr)
    Ldi(RunArgs),

    /// Population Density Index for one year (Census API key or --population-csv)
    Pdi(RunArgs),

    /// Composite PEI from the four sub-index tables of one year
    Pei(RunArgs),

    /// Rewrite ledgers keeping the last row per GEOID+year
    Dedup(DedupArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// JSON config file; explicit arguments override its values
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Unit collection (GeoJSON or shapefile, lon/lat)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// Output prefix, e.g. "out/tracts" gives "out/tracts_2013_CDI.csv"
    #[arg(short, long)]
    pub output_prefix: Option<String>,

    /// Year of the features and estimates
    #[arg(short, long)]
    pub year: Option<u16>,

    /// Directory of the per-index ledgers, defaults to "."
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub aggregate_dir: Option<PathBuf>,

    /// Worker threads for feature fetches
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Timeout of each external request, in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Overpass API endpoint
    #[arg(long)]
    pub overpass_url: Option<String>,

    /// Census API key
    #[arg(long, env = "CENSUS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Local population table (GEOID, TotPop, LandSQMI) used by pdi instead of the Census API
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub population_csv: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct DedupArgs {
    /// Sub-indices whose ledgers to rewrite (CDI, IDI, LDI, PDI), defaults to all
    pub indices: Vec<String>,

    /// Directory of the per-index ledgers, defaults to "."
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub aggregate_dir: Option<PathBuf>,
}
