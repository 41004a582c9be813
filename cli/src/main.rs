mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{dedup, index, pei};
use pedindex::IndexKind;

/// Install the stderr log subscriber; `RUST_LOG` overrides the verbosity flag.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Cdi(args) => index::run(args, IndexKind::Commercial),
        Commands::Idi(args) => index::run(args, IndexKind::Intersection),
        Commands::Ldi(args) => index::run(args, IndexKind::LandUse),
        Commands::Pdi(args) => index::run(args, IndexKind::Population),
        Commands::Pei(args) => pei::run(args),
        Commands::Dedup(args) => dedup::run(args),
    }
}

fn main() -> anyhow::Result<()> { run() }
