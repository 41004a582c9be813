pub mod dedup;
pub mod index;
pub mod pei;

use anyhow::{Context, Result};
use pedindex::Config;

use crate::cli::RunArgs;

/// Build the run config: the `--config` file if given, then explicit arguments on top.
pub fn config(args: &RunArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::new(
            args.input.clone().context("--input is required without --config")?,
            args.output_prefix.clone().context("--output-prefix is required without --config")?,
            args.year.context("--year is required without --config")?,
            args.aggregate_dir.clone().unwrap_or_else(|| ".".into()),
        ),
    };

    if let Some(input) = &args.input { config.input_path = input.clone() }
    if let Some(prefix) = &args.output_prefix { config.output_prefix = prefix.clone() }
    if let Some(year) = args.year { config.year = year }
    if let Some(dir) = &args.aggregate_dir { config.aggregate_path = dir.clone() }
    if let Some(n) = args.concurrency { config.concurrency = n }
    if let Some(secs) = args.timeout_secs { config.timeout_secs = secs }
    if let Some(url) = &args.overpass_url { config.overpass_url = url.clone() }
    if let Some(key) = &args.api_key { config.api_key = Some(key.clone()) }
    if let Some(path) = &args.population_csv { config.population_csv = Some(path.clone()) }

    config.validate()?;
    Ok(config)
}
