use anyhow::Result;
use pedindex::run_composite;
use tracing::info;

pub fn run(args: &crate::cli::RunArgs) -> Result<()> {
    let config = super::config(args)?;
    let report = run_composite(&config)?;
    info!(year = report.year, units = report.records.len(), "done");
    Ok(())
}
