use anyhow::Result;
use pedindex::{run_index, run_population, CensusSource, IndexKind, OverpassSource, PopulationTable};
use tracing::info;

pub fn run(args: &crate::cli::RunArgs, kind: IndexKind) -> Result<()> {
    let config = super::config(args)?;

    let report = match kind {
        IndexKind::Population => match &config.population_csv {
            Some(path) => run_population(&config, &PopulationTable::from_csv(path)?)?,
            None => {
                let source = CensusSource::new(config.api_key.as_deref(), config.timeout())?;
                run_population(&config, &source)?
            }
        },
        _ => {
            let source = OverpassSource::new(config.overpass_url.clone(), config.timeout())?;
            run_index(&config, kind, &source)?
        }
    };

    info!(
        index = %report.kind,
        year = report.year,
        units = report.units,
        failed = report.failed,
        unmatched = report.unmatched,
        "done",
    );
    Ok(())
}
