//! Batch driver: one sub-index over one unit collection for one year, and the composite.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use rayon::{prelude::*, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::{
    aggregate::{count_intersections_within, count_points, dedup_points, land_use_entropy, merge_population},
    config::Config,
    feature::{AsOf, FeatureFilter, FeatureSource, PointFeature, PopulationSource},
    geom::Projector,
    index::{combine, normalize, CompositeRecord, IndexKind, Normalized},
    io,
    ledger::LedgerRow,
    unit::{GeoType, MeasureStatus, UnitRecord, UnitStore},
};

/// Outcome of one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub kind: IndexKind,
    pub year: u16,
    pub units: usize,
    pub failed: usize,      // Units whose fetch failed
    pub unmatched: usize,   // Units without a population row
    pub max_density: f64,   // Divisor used for normalization
    pub outputs: Vec<PathBuf>,
}

impl BatchReport {
    fn new(store: &UnitStore, kind: IndexKind, year: u16, normalized: &Normalized) -> Self {
        let count = |status: MeasureStatus| store.records().iter().filter(|r| r.status == status).count();
        Self {
            kind,
            year,
            units: store.len(),
            failed: count(MeasureStatus::FetchFailed),
            unmatched: count(MeasureStatus::Unmatched),
            max_density: normalized.max_density,
            outputs: Vec::new(),
        }
    }
}

/// Outcome of the composite step.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeReport {
    pub year: u16,
    pub records: Vec<CompositeRecord>,
    pub outputs: Vec<PathBuf>,
}

/// Per-unit result of a fetch task.
enum Fetched {
    Points(Vec<PointFeature>),
    Measure(f64),
    Failed,
}

/// Fetch and aggregate one unit. A failed fetch is logged and reported, never raised.
fn fetch_unit(
    store: &UnitStore,
    idx: usize,
    kind: IndexKind,
    filter: FeatureFilter,
    source: &dyn FeatureSource,
    as_of: &AsOf,
    proj: &Projector,
) -> Result<Fetched> {
    let unit = &store.units()[idx];
    let Some(bbox) = unit.bbox() else {
        debug!(geo_id = %unit.geo_id, "empty unit geometry, nothing to fetch");
        return Ok(match kind {
            IndexKind::Commercial => Fetched::Points(Vec::new()),
            _ => Fetched::Measure(0.0),
        });
    };

    let features = match source.fetch(&bbox, as_of, filter) {
        Ok(features) => features,
        Err(e) => {
            warn!(geo_id = %unit.geo_id, error = %e, "fetch failed, measure defaults to 0");
            return Ok(Fetched::Failed);
        }
    };
    debug!(geo_id = %unit.geo_id, features = features.len(), "fetched");

    Ok(match kind {
        IndexKind::Commercial => Fetched::Points(features.into_points()),
        IndexKind::Intersection => Fetched::Measure(count_intersections_within(&features, store.geoms(), idx, proj)? as f64),
        IndexKind::LandUse => Fetched::Measure(land_use_entropy(features.parcels(), &unit.shape, proj)?),
        IndexKind::Population => bail!("[batch] PDI is not computed from features"),
    })
}

/// Area each unit's density is taken over: km² of land for PDI, planar m² otherwise.
fn unit_areas(store: &UnitStore, kind: IndexKind) -> Vec<f64> {
    store.units().iter()
        .map(|unit| match kind {
            IndexKind::Population => unit.area_km2(),
            _ => unit.area,
        })
        .collect()
}

/// Normalize the batch and attach one record per unit to the store.
fn attach_records(
    store: &mut UnitStore,
    kind: IndexKind,
    measures: Vec<Option<f64>>,
    areas: Vec<f64>,
    statuses: Vec<MeasureStatus>,
) -> Result<Normalized> {
    let normalized = normalize(kind, &measures, &areas);

    let records = (0..store.len())
        .map(|i| UnitRecord {
            status: statuses[i],
            measure: measures[i],
            area: Some(areas[i]),
            density: normalized.densities[i],
            index: normalized.indices[i],
        })
        .collect();
    store.attach(records)?;

    Ok(normalized)
}

/// Compute CDI, IDI or LDI for every unit of the store.
///
/// Fetches run on a pool of `concurrency` threads; results are collected in unit
/// order and attached once all tasks finish.
pub fn compute_spatial_index(store: &mut UnitStore, kind: IndexKind, source: &dyn FeatureSource, year: u16, concurrency: usize) -> Result<BatchReport> {
    let Some(filter) = kind.filter() else {
        bail!("[batch] {kind} has no feature filter");
    };
    let as_of = AsOf::year(year);

    let pool = ThreadPoolBuilder::new()
        .num_threads(concurrency.max(1))
        .build()
        .context("[batch] Failed to build worker pool")?;

    info!(index = %kind, year, units = store.len(), concurrency, "fetching features");
    let batch = &*store;
    let fetched = pool.install(|| (0..batch.len()).into_par_iter()
        .map_init(Projector::web_mercator, |proj, idx| {
            let proj = proj.as_ref().map_err(|e| anyhow!("{e:#}"))?;
            fetch_unit(batch, idx, kind, filter, source, &as_of, proj)
        })
        .collect::<Result<Vec<_>>>())?;

    let statuses = fetched.iter()
        .map(|f| match f {
            Fetched::Failed => MeasureStatus::FetchFailed,
            _ => MeasureStatus::Measured,
        })
        .collect::<Vec<_>>();

    let measures: Vec<Option<f64>> = match kind {
        IndexKind::Commercial => {
            // Boxes of neighbouring units overlap: pool, dedup, then assign each point once.
            let pooled = fetched.into_iter()
                .flat_map(|f| match f {
                    Fetched::Points(points) => points,
                    _ => Vec::new(),
                })
                .collect::<Vec<_>>();
            let points = dedup_points(pooled);
            debug!(points = points.len(), "pooled commercial points");

            let counts = count_points(store.geoms(), &points, &Projector::web_mercator()?)?;
            counts.into_iter().zip(&statuses)
                .map(|(count, status)| match status {
                    MeasureStatus::FetchFailed => Some(0.0),
                    _ => Some(count as f64),
                })
                .collect()
        }
        _ => fetched.into_iter()
            .map(|f| match f {
                Fetched::Measure(m) => Some(m),
                _ => Some(0.0),
            })
            .collect(),
    };

    let areas = unit_areas(store, kind);
    let normalized = attach_records(store, kind, measures, areas, statuses)?;
    let report = BatchReport::new(store, kind, year, &normalized);
    info!(index = %kind, year, failed = report.failed, max_density = report.max_density, "computed index");
    Ok(report)
}

/// Summary level shared by every unit of the store.
fn batch_level(store: &UnitStore) -> Result<GeoType> {
    let mut level = None;
    for unit in store.units() {
        let Some(ty) = unit.geo_id.ty() else {
            bail!("[batch] GEOID {} is neither a tract nor a block group id", unit.geo_id);
        };
        match level {
            None => level = Some(ty),
            Some(l) if l != ty => bail!("[batch] Unit collection mixes tracts and block groups"),
            _ => {}
        }
    }
    Ok(level.unwrap_or(GeoType::Tract))
}

/// Compute PDI for every unit of the store: one population request per county,
/// merged to units by GEOID.
///
/// A failed county request is logged and leaves that county's units without a measure.
pub fn compute_population_index(store: &mut UnitStore, source: &dyn PopulationSource, year: u16) -> Result<BatchReport> {
    let level = batch_level(store)?;
    let counties = store.counties()?;
    info!(year, units = store.len(), counties = counties.len(), level = level.to_str(), "fetching population");

    let mut rows = Vec::new();
    let mut failed_counties = Vec::new();
    for (state, county) in counties {
        match source.fetch_population(&state, &county, year, level) {
            Ok(fetched) => {
                debug!(state = %state, county = %county, rows = fetched.len(), "fetched population");
                rows.extend(fetched);
            }
            Err(e) => {
                warn!(state = %state, county = %county, error = %format!("{e:#}"), "population fetch failed");
                failed_counties.push((state, county));
            }
        }
    }

    let merge = merge_population(store, &rows)?;
    let statuses = store.units().iter().zip(&merge.counts)
        .map(|(unit, count)| {
            let failed = failed_counties.iter()
                .any(|(s, c)| unit.geo_id.state() == Some(s.as_str()) && unit.geo_id.county() == Some(c.as_str()));
            match (failed, count) {
                (true, _) => MeasureStatus::FetchFailed,
                (false, Some(_)) => MeasureStatus::Measured,
                (false, None) => MeasureStatus::Unmatched,
            }
        })
        .collect::<Vec<_>>();

    // A land area reported with the population row takes precedence over the unit's own.
    let areas = unit_areas(store, IndexKind::Population).into_iter().zip(&merge.land_areas)
        .map(|(area, land)| land.unwrap_or(area))
        .collect();
    let normalized = attach_records(store, IndexKind::Population, merge.counts, areas, statuses)?;
    let report = BatchReport::new(store, IndexKind::Population, year, &normalized);
    if report.unmatched > 0 {
        warn!(unmatched = report.unmatched, "units without a population estimate");
    }
    info!(year, max_density = report.max_density, "computed PDI");
    Ok(report)
}

/// Write the per-index outputs of a computed batch and append its ledger rows.
pub fn write_batch(config: &Config, store: &UnitStore, kind: IndexKind) -> Result<Vec<PathBuf>> {
    let csv_path = config.output_path(kind.code(), "csv");
    io::write_csv(&mut io::index_frame(store, kind)?, &csv_path)?;

    let geojson_path = config.output_path(kind.code(), "geojson");
    io::write_index_geojson(&geojson_path, store, kind)?;

    let ledger = config.ledger(kind);
    ledger.append(&LedgerRow::from_store(store, config.year))?;

    info!(csv = %csv_path.display(), geojson = %geojson_path.display(), ledger = %ledger.path().display(), "wrote outputs");
    Ok(vec![csv_path, geojson_path, ledger.path().to_path_buf()])
}

/// Load the configured unit collection into a store.
pub fn load_units(config: &Config) -> Result<UnitStore> {
    let sources = io::read_unit_collection(&config.input_path)?;
    info!(path = %config.input_path.display(), units = sources.len(), "loaded unit collection");
    UnitStore::from_sources(sources)
}

/// Run one of CDI, IDI or LDI for the configured year.
pub fn run_index(config: &Config, kind: IndexKind, source: &dyn FeatureSource) -> Result<BatchReport> {
    config.validate()?;
    let mut store = load_units(config)?;
    let mut report = compute_spatial_index(&mut store, kind, source, config.year, config.concurrency)?;
    report.outputs = write_batch(config, &store, kind)?;
    Ok(report)
}

/// Run PDI for the configured year.
pub fn run_population(config: &Config, source: &dyn PopulationSource) -> Result<BatchReport> {
    config.validate()?;
    let mut store = load_units(config)?;
    let mut report = compute_population_index(&mut store, source, config.year)?;
    report.outputs = write_batch(config, &store, IndexKind::Population)?;
    Ok(report)
}

/// Combine the four sub-index tables of the configured year into PEI.
/// Every table must exist; geometry is taken from the PDI GeoJSON of the same year.
pub fn run_composite(config: &Config) -> Result<CompositeReport> {
    config.validate()?;

    let tables = IndexKind::ALL.iter()
        .map(|&kind| {
            let path = config.output_path(kind.code(), "csv");
            if !path.exists() {
                bail!("[batch] Missing {kind} table for PEI calculation: {}", path.display());
            }
            io::read_index_table(&path, kind)
        })
        .collect::<Result<Vec<_>>>()?;

    let records = combine(&tables)?;
    info!(year = config.year, units = records.len(), "combined sub-indices");

    let pdi_geojson = config.output_path(IndexKind::Population.code(), "geojson");
    let geometries = io::read_geometries(&pdi_geojson)
        .with_context(|| format!("[batch] PEI geometry comes from the PDI output {}", pdi_geojson.display()))?;

    let csv_path = config.output_path("PEI", "csv");
    io::write_csv(&mut io::pei_frame(&records)?, &csv_path)?;
    let geojson_path = config.output_path("PEI", "geojson");
    io::write_pei_geojson(&geojson_path, &records, &geometries)?;

    info!(csv = %csv_path.display(), geojson = %geojson_path.display(), "wrote PEI");
    Ok(CompositeReport { year: config.year, records, outputs: vec![csv_path, geojson_path] })
}

/// Deduplicate the ledger of one sub-index. Returns the number of rows removed.
pub fn dedup_ledger(config: &Config, kind: IndexKind) -> Result<usize> {
    config.ledger(kind).dedup()
}
