// End-to-end runs of every sub-index and the composite over two adjacent tracts,
// with in-memory feature and population sources.

use std::{fs, path::Path};

use anyhow::{bail, Result};
use geo::{coord, Point};
use pedindex::{
    run_composite, run_index, run_population, AsOf, Config, Feature, FeatureCollection,
    FeatureFilter, FeatureSource, FetchError, GeoType, IndexKind, LandParcel, LonLatBox,
    PointFeature, PopulationRow, PopulationSource, PopulationTable, RoadElement,
};
use tempfile::TempDir;

// A = [0, 0.01] x [0, 0.01], B = [0.01, 0.02] x [0, 0.01]: equal planar areas.
const TRACTS: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature",
         "properties": {"GEOID": "06001400100", "ALAND": 1000000},
         "geometry": {"type": "Polygon", "coordinates": [[[0,0],[0.01,0],[0.01,0.01],[0,0.01],[0,0]]]}},
        {"type": "Feature",
         "properties": {"GEOID": "06001400200", "ALAND": 1000000},
         "geometry": {"type": "Polygon", "coordinates": [[[0.01,0],[0.02,0],[0.02,0.01],[0.01,0.01],[0.01,0]]]}}
    ]
}"#;

// Same shapes, tract B moved to another county.
const TWO_COUNTIES: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature",
         "properties": {"GEOID": "06001400100", "ALAND": 1000000},
         "geometry": {"type": "Polygon", "coordinates": [[[0,0],[0.01,0],[0.01,0.01],[0,0.01],[0,0]]]}},
        {"type": "Feature",
         "properties": {"GEOID": "06003400200", "ALAND": 1000000},
         "geometry": {"type": "Polygon", "coordinates": [[[0.01,0],[0.02,0],[0.02,0.01],[0.01,0.01],[0.01,0]]]}}
    ]
}"#;

/// Returns the same features for every box, like an over-wide query would.
struct FixedSource {
    fail_east_of: Option<f64>,
}

impl FixedSource {
    fn new() -> Self { Self { fail_east_of: None } }
}

fn poi(id: u64, x: f64, y: f64) -> Feature {
    Feature::Point(PointFeature { id: Some(id), location: Point::new(x, y), category: "shop=bakery".into() })
}

fn node(id: u64, x: f64, y: f64) -> Feature {
    Feature::Road(RoadElement::Node { id, location: Point::new(x, y) })
}

fn way(id: u64, nodes: &[u64]) -> Feature {
    Feature::Road(RoadElement::Way { id, nodes: nodes.to_vec() })
}

fn parcel(category: &str, x0: f64, x1: f64) -> Feature {
    Feature::LandParcel(LandParcel::from_coords(category, vec![
        coord! { x: x0, y: 0.0 }, coord! { x: x1, y: 0.0 }, coord! { x: x1, y: 0.01 },
        coord! { x: x0, y: 0.01 }, coord! { x: x0, y: 0.0 },
    ]))
}

impl FeatureSource for FixedSource {
    fn fetch(&self, bbox: &LonLatBox, _as_of: &AsOf, filter: FeatureFilter) -> Result<FeatureCollection, FetchError> {
        if self.fail_east_of.is_some_and(|x| bbox.west >= x) {
            return Err(FetchError::Status(504));
        }
        let features = match filter {
            FeatureFilter::Commercial => vec![
                poi(1, 0.002, 0.005),
                poi(2, 0.004, 0.005),
                poi(3, 0.01, 0.005),    // on the shared edge: goes to A
                poi(4, 0.015, 0.005),
            ],
            FeatureFilter::Roads => vec![
                node(1, 0.005, 0.005),
                node(5, 0.015, 0.005),
                way(10, &[1, 2]), way(11, &[1, 3]), way(12, &[4, 1]),
                way(13, &[5, 6]), way(14, &[7, 5]),
            ],
            FeatureFilter::LandUse => vec![
                parcel("residential", 0.0, 0.005),
                parcel("commercial", 0.005, 0.01),
                parcel("residential", 0.01, 0.02),
            ],
        };
        Ok(FeatureCollection::new(features))
    }
}

struct FixedPopulation;

impl PopulationSource for FixedPopulation {
    fn fetch_population(&self, state: &str, county: &str, _year: u16, level: GeoType) -> Result<Vec<PopulationRow>> {
        if (state, county, level) != ("06", "001", GeoType::Tract) {
            bail!("unexpected request {state} {county} {level:?}");
        }
        Ok(vec![
            PopulationRow { state: "06".into(), county: "001".into(), tract: "400200".into(), group: None, population: Some(50.0), land_area_km2: None },
            PopulationRow { state: "06".into(), county: "001".into(), tract: "400100".into(), group: None, population: Some(100.0), land_area_km2: None },
        ])
    }
}

/// Serves county 06001 and fails every other county.
struct OneCountyDown;

impl PopulationSource for OneCountyDown {
    fn fetch_population(&self, state: &str, county: &str, _year: u16, _level: GeoType) -> Result<Vec<PopulationRow>> {
        if (state, county) != ("06", "001") {
            bail!("503 Service Unavailable for {state}{county}");
        }
        Ok(vec![
            PopulationRow { state: "06".into(), county: "001".into(), tract: "400100".into(), group: None, population: Some(100.0), land_area_km2: None },
        ])
    }
}

fn setup() -> (TempDir, Config) {
    setup_with(TRACTS)
}

fn setup_with(collection: &str) -> (TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("tracts.geojson");
    fs::write(&input, collection).unwrap();

    let prefix = dir.path().join("out/tracts").to_string_lossy().into_owned();
    let config = Config::new(input, prefix, 2013, dir.path().join("ledgers"));
    (dir, config)
}

fn assert_close(a: f64, b: f64) {
    assert!((a - b).abs() < 1e-9, "{a} != {b}");
}

fn csv_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path).unwrap().lines().map(str::to_string).collect()
}

#[test]
fn commercial_points_are_assigned_once() {
    let (_dir, config) = setup();
    let report = run_index(&config, IndexKind::Commercial, &FixedSource::new()).unwrap();
    assert_eq!(report.units, 2);
    assert_eq!(report.failed, 0);

    let lines = csv_lines(&config.output_path("CDI", "csv"));
    assert_eq!(lines[0], "GEOID,Commercial Count,Commercial Density,CDI,Polygon Area,Coordinates");
    assert!(lines[1].starts_with("06001400100,3.0,"), "{}", lines[1]);
    assert!(lines[2].starts_with("06001400200,1.0,"), "{}", lines[2]);

    let geojson: serde_json::Value = serde_json::from_slice(&fs::read(config.output_path("CDI", "geojson")).unwrap()).unwrap();
    let features = geojson["features"].as_array().unwrap();
    assert_eq!(features[0]["properties"]["CDI"], 1.0);
    assert_close(features[1]["properties"]["CDI"].as_f64().unwrap(), 1.0 / 3.0);
    assert_eq!(features[0]["geometry"]["type"], "Polygon");
}

#[test]
fn failed_fetch_defaults_to_zero() {
    let (_dir, config) = setup();
    let source = FixedSource { fail_east_of: Some(0.01) };
    let report = run_index(&config, IndexKind::Intersection, &source).unwrap();
    assert_eq!(report.failed, 1);

    let lines = csv_lines(&config.output_path("IDI", "csv"));
    assert!(lines[1].starts_with("06001400100,1.0,"), "{}", lines[1]);
    assert!(lines[2].starts_with("06001400200,0.0,0.0,0.0,"), "{}", lines[2]);
}

#[test]
fn ledger_repeats_rows_on_rerun() {
    let (_dir, config) = setup();
    run_index(&config, IndexKind::LandUse, &FixedSource::new()).unwrap();
    run_index(&config, IndexKind::LandUse, &FixedSource::new()).unwrap();

    let lines = csv_lines(config.ledger(IndexKind::LandUse).path());
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "GEOID,Entropy");
    assert_eq!(lines.iter().filter(|l| l.starts_with("06001400100+2013,")).count(), 2);

    assert_eq!(config.ledger(IndexKind::LandUse).dedup().unwrap(), 2);
    assert_eq!(csv_lines(config.ledger(IndexKind::LandUse).path()).len(), 3);
}

#[test]
fn composite_of_all_four() {
    let (_dir, config) = setup();
    let source = FixedSource::new();
    for kind in [IndexKind::Commercial, IndexKind::Intersection, IndexKind::LandUse] {
        run_index(&config, kind, &source).unwrap();
    }
    let pdi = run_population(&config, &FixedPopulation).unwrap();
    assert_eq!(pdi.unmatched, 0);
    assert_close(pdi.max_density, 100.0);

    let report = run_composite(&config).unwrap();
    assert_eq!(report.records.len(), 2);

    // A: PDI 100, CDI 1, IDI 1, LDI 1.
    let a = &report.records[0];
    assert_eq!(a.geo_id.id(), "06001400100");
    assert_close(a.pdi.unwrap(), 100.0);
    assert_close(a.ldi.unwrap(), 1.0);
    assert_close(a.pei(), 101.0 * 8.0 / 16.0);

    // B: PDI 50, CDI 1/3, IDI 1, LDI 0.
    let b = &report.records[1];
    assert_close(b.ldi.unwrap(), 0.0);
    assert_close(b.pei(), 51.0 * (4.0 / 3.0) * 2.0 / 16.0);

    let lines = csv_lines(&config.output_path("PEI", "csv"));
    assert_eq!(lines[0], "GEOID,PEI");
    assert!(lines[1].starts_with("06001400100,"));

    let geojson: serde_json::Value = serde_json::from_slice(&fs::read(config.output_path("PEI", "geojson")).unwrap()).unwrap();
    assert_eq!(geojson["features"][1]["properties"]["GEOID"], "06001400200");
    assert_eq!(geojson["features"][1]["geometry"]["type"], "Polygon");
}

#[test]
fn composite_without_a_table_is_fatal() {
    let (_dir, config) = setup();
    let source = FixedSource::new();
    run_index(&config, IndexKind::Commercial, &source).unwrap();
    run_index(&config, IndexKind::Intersection, &source).unwrap();
    run_population(&config, &FixedPopulation).unwrap();

    let err = run_composite(&config).unwrap_err();
    assert!(format!("{err:#}").contains("LDI"), "{err:#}");
}

#[test]
fn failed_county_falls_back_in_composite() {
    let (_dir, config) = setup_with(TWO_COUNTIES);
    let source = FixedSource::new();
    for kind in [IndexKind::Commercial, IndexKind::Intersection, IndexKind::LandUse] {
        run_index(&config, kind, &source).unwrap();
    }

    let pdi = run_population(&config, &OneCountyDown).unwrap();
    assert_eq!(pdi.units, 2);
    assert_eq!(pdi.failed, 1);
    assert_eq!(pdi.unmatched, 0);

    let lines = csv_lines(&config.output_path("PDI", "csv"));
    assert!(lines[1].starts_with("06001400100,100.0,100.0,100.0,"), "{}", lines[1]);
    assert!(lines[2].starts_with("06003400200,,,,"), "{}", lines[2]);

    let report = run_composite(&config).unwrap();
    let b = &report.records[1];
    assert_eq!(b.geo_id.id(), "06003400200");
    assert_eq!(b.pdi, None);
    // PDI 0.5 (fallback), CDI 1/3, IDI 1, LDI 0.
    assert_close(b.pei(), 1.5 * (4.0 / 3.0) * 2.0 / 16.0);
    assert_close(report.records[0].pei(), 101.0 * 8.0 / 16.0);
}

#[test]
fn population_from_local_table() {
    let (dir, mut config) = setup();
    let table = dir.path().join("pdi_2013.csv");
    fs::write(&table, concat!(
        "GEOID,TotPop,LandSQMI\n",
        "06001400100,\"Total population 1,000\",0.5\n",
        "06001400200,\"1,000\",1\n",
    )).unwrap();
    config.population_csv = Some(table.clone());

    let source = PopulationTable::from_csv(&table).unwrap();
    let report = run_population(&config, &source).unwrap();
    assert_eq!(report.failed, 0);
    assert_eq!(report.unmatched, 0);
    assert_close(report.max_density, 1000.0 / (0.5 * 2.589_988_110_336));

    // Same count over twice the land area: half the density.
    let geojson: serde_json::Value = serde_json::from_slice(&fs::read(config.output_path("PDI", "geojson")).unwrap()).unwrap();
    assert_close(geojson["features"][0]["properties"]["PDI"].as_f64().unwrap(), 100.0);
    assert_close(geojson["features"][1]["properties"]["PDI"].as_f64().unwrap(), 50.0);
}
