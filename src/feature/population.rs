use std::path::Path;

use anyhow::{anyhow, bail, ensure, Context, Result};
use polars::prelude::DataFrame;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{io::{self, GEOID_COLUMN}, unit::{GeoId, GeoType}};

/// ACS 5-year total population estimate.
pub const POPULATION_VARIABLE: &str = "B01003_001E";

/// Population column of a local population table.
pub const TABLE_POPULATION_COLUMN: &str = "TotPop";

/// Land area column (square miles) of a local population table.
pub const TABLE_LAND_COLUMN: &str = "LandSQMI";

const KM2_PER_SQ_MILE: f64 = 2.589_988_110_336;

/// One population estimate, keyed by its FIPS components.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationRow {
    pub state: String,
    pub county: String,
    pub tract: String,
    pub group: Option<String>,
    pub population: Option<f64>,    // None when the service reports no estimate
    pub land_area_km2: Option<f64>, // Overrides the unit's own area when given
}

impl PopulationRow {
    /// GEOID of the unit this row belongs to.
    pub fn geo_id(&self) -> Result<GeoId> {
        GeoId::from_parts(&self.state, &self.county, &self.tract, self.group.as_deref())
    }
}

/// A provider of population estimates per county.
pub trait PopulationSource: Send + Sync {
    fn fetch_population(&self, state: &str, county: &str, year: u16, level: GeoType) -> Result<Vec<PopulationRow>>;
}

/// Decode a Census API table (an array of string arrays, the first being the header).
pub fn decode_census_rows(body: &str) -> Result<Vec<PopulationRow>> {
    let value: Value = serde_json::from_str(body)
        .context("[feature::population] Census response is not valid JSON")?;
    let table = value.as_array()
        .ok_or_else(|| anyhow!("[feature::population] Census response is not a table"))?;

    let Some((header, rows)) = table.split_first() else { return Ok(Vec::new()) };
    let header = header.as_array()
        .ok_or_else(|| anyhow!("[feature::population] Census header is not an array"))?
        .iter()
        .map(|h| h.as_str().unwrap_or_default())
        .collect::<Vec<_>>();

    let column = |name: &str| header.iter().position(|h| *h == name);
    let population = column(POPULATION_VARIABLE)
        .ok_or_else(|| anyhow!("[feature::population] Census response lacks column {POPULATION_VARIABLE}"))?;
    let state = column("state").ok_or_else(|| anyhow!("[feature::population] Census response lacks column state"))?;
    let county = column("county").ok_or_else(|| anyhow!("[feature::population] Census response lacks column county"))?;
    let tract = column("tract").ok_or_else(|| anyhow!("[feature::population] Census response lacks column tract"))?;
    let group = column("block group");

    rows.iter().map(|row| {
        let row = row.as_array()
            .ok_or_else(|| anyhow!("[feature::population] Census row is not an array"))?;
        ensure!(row.len() == header.len(), "[feature::population] Census row has {} cells, expected {}", row.len(), header.len());
        let cell = |i: usize| row[i].as_str().map(str::to_string);

        Ok(PopulationRow {
            state: cell(state).unwrap_or_default(),
            county: cell(county).unwrap_or_default(),
            tract: cell(tract).unwrap_or_default(),
            group: group.and_then(cell),
            // Negative values are ACS annotation sentinels, not counts.
            population: match &row[population] {
                Value::String(s) => s.trim().parse::<f64>().ok(),
                Value::Number(n) => n.as_f64(),
                _ => None,
            }.filter(|p| p.is_finite() && *p >= 0.0),
            land_area_km2: None,
        })
    }).collect()
}

/// Parse a table cell such as `"Total population 4,023"`; anything else unparseable is `None`.
fn clean_number(cell: &str) -> Option<f64> {
    cell.replace("Total population ", "")
        .replace(',', "")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Actual name of a column whose header matches `name` once surrounding spaces are trimmed.
fn find_column(df: &DataFrame, name: &str) -> Option<String> {
    df.get_column_names().into_iter()
        .find(|c| c.trim() == name)
        .map(|c| c.to_string())
}

/// Population estimates read from a local table (`GEOID`, `TotPop`, optional `LandSQMI`)
/// instead of the Census service. The table holds one year; the requested year is not checked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationTable {
    rows: Vec<PopulationRow>,
}

impl PopulationTable {
    pub fn new(rows: Vec<PopulationRow>) -> Self { Self { rows } }

    #[inline] pub fn rows(&self) -> &[PopulationRow] { &self.rows }

    /// Read a population table from CSV. Counts and areas may carry thousands separators
    /// and label text; rows whose GEOID is not a tract or block group id are skipped.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let df = io::read_csv(path)?;
        let Some(geoid) = find_column(&df, GEOID_COLUMN) else {
            bail!("[feature::population] Missing column {GEOID_COLUMN} in {}", path.display());
        };
        let Some(population) = find_column(&df, TABLE_POPULATION_COLUMN) else {
            bail!("[feature::population] Missing column {TABLE_POPULATION_COLUMN} in {}", path.display());
        };

        let geo_ids = io::string_column(&df, &geoid)?;
        let counts = io::string_column(&df, &population)?;
        let land = match find_column(&df, TABLE_LAND_COLUMN) {
            Some(name) => io::string_column(&df, &name)?,
            None => vec![None; df.height()],
        };

        let mut rows = Vec::with_capacity(df.height());
        let mut skipped = 0;
        for ((geo_id, count), land) in geo_ids.into_iter().zip(counts).zip(land) {
            let Some(geo_id) = geo_id.and_then(|id| GeoId::new(id).ok()) else { skipped += 1; continue };
            let (Some(state), Some(county), Some(tract), Some(_)) = (geo_id.state(), geo_id.county(), geo_id.tract(), geo_id.ty()) else {
                skipped += 1;
                continue;
            };
            rows.push(PopulationRow {
                state: state.to_string(),
                county: county.to_string(),
                tract: tract.to_string(),
                group: geo_id.group().map(str::to_string),
                population: count.as_deref().and_then(clean_number).filter(|p| *p >= 0.0),
                land_area_km2: land.as_deref().and_then(clean_number).map(|sq_mi| sq_mi * KM2_PER_SQ_MILE),
            });
        }
        if skipped > 0 {
            warn!(skipped, path = %path.display(), "population table rows without a tract or block group GEOID");
        }
        info!(rows = rows.len(), path = %path.display(), "loaded population table");
        Ok(Self { rows })
    }
}

impl PopulationSource for PopulationTable {
    fn fetch_population(&self, state: &str, county: &str, year: u16, level: GeoType) -> Result<Vec<PopulationRow>> {
        let rows = self.rows.iter()
            .filter(|r| r.state == state && r.county == county)
            .filter(|r| r.group.is_some() == (level == GeoType::Group))
            .cloned()
            .collect::<Vec<_>>();
        debug!(state, county, year, rows = rows.len(), "population rows from table");
        Ok(rows)
    }
}

#[cfg(feature = "download")]
pub use client::CensusSource;

#[cfg(feature = "download")]
mod client {
    use std::time::Duration;

    use anyhow::{bail, Context, Result};
    use reqwest::blocking::Client;

    use crate::unit::GeoType;
    use super::{decode_census_rows, PopulationRow, PopulationSource, POPULATION_VARIABLE};

    /// Population source backed by the Census ACS 5-year API.
    #[derive(Debug, Clone)]
    pub struct CensusSource {
        client: Client,
        api_key: String,
    }

    impl CensusSource {
        /// A key is required up front; requests without one are rejected by the service.
        pub fn new(api_key: Option<&str>, timeout: Duration) -> Result<Self> {
            let Some(api_key) = api_key.map(str::trim).filter(|k| !k.is_empty()) else {
                bail!("[feature::population] A Census API key must be provided (api_key or CENSUS_API_KEY)");
            };
            let client = Client::builder()
                .user_agent(concat!("pedindex/", env!("CARGO_PKG_VERSION")))
                .timeout(timeout)
                .build()
                .context("[feature::population] Failed to build HTTP client")?;
            Ok(Self { client, api_key: api_key.to_string() })
        }
    }

    impl PopulationSource for CensusSource {
        fn fetch_population(&self, state: &str, county: &str, year: u16, level: GeoType) -> Result<Vec<PopulationRow>> {
            let url = format!("https://api.census.gov/data/{year}/acs/acs5");
            let state_in = format!("state:{state}");
            let county_in = format!("county:{county}");

            let mut params = vec![("get", POPULATION_VARIABLE), ("in", state_in.as_str()), ("in", county_in.as_str())];
            match level {
                GeoType::Tract => params.push(("for", "tract:*")),
                GeoType::Group => params.extend([("in", "tract:*"), ("for", "block group:*")]),
            }
            params.push(("key", self.api_key.as_str()));

            let body = self.client.get(&url)
                .query(&params)
                .send()
                .with_context(|| format!("GET {url} ({state_in} {county_in})"))?
                .error_for_status()
                .with_context(|| format!("GET {url} ({state_in} {county_in}) returned error status"))?
                .text()
                .with_context(|| format!("read body of {url}"))?;

            decode_census_rows(&body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_tract_table() {
        let body = r#"[
            ["B01003_001E", "state", "county", "tract"],
            ["4023", "06", "001", "400100"],
            ["-666666666", "06", "001", "400200"]
        ]"#;
        let rows = decode_census_rows(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].population, Some(4023.0));
        assert_eq!(rows[0].geo_id().unwrap().id(), "06001400100");
        assert_eq!(rows[1].population, None);
    }

    #[test]
    fn decode_block_group_table() {
        let body = r#"[
            ["B01003_001E", "state", "county", "tract", "block group"],
            ["812", "17", "031", "010100", "1"]
        ]"#;
        let rows = decode_census_rows(body).unwrap();
        assert_eq!(rows[0].group.as_deref(), Some("1"));
        assert_eq!(rows[0].geo_id().unwrap().id(), "170310101001");
    }

    #[test]
    fn missing_variable_is_an_error() {
        let body = r#"[["NAME", "state", "county", "tract"]]"#;
        assert!(decode_census_rows(body).is_err());
    }

    #[test]
    fn empty_table_is_empty() {
        assert!(decode_census_rows("[]").unwrap().is_empty());
    }

    #[test]
    fn table_cells_are_cleaned() {
        assert_eq!(clean_number("Total population 4,023"), Some(4023.0));
        assert_eq!(clean_number(" 1,250.5 "), Some(1250.5));
        assert_eq!(clean_number("812"), Some(812.0));
        assert_eq!(clean_number("(X)"), None);
        assert_eq!(clean_number(""), None);
    }

    #[test]
    fn population_table_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pdi_2019.csv");
        std::fs::write(&path, concat!(
            "GEOID, TotPop ,LandSQMI\n",
            "06001400100,\"Total population 1,200\",0.5\n",
            "06001400200,n/a,1\n",
            "06003400100,300,\"1,000\"\n",
            "bogus,5,1\n",
        )).unwrap();

        let table = PopulationTable::from_csv(&path).unwrap();
        assert_eq!(table.rows().len(), 3);

        let rows = table.fetch_population("06", "001", 2019, GeoType::Tract).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].geo_id().unwrap().id(), "06001400100");
        assert_eq!(rows[0].population, Some(1200.0));
        assert!((rows[0].land_area_km2.unwrap() - 0.5 * KM2_PER_SQ_MILE).abs() < 1e-9);
        assert_eq!(rows[1].population, None);

        let rows = table.fetch_population("06", "003", 2019, GeoType::Tract).unwrap();
        assert!((rows[0].land_area_km2.unwrap() - 1000.0 * KM2_PER_SQ_MILE).abs() < 1e-6);

        // Block group requests never see tract rows.
        assert!(table.fetch_population("06", "001", 2019, GeoType::Group).unwrap().is_empty());
    }

    #[test]
    fn population_table_requires_count_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pdi.csv");
        std::fs::write(&path, "GEOID,Population\n06001400100,5\n").unwrap();
        let err = PopulationTable::from_csv(&path).unwrap_err();
        assert!(format!("{err:#}").contains("TotPop"), "{err:#}");
    }
}
