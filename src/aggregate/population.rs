use std::collections::HashMap;

use anyhow::Result;
use tracing::warn;

use crate::{feature::PopulationRow, unit::{GeoId, UnitStore}};

/// Population rows aligned to the batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PopulationMerge {
    pub(crate) counts: Vec<Option<f64>>,    // One per unit, in batch order
    pub(crate) land_areas: Vec<Option<f64>>, // km², where the source reported one
    pub(crate) unmatched_rows: usize,       // Rows for units outside the batch
}

/// Align population rows to units by GEOID. Units with no row (or no estimate) stay `None`.
/// Rows that repeat a GEOID overwrite earlier ones.
pub(crate) fn merge_population(store: &UnitStore, rows: &[PopulationRow]) -> Result<PopulationMerge> {
    let by_id = rows.iter()
        .map(|row| Ok((row.geo_id()?, row)))
        .collect::<Result<HashMap<GeoId, &PopulationRow>>>()?;

    let (counts, land_areas) = store.units().iter()
        .map(|unit| match by_id.get(&unit.geo_id) {
            Some(row) => (row.population, row.land_area_km2.filter(|a| a.is_finite() && *a > 0.0)),
            None => (None, None),
        })
        .unzip::<_, _, Vec<_>, Vec<_>>();

    let unmatched_rows = by_id.keys().filter(|id| store.position(id).is_none()).count();
    if unmatched_rows > 0 {
        warn!("[aggregate::population] {unmatched_rows} population rows matched no unit in the batch");
    }

    Ok(PopulationMerge { counts, land_areas, unmatched_rows })
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};

    use super::*;
    use crate::unit::Unit;

    fn unit(id: &str) -> Unit {
        let shape = MultiPolygon(vec![polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]]);
        Unit::new(GeoId::new(id).unwrap(), shape.clone(), shape, None)
    }

    fn row(tract: &str, population: Option<f64>) -> PopulationRow {
        PopulationRow { state: "06".into(), county: "001".into(), tract: tract.into(), group: None, population, land_area_km2: None }
    }

    #[test]
    fn merge_is_by_geo_id_not_position() {
        let store = UnitStore::new(vec![unit("06001400100"), unit("06001400200"), unit("06001400300")]).unwrap();
        // Rows arrive in a different order, one unit is missing, one row is foreign.
        let rows = vec![
            row("400300", Some(30.0)),
            row("400100", Some(10.0)),
            row("999999", Some(99.0)),
        ];
        let merge = merge_population(&store, &rows).unwrap();
        assert_eq!(merge.counts, vec![Some(10.0), None, Some(30.0)]);
        assert_eq!(merge.unmatched_rows, 1);
    }

    #[test]
    fn missing_estimate_is_none() {
        let store = UnitStore::new(vec![unit("06001400100")]).unwrap();
        let merge = merge_population(&store, &[row("400100", None)]).unwrap();
        assert_eq!(merge.counts, vec![None]);
    }

    #[test]
    fn land_area_follows_its_row() {
        let store = UnitStore::new(vec![unit("06001400100"), unit("06001400200")]).unwrap();
        let mut with_area = row("400200", Some(20.0));
        with_area.land_area_km2 = Some(2.5);
        let merge = merge_population(&store, &[row("400100", Some(10.0)), with_area]).unwrap();
        assert_eq!(merge.land_areas, vec![None, Some(2.5)]);
    }
}
