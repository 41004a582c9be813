use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::unit::GeoId;
use super::kind::IndexKind;

/// Value substituted for a sub-index that is null for a unit.
pub const MISSING_FALLBACK: f64 = 0.5;

/// PEI = (1+PDI)(1+IDI)(1+LDI)(1+CDI) / 16.
#[inline]
pub fn pei(pdi: f64, cdi: f64, idi: f64, ldi: f64) -> f64 {
    (1.0 + pdi) * (1.0 + idi) * (1.0 + ldi) * (1.0 + cdi) / 16.0
}

/// One sub-index column read back for a year: unit id and (possibly null) index value.
#[derive(Debug, Clone, PartialEq)]
pub struct SubIndexTable {
    pub kind: IndexKind,
    pub rows: Vec<(GeoId, Option<f64>)>,
}

/// The four sub-indices of one unit, before the missing-value fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeRecord {
    pub geo_id: GeoId,
    pub pdi: Option<f64>,
    pub cdi: Option<f64>,
    pub idi: Option<f64>,
    pub ldi: Option<f64>,
}

impl CompositeRecord {
    /// Composite score with nulls replaced by [`MISSING_FALLBACK`].
    /// PDI enters the formula on its stored 0–100 scale.
    pub fn pei(&self) -> f64 {
        let or_fallback = |v: Option<f64>| v.unwrap_or(MISSING_FALLBACK);
        pei(or_fallback(self.pdi), or_fallback(self.cdi), or_fallback(self.idi), or_fallback(self.ldi))
    }
}

/// Inner-join the four sub-index tables on GEOID, in the row order of the PDI table.
///
/// Every sub-index must be present; a missing table is fatal. Only per-row nulls are
/// recovered (by the fallback in [`CompositeRecord::pei`]).
pub fn combine(tables: &[SubIndexTable]) -> Result<Vec<CompositeRecord>> {
    let mut by_kind: HashMap<IndexKind, HashMap<&GeoId, Option<f64>>> = HashMap::new();
    for table in tables {
        let mut values = HashMap::with_capacity(table.rows.len());
        for (geo_id, value) in &table.rows {
            if values.insert(geo_id, *value).is_some() {
                bail!("[index::composite] Duplicate GEOID {geo_id} in {} table", table.kind);
            }
        }
        if by_kind.insert(table.kind, values).is_some() {
            bail!("[index::composite] {} table given more than once", table.kind);
        }
    }

    for kind in IndexKind::ALL {
        if !by_kind.contains_key(&kind) {
            bail!("[index::composite] Missing required column '{kind}' for PEI calculation");
        }
    }

    let Some(driver) = tables.iter().find(|t| t.kind == IndexKind::Population) else {
        bail!("[index::composite] Missing required column 'PDI' for PEI calculation");
    };

    let lookup = |kind: IndexKind, geo_id: &GeoId| by_kind[&kind].get(geo_id).copied();

    Ok(driver.rows.iter()
        .filter_map(|(geo_id, pdi)| Some(CompositeRecord {
            geo_id: geo_id.clone(),
            pdi: *pdi,
            cdi: lookup(IndexKind::Commercial, geo_id)?,
            idi: lookup(IndexKind::Intersection, geo_id)?,
            ldi: lookup(IndexKind::LandUse, geo_id)?,
        }))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    fn id(s: &str) -> GeoId { GeoId::new(s).unwrap() }

    fn table(kind: IndexKind, rows: &[(&str, Option<f64>)]) -> SubIndexTable {
        SubIndexTable { kind, rows: rows.iter().map(|(g, v)| (id(g), *v)).collect() }
    }

    fn record(values: [Option<f64>; 4]) -> CompositeRecord {
        CompositeRecord { geo_id: id("1"), pdi: values[0], cdi: values[1], idi: values[2], ldi: values[3] }
    }

    #[test]
    fn pei_all_missing_uses_fallback() {
        assert_close(record([None; 4]).pei(), 5.0625 / 16.0);
        assert!((record([None; 4]).pei() - 0.3164).abs() < 1e-4);
    }

    #[test]
    fn pei_all_ones_is_one() {
        assert_close(record([Some(1.0); 4]).pei(), 1.0);
    }

    #[test]
    fn pei_all_zeros_is_one_sixteenth() {
        assert_close(record([Some(0.0); 4]).pei(), 0.0625);
    }

    #[test]
    fn pei_range_for_unit_scores() {
        for v in [0.0, 0.25, 0.5, 1.0] {
            let p = pei(v, v, v, v);
            assert!((1.0 / 16.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn combine_inner_joins_on_geo_id() {
        let tables = vec![
            table(IndexKind::Population, &[("a", Some(1.0)), ("b", None), ("c", Some(0.0))]),
            table(IndexKind::Commercial, &[("c", Some(0.0)), ("a", Some(1.0)), ("b", Some(0.5))]),
            table(IndexKind::Intersection, &[("b", Some(0.5)), ("a", Some(1.0)), ("c", Some(0.0))]),
            table(IndexKind::LandUse, &[("a", Some(1.0)), ("c", Some(0.0))]),
        ];
        let records = combine(&tables).unwrap();

        // "b" has no LDI row and is dropped by the inner join.
        assert_eq!(records.iter().map(|r| r.geo_id.id()).collect::<Vec<_>>(), vec!["a", "c"]);
        assert_close(records[0].pei(), 1.0);
        assert_close(records[1].pei(), 0.0625);
    }

    #[test]
    fn combine_fills_row_nulls() {
        let tables = IndexKind::ALL.map(|kind| table(kind, &[("a", None)]));
        let records = combine(&tables).unwrap();
        assert_eq!(records.len(), 1);
        assert_close(records[0].pei(), 5.0625 / 16.0);
    }

    #[test]
    fn combine_missing_table_is_fatal() {
        let tables = vec![
            table(IndexKind::Population, &[("a", Some(1.0))]),
            table(IndexKind::Commercial, &[("a", Some(1.0))]),
            table(IndexKind::LandUse, &[("a", Some(1.0))]),
        ];
        let err = combine(&tables).unwrap_err();
        assert!(err.to_string().contains("'IDI'"), "{err}");
    }

    #[test]
    fn combine_rejects_duplicate_geo_ids() {
        let mut tables = IndexKind::ALL.map(|kind| table(kind, &[("a", Some(1.0))])).to_vec();
        tables[1].rows.push((id("a"), Some(0.0)));
        assert!(combine(&tables).is_err());
    }
}
