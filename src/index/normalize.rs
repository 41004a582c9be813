use super::kind::IndexKind;

/// Measure per unit area, 0 for degenerate areas or non-finite results.
#[inline]
pub fn density(measure: f64, area: f64) -> f64 {
    if area > 0.0 {
        let d = measure / area;
        if d.is_finite() { d } else { 0.0 }
    } else {
        0.0
    }
}

/// Bounded indices for one batch and year.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub densities: Vec<Option<f64>>,
    pub indices: Vec<Option<f64>>,
    pub max_density: f64,   // Divisor actually used (1 when the batch maximum is not positive)
}

/// Scale a batch of raw measures into bounded indices.
///
/// Density is measure / area (or the measure itself for LDI). Each index is
/// density / max density, times 100 for PDI. When the maximum is not positive
/// the divisor is 1 and every index is 0. Units with no measure get no index.
pub fn normalize(kind: IndexKind, measures: &[Option<f64>], areas: &[f64]) -> Normalized {
    debug_assert_eq!(measures.len(), areas.len());

    let densities = measures.iter().zip(areas)
        .map(|(measure, &area)| measure.map(|m| {
            if kind.uses_area() { density(m, area) }
            else if m.is_finite() { m.max(0.0) }
            else { 0.0 }
        }))
        .collect::<Vec<_>>();

    let max = densities.iter().flatten().copied().fold(0.0, f64::max);
    let max_density = if max > 0.0 { max } else { 1.0 };

    let indices = densities.iter()
        .map(|d| d.map(|d| d / max_density * kind.scale()))
        .collect();

    Normalized { densities, indices, max_density }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> { values.iter().copied().map(Some).collect() }

    #[test]
    fn density_of_degenerate_area_is_zero() {
        assert_eq!(density(5.0, 0.0), 0.0);
        assert_eq!(density(5.0, -1.0), 0.0);
        assert_eq!(density(5.0, 2.0), 2.5);
    }

    #[test]
    fn max_density_maps_to_one() {
        let n = normalize(IndexKind::Commercial, &some(&[2.0, 8.0, 0.0]), &[1.0, 2.0, 4.0]);
        assert_eq!(n.densities, some(&[2.0, 4.0, 0.0]));
        assert_eq!(n.indices, some(&[0.5, 1.0, 0.0]));
        assert_eq!(n.max_density, 4.0);
    }

    #[test]
    fn population_scales_to_hundred() {
        let n = normalize(IndexKind::Population, &some(&[100.0, 50.0]), &[1.0, 1.0]);
        assert_eq!(n.indices, some(&[100.0, 50.0]));
    }

    #[test]
    fn land_use_uses_entropy_directly() {
        let n = normalize(IndexKind::LandUse, &some(&[0.4, 0.8]), &[1e6, 1.0]);
        assert_eq!(n.densities, some(&[0.4, 0.8]));
        assert_eq!(n.indices, some(&[0.5, 1.0]));
    }

    #[test]
    fn all_zero_batch_gives_zero_indices() {
        let n = normalize(IndexKind::Intersection, &some(&[0.0, 0.0, 0.0]), &[1.0, 0.0, 3.0]);
        assert_eq!(n.max_density, 1.0);
        assert!(n.indices.iter().all(|i| *i == Some(0.0)));
    }

    #[test]
    fn empty_batch() {
        let n = normalize(IndexKind::Commercial, &[], &[]);
        assert!(n.indices.is_empty());
        assert_eq!(n.max_density, 1.0);
    }

    #[test]
    fn missing_measures_are_skipped() {
        let n = normalize(IndexKind::Population, &[Some(10.0), None, Some(5.0)], &[1.0, 1.0, 1.0]);
        assert_eq!(n.indices, vec![Some(100.0), None, Some(50.0)]);
    }

    #[test]
    fn indices_stay_in_bounds() {
        let measures = some(&[3.0, 17.0, 0.0, 9.5, 1e-9, 1e9]);
        let areas = [2.0, 0.5, 1.0, 0.0, 1e-6, 1e3];
        for kind in IndexKind::ALL {
            let n = normalize(kind, &measures, &areas);
            for index in n.indices.iter().flatten() {
                assert!((0.0..=kind.scale()).contains(index), "{kind}: {index}");
            }
            assert!(n.indices.iter().flatten().any(|i| *i == kind.scale()));
        }
    }
}
