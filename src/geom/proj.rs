use anyhow::{anyhow, Context, Result};
use geo::{Coord, MapCoords, Point};
use proj4rs::{proj::Proj as Proj4, transform::transform};

/// Source CRS: lon/lat degrees (GeoJSON / TIGER input, Overpass output).
const LONLAT_PROJ4: &str = "+proj=longlat +ellps=WGS84 +no_defs +type=crs";

/// Target CRS: spherical Web Mercator (EPSG:3857), meters.
const WEB_MERCATOR_PROJ4: &str = "+proj=merc +a=6378137 +b=6378137 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs +type=crs";

/// Forward transform from lon/lat to the planar CRS used for areas and containment.
pub(crate) struct Projector {
    from: Proj4,
    to: Proj4,
}

impl Projector {
    /// Lon/lat (degrees) to Web Mercator (meters).
    pub(crate) fn web_mercator() -> Result<Self> {
        let from = Proj4::from_proj_string(LONLAT_PROJ4)
            .with_context(|| anyhow!("failed to build source PROJ.4: {LONLAT_PROJ4}"))?;
        let to = Proj4::from_proj_string(WEB_MERCATOR_PROJ4)
            .with_context(|| anyhow!("failed to build target PROJ.4: {WEB_MERCATOR_PROJ4}"))?;
        Ok(Self { from, to })
    }

    /// Project a single lon/lat coordinate.
    pub(crate) fn coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        // Degrees → radians in, meters out.
        let mut point = (coord.x.to_radians(), coord.y.to_radians(), 0.0);
        transform(&self.from, &self.to, &mut point)
            .map_err(|e| anyhow!("CRS transform failed at ({}, {}): {e:?}", coord.x, coord.y))?;
        Ok(Coord { x: point.0, y: point.1 })
    }

    /// Project a single lon/lat point.
    #[inline]
    pub(crate) fn point(&self, point: Point<f64>) -> Result<Point<f64>> {
        self.coord(point.0).map(Point)
    }

    /// Project every coordinate of a lon/lat geometry.
    pub(crate) fn geometry<G: MapCoords<f64, f64>>(&self, geometry: &G) -> Result<G::Output> {
        geometry.try_map_coords(|coord| self.coord(coord))
    }
}

#[cfg(test)]
mod tests {
    use geo::{polygon, Area, Coord, MultiPolygon};

    use super::Projector;

    #[test]
    fn origin_maps_to_origin() {
        let proj = Projector::web_mercator().unwrap();
        let c = proj.coord(Coord { x: 0.0, y: 0.0 }).unwrap();
        assert!(c.x.abs() < 1e-6 && c.y.abs() < 1e-6);
    }

    #[test]
    fn one_degree_at_equator_is_about_111km() {
        let proj = Projector::web_mercator().unwrap();
        let c = proj.coord(Coord { x: 1.0, y: 0.0 }).unwrap();
        assert!((c.x - 111_319.49).abs() < 1_113.0, "got {}", c.x);
    }

    #[test]
    fn projected_area_is_positive() {
        let proj = Projector::web_mercator().unwrap();
        let shape = MultiPolygon(vec![polygon![
            (x: -87.70, y: 41.80),
            (x: -87.69, y: 41.80),
            (x: -87.69, y: 41.81),
            (x: -87.70, y: 41.81),
        ]]);
        let planar = proj.geometry(&shape).unwrap();
        assert!(planar.unsigned_area() > 1_000_000.0);
    }
}
