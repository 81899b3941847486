//! Horizontal bin grids derived from topography coordinates.
//!
//! A [`HorizontalGrid`] owns the longitude/latitude bin edges (degrees) and
//! the derived per-cell mesh in meters. Edges either come straight from the
//! topography file or are regenerated as a uniform sequence at a target
//! physical resolution. The longitudinal meter-to-degree conversion shrinks
//! with `cos(latitude)`, so resampled grids correct the longitude step by the
//! cosine of the mean latitude.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GridError, GridResult};

/// Meters per degree of latitude (one nautical mile per arc minute).
pub const DEG_TO_M: f64 = 1852.0 * 60.0;

/// Degrees of latitude per meter.
pub const M_TO_DEG: f64 = 1.0 / DEG_TO_M;

/// Kind of spatial grid a result is defined on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridKind {
    /// Horizontal lon/lat map.
    Map,
    /// Vertical lon/depth profile. Not yet buildable; results files of this
    /// kind can still be read back.
    Profile,
}

impl GridKind {
    /// Stable string form used in results-file attributes.
    pub fn as_str(&self) -> &'static str {
        match self {
            GridKind::Map => "map",
            GridKind::Profile => "profile",
        }
    }

    /// Parse the string form stored in a results-file attribute.
    pub fn parse(s: &str) -> GridResult<Self> {
        match s {
            "map" => Ok(GridKind::Map),
            "profile" => Ok(GridKind::Profile),
            other => Err(GridError::Configuration(format!(
                "unknown grid type attribute: {other}"
            ))),
        }
    }
}

/// A 2-D horizontal bin grid with a per-cell mesh in meters.
///
/// Cell arrays are row-major with shape `(n_lat, n_lon)`; binning reduces
/// each edge vector by one, so a grid with `n + 1` longitude edges has `n`
/// longitude cells.
#[derive(Debug, Clone)]
pub struct HorizontalGrid {
    lon: Vec<f64>,
    lat: Vec<f64>,
    resolution: Option<f64>,
    dx: Vec<f64>,
    dy: Vec<f64>,
    cell_area: Vec<f64>,
}

impl HorizontalGrid {
    /// Build a grid from native edge vectors, optionally resampled to a
    /// uniform resolution in meters.
    pub fn new(lon: Vec<f64>, lat: Vec<f64>, resolution: Option<f64>) -> GridResult<Self> {
        if lon.len() < 2 || lat.len() < 2 {
            return Err(GridError::Configuration(format!(
                "grid needs at least two edges per axis, got {} lon / {} lat",
                lon.len(),
                lat.len()
            )));
        }
        let mut grid = Self {
            lon,
            lat,
            resolution: None,
            dx: Vec::new(),
            dy: Vec::new(),
            cell_area: Vec::new(),
        };
        match resolution {
            Some(meters) => grid.set_resolution(meters)?,
            None => grid.create_mesh(),
        }
        Ok(grid)
    }

    pub fn kind(&self) -> GridKind {
        GridKind::Map
    }

    /// Longitude bin edges in degrees.
    pub fn lon_edges(&self) -> &[f64] {
        &self.lon
    }

    /// Latitude bin edges in degrees.
    pub fn lat_edges(&self) -> &[f64] {
        &self.lat
    }

    /// Target resolution in meters, if the grid was resampled.
    pub fn resolution(&self) -> Option<f64> {
        self.resolution
    }

    /// Number of longitude cells.
    pub fn n_lon(&self) -> usize {
        self.lon.len() - 1
    }

    /// Number of latitude cells.
    pub fn n_lat(&self) -> usize {
        self.lat.len() - 1
    }

    /// Per-cell area in square meters, row-major `(n_lat, n_lon)`.
    pub fn cell_area(&self) -> &[f64] {
        &self.cell_area
    }

    /// Per-cell physical width in meters, row-major `(n_lat, n_lon)`.
    pub fn cell_dx(&self) -> &[f64] {
        &self.dx
    }

    /// Per-cell physical height in meters, row-major `(n_lat, n_lon)`.
    pub fn cell_dy(&self) -> &[f64] {
        &self.dy
    }

    /// Output dimensions, in storage order.
    pub fn dims(&self) -> Vec<(&'static str, usize)> {
        vec![("lat", self.n_lat()), ("lon", self.n_lon())]
    }

    /// Coordinate values per dimension: the edge vectors minus their last
    /// element, so `coords[d].len() == dims[d]`.
    pub fn coords(&self) -> Vec<(&'static str, &[f64])> {
        vec![
            ("lat", &self.lat[..self.n_lat()]),
            ("lon", &self.lon[..self.n_lon()]),
        ]
    }

    /// Replace both edge vectors with uniform sequences of the given bin
    /// width in meters, then rebuild the mesh.
    ///
    /// The longitude step is corrected by `cos(mean latitude)` of the
    /// *native* latitude vector; both sequences run from the native minimum
    /// to one step past the native maximum so the final partial bin covers
    /// the true extent.
    pub fn set_resolution(&mut self, meters: f64) -> GridResult<()> {
        if !(meters > 0.0) {
            return Err(GridError::Configuration(format!(
                "resolution must be positive, got {meters}"
            )));
        }
        let dlon_bin = meters * M_TO_DEG / nanmean(&self.lat).to_radians().cos();
        self.lon = arange(nanmin(&self.lon), nanmax(&self.lon) + dlon_bin, dlon_bin);
        let dlat_bin = meters * M_TO_DEG;
        self.lat = arange(nanmin(&self.lat), nanmax(&self.lat) + dlat_bin, dlat_bin);
        self.resolution = Some(meters);
        debug!(
            n_lon = self.n_lon(),
            n_lat = self.n_lat(),
            resolution_m = meters,
            "resampled grid edges"
        );
        self.create_mesh();
        Ok(())
    }

    /// Recompute `dx`, `dy` and `cell_area` from the current edges.
    pub fn create_mesh(&mut self) {
        let n_lon = self.n_lon();
        let n_lat = self.n_lat();
        let cos_lat = nanmean(&self.lat).to_radians().cos();

        self.dx = Vec::with_capacity(n_lat * n_lon);
        self.dy = Vec::with_capacity(n_lat * n_lon);
        self.cell_area = Vec::with_capacity(n_lat * n_lon);
        for j in 0..n_lat {
            let dlat = self.lat[j + 1] - self.lat[j];
            for i in 0..n_lon {
                let dlon = self.lon[i + 1] - self.lon[i];
                let dx = dlon * DEG_TO_M * cos_lat;
                let dy = dlat * DEG_TO_M;
                self.dx.push(dx);
                self.dy.push(dy);
                self.cell_area.push(dx * dy);
            }
        }
    }
}

/// Uniform sequence from `start` (inclusive) to `stop` (exclusive) stepped
/// by `step`; the length is `ceil((stop - start) / step)`.
pub(crate) fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let n = ((stop - start) / step).ceil().max(0.0) as usize;
    (0..n).map(|i| start + i as f64 * step).collect()
}

fn nanmean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for &v in values {
        if !v.is_nan() {
            sum += v;
            n += 1;
        }
    }
    sum / n as f64
}

fn nanmin(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::INFINITY, f64::min)
}

fn nanmax(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(f64::NEG_INFINITY, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn edges(start: f64, stop: f64, n_cells: usize) -> Vec<f64> {
        let step = (stop - start) / n_cells as f64;
        (0..=n_cells).map(|i| start + i as f64 * step).collect()
    }

    #[test]
    fn test_arange_includes_final_partial_bin() {
        // 0..10 in steps of 3: numpy arange(0, 10+3, 3) -> [0, 3, 6, 9, 12]
        let v = arange(0.0, 13.0, 3.0);
        assert_eq!(v, vec![0.0, 3.0, 6.0, 9.0, 12.0]);
        assert!(*v.last().unwrap() >= 10.0, "true max must be covered");
    }

    #[test]
    fn test_arange_exact_multiple() {
        let v = arange(0.0, 1.0, 0.25);
        assert_eq!(v.len(), 4);
        assert_relative_eq!(v[3], 0.75);
    }

    #[test]
    fn test_mesh_area_matches_bounding_box() {
        let grid = HorizontalGrid::new(edges(20.0, 25.0, 10), edges(58.0, 60.0, 8), None).unwrap();
        let total: f64 = grid.cell_area().iter().sum();
        let cos_lat = (59.0f64).to_radians().cos();
        let expected = 5.0 * DEG_TO_M * cos_lat * 2.0 * DEG_TO_M;
        assert_relative_eq!(total, expected, max_relative = 1e-9);
        for i in 0..grid.cell_area().len() {
            assert_relative_eq!(grid.cell_area()[i], grid.cell_dx()[i] * grid.cell_dy()[i]);
        }
    }

    #[test]
    fn test_mesh_area_after_resolution_change() {
        let mut grid =
            HorizontalGrid::new(edges(20.0, 25.0, 10), edges(58.0, 60.0, 8), None).unwrap();
        grid.set_resolution(5000.0).unwrap();
        // Every cell is now 5 km tall exactly; the width picks up the small
        // shift of the mean latitude after resampling.
        for &dy in grid.cell_dy() {
            assert_relative_eq!(dy, 5000.0, max_relative = 1e-9);
        }
        for &a in grid.cell_area() {
            assert_relative_eq!(a, 5000.0 * 5000.0, max_relative = 1e-2);
        }
        // The resampled extent covers at least the native extent.
        assert!(*grid.lon_edges().last().unwrap() >= 25.0);
        assert!(*grid.lat_edges().last().unwrap() >= 60.0);
    }

    #[test]
    fn test_longitude_step_corrected_by_latitude() {
        let mut grid =
            HorizontalGrid::new(edges(20.0, 25.0, 10), edges(58.0, 60.0, 8), None).unwrap();
        grid.set_resolution(1000.0).unwrap();
        let dlon = grid.lon_edges()[1] - grid.lon_edges()[0];
        let dlat = grid.lat_edges()[1] - grid.lat_edges()[0];
        // At 59N a degree of longitude is shorter than a degree of latitude,
        // so the degree step must be wider.
        assert!(dlon > dlat);
        assert_relative_eq!(
            dlon,
            1000.0 * M_TO_DEG / (59.0f64).to_radians().cos(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_coords_match_dims() {
        let grid = HorizontalGrid::new(edges(0.0, 2.0, 2), edges(0.0, 2.0, 2), None).unwrap();
        let dims = grid.dims();
        let coords = grid.coords();
        for ((dname, dsize), (cname, cvals)) in dims.iter().zip(coords.iter()) {
            assert_eq!(dname, cname);
            assert_eq!(*dsize, cvals.len());
        }
        assert_eq!(grid.coords()[1].1, &[0.0, 1.0]);
    }

    #[test]
    fn test_too_few_edges_rejected() {
        let err = HorizontalGrid::new(vec![0.0], vec![0.0, 1.0], None).unwrap_err();
        assert!(matches!(err, GridError::Configuration(_)));
    }

    #[test]
    fn test_grid_kind_roundtrip() {
        assert_eq!(GridKind::parse("map").unwrap(), GridKind::Map);
        assert_eq!(GridKind::parse("profile").unwrap(), GridKind::Profile);
        assert!(GridKind::parse("volume").is_err());
    }
}
