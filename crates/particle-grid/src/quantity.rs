//! Derived output quantities computed from grouped counts.
//!
//! Every quantity implements [`Quantity`]: a stateless transform from a
//! counts array to a same-shaped output array, plus a name and a unit. The
//! provided [`Quantity::run`] wraps the transform result into a
//! [`DerivedRecord`] carrying everything the results writer needs, so new
//! quantities plug in without touching the engine or the writer.

use crate::grid::HorizontalGrid;
use crate::histogram::GroupedCounts;

/// A derived, named, unit-tagged output array with its grid metadata and
/// group name mapping: the unit of accumulation between the quantity
/// derivers and the results writer.
#[derive(Debug, Clone)]
pub struct DerivedRecord {
    /// Quantity name ("counts", "concentration", ...).
    pub name: String,
    /// Unit string stored on every output variable.
    pub units: String,
    /// Flattened `(n_groups, n_lat, n_lon)` data.
    pub data: Vec<f64>,
    /// Whether `data` carries a leading group axis.
    pub grouped: bool,
    /// Output dimensions in storage order.
    pub dims: Vec<(String, usize)>,
    /// Coordinate values per dimension.
    pub coords: Vec<(String, Vec<f64>)>,
    /// Ordered mapping from output variable suffix to group label:
    /// `[("counts0", "1"), ("counts1", "2")]` when grouped,
    /// `[("counts", "all")]` otherwise.
    pub name_dict: Vec<(String, String)>,
}

impl DerivedRecord {
    /// Cells per layer.
    pub fn cells(&self) -> usize {
        self.dims.iter().map(|(_, n)| n).product()
    }

    /// One 2-D layer of the data, or the whole array when ungrouped.
    pub fn layer(&self, group: usize) -> &[f64] {
        if self.grouped {
            let cells = self.cells();
            &self.data[group * cells..(group + 1) * cells]
        } else {
            &self.data
        }
    }
}

/// A quantity derivable from grouped counts.
pub trait Quantity {
    fn name(&self) -> &str;

    fn units(&self) -> &str;

    fn grid(&self) -> &HorizontalGrid;

    /// Transform counts into the output array, preserving shape.
    fn compute(&self, counts: &GroupedCounts) -> Vec<f64>;

    /// Compute and bundle the result with grid metadata and the group name
    /// mapping derived from the counts labels.
    fn run(&self, counts: &GroupedCounts) -> DerivedRecord {
        let data = self.compute(counts);
        let grid = self.grid();
        let name_dict = match counts.labels() {
            Some(labels) => labels
                .iter()
                .enumerate()
                .map(|(i, &label)| (format!("{}{}", self.name(), i), format_label(label)))
                .collect(),
            None => vec![(self.name().to_string(), "all".to_string())],
        };
        DerivedRecord {
            name: self.name().to_string(),
            units: self.units().to_string(),
            data,
            grouped: counts.is_grouped(),
            dims: grid
                .dims()
                .into_iter()
                .map(|(n, s)| (n.to_string(), s))
                .collect(),
            coords: grid
                .coords()
                .into_iter()
                .map(|(n, v)| (n.to_string(), v.to_vec()))
                .collect(),
            name_dict,
        }
    }
}

/// Integral labels render without a trailing `.0`.
fn format_label(label: f64) -> String {
    if label.fract() == 0.0 && label.is_finite() {
        format!("{}", label as i64)
    } else {
        format!("{label}")
    }
}

/// Raw particle counts per cell.
pub struct Counts<'g> {
    grid: &'g HorizontalGrid,
}

impl<'g> Counts<'g> {
    pub fn new(grid: &'g HorizontalGrid) -> Self {
        Self { grid }
    }
}

impl Quantity for Counts<'_> {
    fn name(&self) -> &str {
        "counts"
    }

    fn units(&self) -> &str {
        "particles/cell"
    }

    fn grid(&self) -> &HorizontalGrid {
        self.grid
    }

    fn compute(&self, counts: &GroupedCounts) -> Vec<f64> {
        counts.data().iter().map(|&c| f64::from(c)).collect()
    }
}

/// Area-normalized particle concentration per cell.
pub struct Concentration<'g> {
    grid: &'g HorizontalGrid,
}

impl<'g> Concentration<'g> {
    pub fn new(grid: &'g HorizontalGrid) -> Self {
        Self { grid }
    }
}

impl Quantity for Concentration<'_> {
    fn name(&self) -> &str {
        "concentration"
    }

    fn units(&self) -> &str {
        "particles/m2"
    }

    fn grid(&self) -> &HorizontalGrid {
        self.grid
    }

    /// Counts divided by cell area, broadcast over the leading group axis.
    /// Zero-area cells follow floating-point semantics (inf or NaN).
    fn compute(&self, counts: &GroupedCounts) -> Vec<f64> {
        let area = self.grid.cell_area();
        let cells = counts.cells();
        counts
            .data()
            .iter()
            .enumerate()
            .map(|(i, &c)| f64::from(c) / area[i % cells])
            .collect()
    }
}
