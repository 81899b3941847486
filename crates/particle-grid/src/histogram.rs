//! Grouped histogram engine: bins particle positions into the grid.
//!
//! Positions arrive as flattened `(lon, lat)` pairs where a NaN coordinate
//! marks a missing sample. Binning follows the usual histogram edge
//! convention: each bin is half-open `[edge[i], edge[i + 1])`, except the
//! last bin which also includes its upper edge; samples outside the closed
//! edge range are dropped.
//!
//! Grouped counts stack one 2-D layer per distinct key value, in ascending
//! key order. That order defines both the layer order and the name mapping
//! carried into the results file; the tests pin it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{GridError, GridResult};
use crate::grid::HorizontalGrid;

/// Particle stratification key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKey {
    /// Single implicit group over all particles.
    All,
    /// One group per distinct particle id.
    Id,
    /// One group per distinct absolute state code.
    State,
}

impl GroupKey {
    /// Prefix used for output variable names.
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupKey::All => "all",
            GroupKey::Id => "id",
            GroupKey::State => "state",
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupKey {
    type Err = GridError;

    fn from_str(s: &str) -> GridResult<Self> {
        match s {
            "all" => Ok(GroupKey::All),
            "id" => Ok(GroupKey::Id),
            "state" => Ok(GroupKey::State),
            other => Err(GridError::InvalidGroup(other.to_string())),
        }
    }
}

/// Flattened particle samples, one row per `(time, particle)` pair.
///
/// The three vectors are row-aligned: `ids[k]` and `states[k]` label
/// `positions[k]`. Ids are tiled per timestep by the extractor.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    /// `(lon, lat)` in degrees; NaN marks a missing sample.
    pub positions: Vec<(f64, f64)>,
    /// Particle id per row.
    pub ids: Vec<f64>,
    /// Particle state code per row; `-1` marks a missing state.
    pub states: Vec<i32>,
}

/// Dense per-cell counts, optionally stacked by group.
///
/// Data is flattened `(n_groups, n_lat, n_lon)` row-major. `labels` holds
/// the distinct key value backing each layer in ascending order, or `None`
/// for ungrouped counts (a single layer).
#[derive(Debug, Clone)]
pub struct GroupedCounts {
    data: Vec<u32>,
    n_lat: usize,
    n_lon: usize,
    labels: Option<Vec<f64>>,
}

impl GroupedCounts {
    pub fn n_lat(&self) -> usize {
        self.n_lat
    }

    pub fn n_lon(&self) -> usize {
        self.n_lon
    }

    /// Cells per layer.
    pub fn cells(&self) -> usize {
        self.n_lat * self.n_lon
    }

    pub fn n_groups(&self) -> usize {
        self.labels.as_ref().map_or(1, Vec::len)
    }

    pub fn is_grouped(&self) -> bool {
        self.labels.is_some()
    }

    /// Ascending distinct key values, one per layer; `None` when ungrouped.
    pub fn labels(&self) -> Option<&[f64]> {
        self.labels.as_deref()
    }

    /// All layers, flattened `(n_groups, n_lat, n_lon)`.
    pub fn data(&self) -> &[u32] {
        &self.data
    }

    /// One 2-D layer, row-major `(n_lat, n_lon)`.
    pub fn layer(&self, group: usize) -> &[u32] {
        let cells = self.cells();
        &self.data[group * cells..(group + 1) * cells]
    }

    /// Total count across all cells and groups.
    pub fn total(&self) -> u64 {
        self.data.iter().map(|&c| u64::from(c)).sum()
    }
}

/// Locate the bin of `v` among ascending `edges`, last edge inclusive.
fn bin_index(edges: &[f64], v: f64) -> Option<usize> {
    let n = edges.len();
    if v.is_nan() || v < edges[0] || v > edges[n - 1] {
        return None;
    }
    if v == edges[n - 1] {
        return Some(n - 2);
    }
    Some(edges.partition_point(|&e| e <= v) - 1)
}

impl HorizontalGrid {
    /// Ungrouped 2-D histogram of positions over the grid edges.
    ///
    /// Rows with a NaN coordinate are dropped; the result is stored
    /// lat-major to match [`HorizontalGrid::dims`] ordering.
    pub fn counts(&self, positions: &[(f64, f64)]) -> GroupedCounts {
        info!(samples = positions.len(), "calculating counts");
        let n_lon = self.n_lon();
        let n_lat = self.n_lat();
        let mut data = vec![0u32; n_lat * n_lon];
        for &(x, y) in positions {
            if let (Some(ix), Some(iy)) = (
                bin_index(self.lon_edges(), x),
                bin_index(self.lat_edges(), y),
            ) {
                data[iy * n_lon + ix] += 1;
            }
        }
        GroupedCounts {
            data,
            n_lat,
            n_lon,
            labels: None,
        }
    }

    /// Grouped histogram: one layer per distinct key value, ascending.
    ///
    /// The distinct set is taken over all rows before any position
    /// filtering, so a key whose every position is missing still owns an
    /// all-zero layer. NaN keys can never match a row and are excluded.
    pub fn counts_by(&self, positions: &[(f64, f64)], keys: &[f64]) -> GridResult<GroupedCounts> {
        if positions.len() != keys.len() {
            return Err(GridError::DimensionMismatch(format!(
                "{} positions but {} group keys",
                positions.len(),
                keys.len()
            )));
        }

        let mut labels: Vec<f64> = keys.iter().copied().filter(|k| !k.is_nan()).collect();
        labels.sort_by(f64::total_cmp);
        labels.dedup();
        info!(
            samples = positions.len(),
            groups = labels.len(),
            "calculating grouped counts"
        );

        let n_lon = self.n_lon();
        let n_lat = self.n_lat();
        let cells = n_lat * n_lon;
        let mut data = vec![0u32; labels.len() * cells];
        for (&(x, y), &key) in positions.iter().zip(keys) {
            if key.is_nan() {
                continue;
            }
            if let (Some(ix), Some(iy)) = (
                bin_index(self.lon_edges(), x),
                bin_index(self.lat_edges(), y),
            ) {
                // The key is always present: labels was built from `keys`.
                if let Ok(group) = labels.binary_search_by(|l| l.total_cmp(&key)) {
                    data[group * cells + iy * n_lon + ix] += 1;
                }
            }
        }
        Ok(GroupedCounts {
            data,
            n_lat,
            n_lon,
            labels: Some(labels),
        })
    }

    /// Dispatch on the stratification key.
    ///
    /// `Id` groups on the tiled id column. `State` groups on `abs(state)`:
    /// the sign is stripped for bucketing even though raw codes may carry
    /// directional meaning, matching upstream behavior.
    pub fn grouped_counts(&self, samples: &SampleSet, key: GroupKey) -> GridResult<GroupedCounts> {
        match key {
            GroupKey::All => Ok(self.counts(&samples.positions)),
            GroupKey::Id => self.counts_by(&samples.positions, &samples.ids),
            GroupKey::State => {
                let states: Vec<f64> = samples
                    .states
                    .iter()
                    .map(|&s| f64::from(s.abs()))
                    .collect();
                self.counts_by(&samples.positions, &states)
            }
        }
    }
}
