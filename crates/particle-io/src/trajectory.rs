//! Particle trajectory file reader.
//!
//! Trajectory files carry per-timestep, per-particle fields `lon`, `lat`,
//! `depth` and `state` with shape `(time, particle)`, plus a particle `id`.
//! Float fields use a large fill sentinel for inactive samples; integer
//! state codes use a large negative one. All fields are sanitized on first
//! access and cached, so repeated access never re-reads or re-sanitizes.
//!
//! The file handle is opened per read and dropped at the end of each read,
//! so no descriptor is held between accesses.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::debug;

use particle_grid::SampleSet;

use crate::error::{IoResult, ParticleIoError};

/// Float values at or above this sentinel mark an inactive sample.
pub const FILL_VALUE_FLOAT: f64 = 9e36;

/// State codes below this sentinel mark a missing state.
pub const FILL_VALUE_STATE: i32 = -9999;

/// Sanitized state code substituted for fill values.
pub const MISSING_STATE: i32 = -1;

/// Lazily cached, sanitized view of a particle trajectory file.
pub struct ParticleFile {
    path: PathBuf,
    n_time: usize,
    /// Particle count in the file, before id filtering.
    raw_particles: usize,
    /// Column indices retained by id filtering; `None` keeps every column.
    keep: Option<Vec<usize>>,
    id: OnceCell<Vec<f64>>,
    lon: OnceCell<Vec<f64>>,
    lat: OnceCell<Vec<f64>>,
    depth: OnceCell<Vec<f64>>,
    state: OnceCell<Vec<i32>>,
}

impl ParticleFile {
    /// Open a trajectory file, reading its shape and particle ids.
    ///
    /// When `id_list` is given, the particle axis is restricted to columns
    /// whose id matches one of the listed values; the mask is fixed here and
    /// applied to every field before it is cached.
    pub fn open(path: impl Into<PathBuf>, id_list: Option<&[f64]>) -> IoResult<Self> {
        let path = path.into();
        let (n_time, raw_particles, raw_id) = {
            let file = netcdf::open(&path)?;
            let lon = file.variable("lon").ok_or_else(|| {
                ParticleIoError::MissingData(format!("variable lon in {}", path.display()))
            })?;
            let dims = lon.dimensions();
            if dims.len() != 2 {
                return Err(ParticleIoError::DimensionMismatch(format!(
                    "variable lon in {} has {} dimensions, expected (time, particle)",
                    path.display(),
                    dims.len()
                )));
            }
            let n_time = dims[0].len();
            let raw_particles = dims[1].len();
            let id_var = file.variable("id").ok_or_else(|| {
                ParticleIoError::MissingData(format!("variable id in {}", path.display()))
            })?;
            let raw_id: Vec<f64> = id_var.get_values(..)?;
            (n_time, raw_particles, raw_id)
        };

        // Id is constant per particle; accept either a per-particle vector
        // or a full (time, particle) array and use its first timestep row.
        let mut id = if raw_id.len() == raw_particles {
            raw_id
        } else if raw_id.len() == n_time * raw_particles {
            raw_id[..raw_particles].to_vec()
        } else {
            return Err(ParticleIoError::DimensionMismatch(format!(
                "variable id in {} has {} values for {} particles",
                path.display(),
                raw_id.len(),
                raw_particles
            )));
        };
        sanitize_floats(&mut id);

        let keep = id_list.map(|wanted| {
            (0..raw_particles)
                .filter(|&j| wanted.iter().any(|&w| id[j] == w))
                .collect::<Vec<usize>>()
        });
        if let Some(keep) = &keep {
            debug!(
                kept = keep.len(),
                total = raw_particles,
                "filtering particles by id"
            );
            id = keep.iter().map(|&j| id[j]).collect();
        }

        Ok(Self {
            path,
            n_time,
            raw_particles,
            keep,
            id: OnceCell::with_value(id),
            lon: OnceCell::new(),
            lat: OnceCell::new(),
            depth: OnceCell::new(),
            state: OnceCell::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn n_time(&self) -> usize {
        self.n_time
    }

    /// Particle count after id filtering.
    pub fn n_particles(&self) -> usize {
        self.keep
            .as_ref()
            .map_or(self.raw_particles, Vec::len)
    }

    /// `(n_time, n_particles)` of every per-sample field.
    pub fn shape(&self) -> (usize, usize) {
        (self.n_time, self.n_particles())
    }

    /// Particle id per retained column.
    pub fn id(&self) -> &[f64] {
        // Filled in `open`.
        self.id.get().map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of distinct particle ids.
    pub fn n_ids(&self) -> usize {
        let mut ids: Vec<f64> = self.id().iter().copied().filter(|v| !v.is_nan()).collect();
        ids.sort_by(f64::total_cmp);
        ids.dedup();
        ids.len()
    }

    /// Longitude per sample, degrees, NaN where inactive.
    pub fn lon(&self) -> IoResult<&[f64]> {
        self.lon
            .get_or_try_init(|| self.read_float_field("lon"))
            .map(Vec::as_slice)
    }

    /// Latitude per sample, degrees, NaN where inactive.
    pub fn lat(&self) -> IoResult<&[f64]> {
        self.lat
            .get_or_try_init(|| self.read_float_field("lat"))
            .map(Vec::as_slice)
    }

    /// Depth per sample, meters, NaN where inactive.
    pub fn depth(&self) -> IoResult<&[f64]> {
        self.depth
            .get_or_try_init(|| self.read_float_field("depth"))
            .map(Vec::as_slice)
    }

    /// State code per sample, `-1` where missing.
    pub fn state(&self) -> IoResult<&[i32]> {
        self.state
            .get_or_try_init(|| {
                let mut values: Vec<i32> = self.read_raw("state")?;
                for v in &mut values {
                    if *v < FILL_VALUE_STATE {
                        *v = MISSING_STATE;
                    }
                }
                Ok(self.select_columns(values))
            })
            .map(Vec::as_slice)
    }

    /// Flattened `(lon, lat)` pairs, one row per `(time, particle)` sample,
    /// NaN-preserving.
    pub fn positions(&self) -> IoResult<Vec<(f64, f64)>> {
        let lon = self.lon()?;
        let lat = self.lat()?;
        Ok(lon.iter().zip(lat).map(|(&x, &y)| (x, y)).collect())
    }

    /// Row-aligned positions, ids and states for the histogram engine.
    ///
    /// Normally every `(time, particle)` sample contributes a row, with ids
    /// tiled per timestep. With `last_only` each particle contributes a
    /// single row at its last timestep with both coordinates finite;
    /// particles that were never active keep one NaN row so stratified runs
    /// still allocate their zero layer.
    pub fn samples(&self, last_only: bool) -> IoResult<SampleSet> {
        let lon = self.lon()?;
        let lat = self.lat()?;
        let state = self.state()?;
        let id = self.id();
        let (n_time, n_particles) = self.shape();

        if last_only {
            let mut set = SampleSet::default();
            for j in 0..n_particles {
                let mut row = (f64::NAN, f64::NAN);
                let mut row_state = MISSING_STATE;
                for t in (0..n_time).rev() {
                    let k = t * n_particles + j;
                    if !lon[k].is_nan() && !lat[k].is_nan() {
                        row = (lon[k], lat[k]);
                        row_state = state[k];
                        break;
                    }
                }
                set.positions.push(row);
                set.ids.push(id[j]);
                set.states.push(row_state);
            }
            return Ok(set);
        }

        let mut ids = Vec::with_capacity(n_time * n_particles);
        for _ in 0..n_time {
            ids.extend_from_slice(id);
        }
        Ok(SampleSet {
            positions: lon.iter().zip(lat).map(|(&x, &y)| (x, y)).collect(),
            ids,
            states: state.to_vec(),
        })
    }

    /// Check that a variable matches the trajectory shape.
    fn check_shape(&self, name: &str, var: &netcdf::Variable) -> IoResult<()> {
        let dims = var.dimensions();
        if dims.len() != 2 || dims[0].len() != self.n_time || dims[1].len() != self.raw_particles {
            return Err(ParticleIoError::DimensionMismatch(format!(
                "variable {name} in {} does not match trajectory shape ({}, {})",
                self.path.display(),
                self.n_time,
                self.raw_particles
            )));
        }
        Ok(())
    }

    /// Read a `(time, particle)` integer variable without sanitization.
    fn read_raw(&self, name: &str) -> IoResult<Vec<i32>> {
        debug!(variable = name, file = %self.path.display(), "reading trajectory field");
        let file = netcdf::open(&self.path)?;
        let var = file.variable(name).ok_or_else(|| {
            ParticleIoError::MissingData(format!("variable {name} in {}", self.path.display()))
        })?;
        self.check_shape(name, &var)?;
        Ok(var.get_values(..)?)
    }

    fn read_float_field(&self, name: &str) -> IoResult<Vec<f64>> {
        debug!(variable = name, file = %self.path.display(), "reading trajectory field");
        let file = netcdf::open(&self.path)?;
        let var = file.variable(name).ok_or_else(|| {
            ParticleIoError::MissingData(format!("variable {name} in {}", self.path.display()))
        })?;
        self.check_shape(name, &var)?;
        let mut values: Vec<f64> = var.get_values(..)?;
        sanitize_floats(&mut values);
        Ok(self.select_columns(values))
    }

    /// Apply the id-filter column mask to a full `(time, particle)` array.
    fn select_columns<T: Copy>(&self, values: Vec<T>) -> Vec<T> {
        let Some(keep) = &self.keep else {
            return values;
        };
        let mut out = Vec::with_capacity(self.n_time * keep.len());
        for t in 0..self.n_time {
            let row = &values[t * self.raw_particles..(t + 1) * self.raw_particles];
            out.extend(keep.iter().map(|&j| row[j]));
        }
        out
    }
}

fn sanitize_floats(values: &mut [f64]) {
    for v in values {
        if *v >= FILL_VALUE_FLOAT {
            *v = f64::NAN;
        }
    }
}
