//! Results file accumulator and writer.
//!
//! Derived-quantity records are accumulated in memory per group key and
//! flushed to the netCDF file in a single batched write at the end of a
//! run. Writes are at-most-once: the pending buffer is cleared only after a
//! fully successful flush, so a retry after a partial failure re-attempts
//! variable creation and fails inside the netCDF layer instead of silently
//! skipping.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use particle_grid::{DerivedRecord, GridKind, GroupKey, HorizontalGrid};

use crate::error::{IoResult, ParticleIoError};

/// Dimension names a results file may be defined on.
const RESULT_DIMS: [&str; 3] = ["lon", "lat", "depth"];

/// Accumulates derived records and persists them with grid coordinates and
/// provenance metadata.
pub struct ResultsFile {
    path: PathBuf,
    original_file: String,
    kind: Option<GridKind>,
    dims: Vec<(String, usize)>,
    coords: Vec<(String, Vec<f64>)>,
    pending: Vec<(GroupKey, DerivedRecord)>,
    exists: bool,
}

/// Results read back from a persisted file, for the plotting path.
#[derive(Debug, Clone)]
pub struct ResultsData {
    pub kind: GridKind,
    pub lon: Vec<f64>,
    pub lat: Option<Vec<f64>>,
    pub depth: Option<Vec<f64>>,
    /// Count variables by name, in file order.
    pub counts: Vec<(String, Vec<f32>)>,
    /// Concentration variables by name, in file order.
    pub concentration: Vec<(String, Vec<f32>)>,
}

impl ResultsFile {
    /// Bind a results path. When the path already exists its dimensions are
    /// validated immediately; deciding whether to overwrite is left to the
    /// caller via [`ResultsFile::guard_overwrite`].
    pub fn create(path: impl Into<PathBuf>, original_file: impl Into<String>) -> IoResult<Self> {
        let path = path.into();
        let exists = path.exists();
        let mut results = Self {
            path,
            original_file: original_file.into(),
            kind: None,
            dims: Vec::new(),
            coords: Vec::new(),
            pending: Vec::new(),
            exists,
        };
        if results.exists {
            results.check_dimensions()?;
        }
        Ok(results)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the target path existed when this handle was created.
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Fail unless the target is writable under the overwrite policy.
    pub fn guard_overwrite(&self, overwrite: bool) -> IoResult<()> {
        if self.exists && !overwrite {
            return Err(ParticleIoError::ExistingOutput(self.path.clone()));
        }
        Ok(())
    }

    /// Validate that an existing file has exactly two spatial dimensions
    /// drawn from lon/lat/depth, and adopt them.
    pub fn check_dimensions(&mut self) -> IoResult<()> {
        let file = netcdf::open(&self.path)?;
        let dims: Vec<(String, usize)> = file.dimensions().map(|d| (d.name(), d.len())).collect();
        if dims.len() != 2 {
            return Err(ParticleIoError::DimensionMismatch(format!(
                "results file {} has {} dimensions, expected 2",
                self.path.display(),
                dims.len()
            )));
        }
        if !dims
            .iter()
            .all(|(name, _)| RESULT_DIMS.contains(&name.as_str()))
        {
            return Err(ParticleIoError::DimensionMismatch(format!(
                "results file {} has unexpected dimensions: {:?}",
                self.path.display(),
                dims.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>()
            )));
        }
        self.dims = dims;
        Ok(())
    }

    /// Adopt the grid's dimensions and coordinates and create the results
    /// file with coordinate variables and provenance attributes.
    pub fn initialize(&mut self, grid: &HorizontalGrid) -> IoResult<()> {
        self.kind = Some(grid.kind());
        self.dims = grid
            .dims()
            .into_iter()
            .map(|(n, s)| (n.to_string(), s))
            .collect();
        self.coords = grid
            .coords()
            .into_iter()
            .map(|(n, v)| (n.to_string(), v.to_vec()))
            .collect();
        self.pending.clear();

        for (dim_name, dim_size) in &self.dims {
            let coord = self
                .coords
                .iter()
                .find(|(name, _)| name == dim_name)
                .ok_or_else(|| {
                    ParticleIoError::DimensionMismatch(format!(
                        "dimension {dim_name} has no matching coordinate"
                    ))
                })?;
            if coord.1.len() != *dim_size {
                return Err(ParticleIoError::DimensionMismatch(format!(
                    "coordinate {dim_name} has length {} but dimension size {}",
                    coord.1.len(),
                    dim_size
                )));
            }
        }

        info!(file = %self.path.display(), "creating results file");
        let mut file = netcdf::create(&self.path)?;
        for (name, size) in &self.dims {
            file.add_dimension(name, *size)?;
        }
        for (name, values) in &self.coords {
            let mut var = file.add_variable::<f32>(name, &[name.as_str()])?;
            let values: Vec<f32> = values.iter().map(|&v| v as f32).collect();
            var.put_values(&values, ..)?;
        }
        file.add_attribute("original_file", self.original_file.as_str())?;
        file.add_attribute("type", grid.kind().as_str())?;
        file.add_attribute("created", Utc::now().to_rfc3339().as_str())?;
        Ok(())
    }

    /// Buffer a derived record under a group key. No I/O happens here.
    pub fn append(&mut self, record: DerivedRecord, group: GroupKey) {
        self.pending.push((group, record));
    }

    /// Number of buffered records awaiting [`ResultsFile::write`].
    pub fn pending_records(&self) -> usize {
        self.pending.len()
    }

    /// Flush every buffered record to the file.
    ///
    /// One float32 variable is created per name-mapping entry, named
    /// `<group>_<suffix>`, holding the matching 2-D layer and tagged with
    /// `units`, `name` and `name_dict` attributes.
    pub fn write(&mut self) -> IoResult<()> {
        info!(file = %self.path.display(), records = self.pending.len(), "writing results to file");
        let mut file = netcdf::append(&self.path)?;
        for (group, record) in &self.pending {
            for (dim_name, _) in &self.dims {
                if !record.dims.iter().any(|(name, _)| name == dim_name) {
                    return Err(ParticleIoError::DimensionMismatch(format!(
                        "record {} lacks results dimension {dim_name}",
                        record.name
                    )));
                }
            }
            let dim_names: Vec<&str> = record.dims.iter().map(|(n, _)| n.as_str()).collect();
            let name_dict = name_dict_attr(record);
            for (layer, (suffix, _label)) in record.name_dict.iter().enumerate() {
                let full_name = format!("{}_{}", group.as_str(), suffix);
                let mut var = file.add_variable::<f32>(&full_name, &dim_names)?;
                let values: Vec<f32> = record.layer(layer).iter().map(|&v| v as f32).collect();
                var.put_values(&values, ..)?;
                var.put_attribute("units", record.units.as_str())?;
                var.put_attribute("name", record.name.as_str())?;
                var.put_attribute("name_dict", name_dict.as_str())?;
            }
        }
        self.pending.clear();
        Ok(())
    }

    /// Read a persisted results file back: coordinates by grid kind, plus
    /// every counts and concentration variable.
    pub fn read(&self) -> IoResult<ResultsData> {
        let file = netcdf::open(&self.path)?;
        let kind = match file.attribute("type") {
            Some(attr) => match attr.value()? {
                netcdf::AttributeValue::Str(s) => GridKind::parse(&s)?,
                _ => {
                    return Err(ParticleIoError::MissingData(format!(
                        "type attribute in {} is not a string",
                        self.path.display()
                    )))
                }
            },
            None => {
                return Err(ParticleIoError::MissingData(format!(
                    "type attribute in {}",
                    self.path.display()
                )))
            }
        };

        let coord = |name: &str| -> IoResult<Vec<f64>> {
            let var = file.variable(name).ok_or_else(|| {
                ParticleIoError::MissingData(format!("variable {name} in {}", self.path.display()))
            })?;
            Ok(var.get_values(..)?)
        };
        let (lon, lat, depth) = match kind {
            GridKind::Map => (coord("lon")?, Some(coord("lat")?), None),
            GridKind::Profile => (coord("lon")?, None, Some(coord("depth")?)),
        };

        let mut counts = Vec::new();
        let mut concentration = Vec::new();
        for var in file.variables() {
            let name = var.name();
            if name.contains("counts") {
                counts.push((name, var.get_values(..)?));
            } else if name.contains("concentration") {
                concentration.push((name, var.get_values(..)?));
            }
        }

        Ok(ResultsData {
            kind,
            lon,
            lat,
            depth,
            counts,
            concentration,
        })
    }
}

/// Full name mapping of a record as a JSON object string, stored as a
/// variable attribute so output layers stay interpretable on their own.
fn name_dict_attr(record: &DerivedRecord) -> String {
    let map: serde_json::Map<String, serde_json::Value> = record
        .name_dict
        .iter()
        .map(|(suffix, label)| (suffix.clone(), serde_json::Value::from(label.as_str())))
        .collect();
    serde_json::Value::Object(map).to_string()
}
