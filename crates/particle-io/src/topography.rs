//! Topography (grid definition) file reader.
//!
//! A topography file defines the native model grid: a longitude dimension,
//! a latitude dimension and a `bathymetry` field. Different model setups
//! name the coordinate dimensions differently, so both axes are resolved
//! through an alias list.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{IoResult, ParticleIoError};

/// Accepted longitude dimension names.
pub const LON_NAMES: [&str; 3] = ["lon", "lonc", "longitude"];

/// Accepted latitude dimension names.
pub const LAT_NAMES: [&str; 3] = ["lat", "latc", "latitude"];

/// Native grid coordinates and bathymetry read from a topography file.
#[derive(Debug, Clone)]
pub struct Topography {
    path: PathBuf,
    /// Longitude edge values, degrees.
    pub lon: Vec<f64>,
    /// Latitude edge values, degrees.
    pub lat: Vec<f64>,
    /// Bathymetry field, flattened as stored.
    pub bathymetry: Vec<f64>,
}

impl Topography {
    /// Read coordinates and bathymetry from a topography file.
    ///
    /// Fails with a configuration error when neither longitude nor latitude
    /// dimension can be recognized by name.
    pub fn read(path: impl Into<PathBuf>) -> IoResult<Self> {
        let path = path.into();
        let file = netcdf::open(&path)?;

        let dim_names: Vec<String> = file.dimensions().map(|d| d.name()).collect();
        let lon_name = find_alias(&dim_names, &LON_NAMES).ok_or_else(|| {
            ParticleIoError::Configuration(format!(
                "no longitude dimension ({}) in {}",
                LON_NAMES.join("/"),
                path.display()
            ))
        })?;
        let lat_name = find_alias(&dim_names, &LAT_NAMES).ok_or_else(|| {
            ParticleIoError::Configuration(format!(
                "no latitude dimension ({}) in {}",
                LAT_NAMES.join("/"),
                path.display()
            ))
        })?;
        debug!(lon = lon_name, lat = lat_name, file = %path.display(), "resolved grid dimensions");

        let lon = read_var(&file, lon_name, &path)?;
        let lat = read_var(&file, lat_name, &path)?;
        let bathymetry = read_var(&file, "bathymetry", &path)?;

        Ok(Self {
            path,
            lon,
            lat,
            bathymetry,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn find_alias<'a>(dim_names: &[String], aliases: &[&'a str]) -> Option<&'a str> {
    aliases
        .iter()
        .copied()
        .find(|alias| dim_names.iter().any(|n| n == alias))
}

fn read_var(file: &netcdf::File, name: &str, path: &Path) -> IoResult<Vec<f64>> {
    let var = file.variable(name).ok_or_else(|| {
        ParticleIoError::MissingData(format!("variable {name} in {}", path.display()))
    })?;
    Ok(var.get_values(..)?)
}
