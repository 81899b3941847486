//! Topography reader tests against fabricated netCDF files.

use std::path::Path;

use particle_io::{ParticleIoError, Topography};

fn write_topo(path: &Path, lon_name: &str, lat_name: &str, lon: &[f64], lat: &[f64]) {
    let mut file = netcdf::create(path).unwrap();
    file.add_dimension(lon_name, lon.len()).unwrap();
    file.add_dimension(lat_name, lat.len()).unwrap();
    let mut var = file.add_variable::<f64>(lon_name, &[lon_name]).unwrap();
    var.put_values(lon, ..).unwrap();
    let mut var = file.add_variable::<f64>(lat_name, &[lat_name]).unwrap();
    var.put_values(lat, ..).unwrap();
    let mut var = file
        .add_variable::<f64>("bathymetry", &[lat_name, lon_name])
        .unwrap();
    let bathy: Vec<f64> = (0..lon.len() * lat.len()).map(|i| i as f64).collect();
    var.put_values(&bathy, ..).unwrap();
}

#[test]
fn test_plain_dimension_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("topo.nc");
    write_topo(&path, "lon", "lat", &[0.0, 1.0, 2.0], &[10.0, 11.0]);

    let topo = Topography::read(&path).unwrap();
    assert_eq!(topo.lon, vec![0.0, 1.0, 2.0]);
    assert_eq!(topo.lat, vec![10.0, 11.0]);
    assert_eq!(topo.bathymetry.len(), 6);
}

#[test]
fn test_aliased_dimension_names() {
    let dir = tempfile::tempdir().unwrap();

    let path = dir.path().join("topo_c.nc");
    write_topo(&path, "lonc", "latc", &[0.0, 1.0], &[5.0, 6.0]);
    let topo = Topography::read(&path).unwrap();
    assert_eq!(topo.lon, vec![0.0, 1.0]);

    let path = dir.path().join("topo_long.nc");
    write_topo(&path, "longitude", "latitude", &[0.0, 1.0], &[5.0, 6.0]);
    let topo = Topography::read(&path).unwrap();
    assert_eq!(topo.lat, vec![5.0, 6.0]);
}

#[test]
fn test_unrecognized_dimensions_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("topo.nc");
    write_topo(&path, "x", "lat", &[0.0, 1.0], &[5.0, 6.0]);

    let err = Topography::read(&path).unwrap_err();
    assert!(matches!(err, ParticleIoError::Configuration(_)));
    assert!(err.to_string().contains("longitude"));
}

#[test]
fn test_missing_bathymetry_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("topo.nc");
    let mut file = netcdf::create(&path).unwrap();
    file.add_dimension("lon", 2).unwrap();
    file.add_dimension("lat", 2).unwrap();
    for name in ["lon", "lat"] {
        let mut var = file.add_variable::<f64>(name, &[name]).unwrap();
        var.put_values(&[0.0, 1.0], ..).unwrap();
    }
    drop(file);

    let err = Topography::read(&path).unwrap_err();
    assert!(matches!(err, ParticleIoError::MissingData(_)));
}
