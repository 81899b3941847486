//! End-to-end pipeline test: fabricate trajectory and topography files,
//! run the process subcommand, and inspect the results file.

use std::path::{Path, PathBuf};

use approx::assert_relative_eq;

use particle_grid::GroupKey;
use ppp_cli::process::{run, ProcessArgs};

/// 2 timesteps x 3 particles, ids [1, 1, 2], all positions inside a
/// 2x2-cell grid spanning [0, 2] x [0, 2].
fn write_trajectory(path: &Path) {
    let mut file = netcdf::create(path).unwrap();
    file.add_dimension("time", 2).unwrap();
    file.add_dimension("particle", 3).unwrap();
    let lon = [0.5, 1.5, 0.5, 0.5, 1.5, 1.5];
    let lat = [0.5, 0.5, 1.5, 1.5, 0.5, 1.5];
    for (name, values) in [("lon", &lon), ("lat", &lat), ("depth", &lat)] {
        let mut var = file
            .add_variable::<f64>(name, &["time", "particle"])
            .unwrap();
        var.put_values(values, ..).unwrap();
    }
    let mut var = file
        .add_variable::<i32>("state", &["time", "particle"])
        .unwrap();
    var.put_values(&[1, 1, -2, 1, 1, 2], ..).unwrap();
    let mut var = file.add_variable::<f64>("id", &["particle"]).unwrap();
    var.put_values(&[1.0, 1.0, 2.0], ..).unwrap();
}

fn write_topo(path: &Path) {
    let mut file = netcdf::create(path).unwrap();
    file.add_dimension("lon", 3).unwrap();
    file.add_dimension("lat", 3).unwrap();
    for name in ["lon", "lat"] {
        let mut var = file.add_variable::<f64>(name, &[name]).unwrap();
        var.put_values(&[0.0, 1.0, 2.0], ..).unwrap();
    }
    let mut var = file
        .add_variable::<f64>("bathymetry", &["lat", "lon"])
        .unwrap();
    var.put_values(&[10.0; 9], ..).unwrap();
}

fn process_args(source: PathBuf, out_file: PathBuf, topo: PathBuf) -> ProcessArgs {
    ProcessArgs {
        source,
        out_file,
        overwrite: false,
        topo,
        resolution: None,
        sort: vec![GroupKey::All, GroupKey::Id, GroupKey::State],
        id_list: None,
        ini_file: None,
        last: false,
    }
}

fn get_values(file: &netcdf::File, name: &str) -> Vec<f32> {
    file.variable(name)
        .unwrap_or_else(|| panic!("variable {name} missing"))
        .get_values(..)
        .unwrap()
}

#[test]
fn test_process_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("drift.nc");
    let topo = dir.path().join("topo.nc");
    let out = dir.path().join("counts.nc");
    write_trajectory(&source);
    write_topo(&topo);

    run(&process_args(source.clone(), out.clone(), topo)).unwrap();

    let file = netcdf::open(&out).unwrap();
    assert_eq!(file.dimension("lon").unwrap().len(), 2);
    assert_eq!(file.dimension("lat").unwrap().len(), 2);

    // Ungrouped: every sample lands in the grid.
    let all_counts = get_values(&file, "all_counts");
    assert_eq!(all_counts.iter().sum::<f32>(), 6.0);

    // By id: id 1 owns two particles over two timesteps, id 2 one.
    let id0 = get_values(&file, "id_counts0");
    let id1 = get_values(&file, "id_counts1");
    assert_eq!(id0.iter().sum::<f32>(), 4.0);
    assert_eq!(id1.iter().sum::<f32>(), 2.0);

    // By state: codes {1, -2, 2} bucket on absolute value into {1, 2}.
    let state0 = get_values(&file, "state_counts0");
    let state1 = get_values(&file, "state_counts1");
    assert_eq!(state0.iter().sum::<f32>(), 4.0);
    assert_eq!(state1.iter().sum::<f32>(), 2.0);

    // Grouped layers sum to the ungrouped field cell by cell.
    for cell in 0..4 {
        assert_eq!(id0[cell] + id1[cell], all_counts[cell]);
        assert_eq!(state0[cell] + state1[cell], all_counts[cell]);
    }

    // Concentration is counts over cell area, for every grouping.
    let all_conc = get_values(&file, "all_concentration");
    let id_conc0 = get_values(&file, "id_concentration0");
    let cell_area = {
        let deg2m = 1852.0 * 60.0;
        let cos_lat = (1.0f64).to_radians().cos();
        (deg2m * cos_lat * deg2m) as f32
    };
    for cell in 0..4 {
        assert_relative_eq!(all_conc[cell], all_counts[cell] / cell_area, max_relative = 1e-6);
        assert_relative_eq!(id_conc0[cell], id0[cell] / cell_area, max_relative = 1e-6);
    }
    assert!(file.variable("id_concentration1").is_some());
    assert!(file.variable("state_concentration0").is_some());
    assert!(file.variable("state_concentration1").is_some());

    // Provenance.
    match file.attribute("original_file").unwrap().value().unwrap() {
        netcdf::AttributeValue::Str(s) => assert_eq!(s, source.to_string_lossy()),
        other => panic!("unexpected attribute value: {other:?}"),
    }
}

#[test]
fn test_existing_output_requires_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("drift.nc");
    let topo = dir.path().join("topo.nc");
    let out = dir.path().join("counts.nc");
    write_trajectory(&source);
    write_topo(&topo);

    let args = process_args(source.clone(), out.clone(), topo.clone());
    run(&args).unwrap();

    let err = run(&args).unwrap_err();
    assert!(err.to_string().contains("already exists"));

    let mut args = process_args(source, out, topo);
    args.overwrite = true;
    run(&args).unwrap();
}

#[test]
fn test_id_list_filters_processing() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("drift.nc");
    let topo = dir.path().join("topo.nc");
    let out = dir.path().join("counts.nc");
    write_trajectory(&source);
    write_topo(&topo);

    let mut args = process_args(source, out.clone(), topo);
    args.id_list = Some(vec![2.0]);
    args.sort = vec![GroupKey::All];
    run(&args).unwrap();

    let file = netcdf::open(&out).unwrap();
    let all_counts = get_values(&file, "all_counts");
    assert_eq!(all_counts.iter().sum::<f32>(), 2.0);
}

#[test]
fn test_last_positions_only() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("drift.nc");
    let topo = dir.path().join("topo.nc");
    let out = dir.path().join("counts.nc");
    write_trajectory(&source);
    write_topo(&topo);

    let mut args = process_args(source, out.clone(), topo);
    args.last = true;
    args.sort = vec![GroupKey::All];
    run(&args).unwrap();

    let file = netcdf::open(&out).unwrap();
    let all_counts = get_values(&file, "all_counts");
    assert_eq!(all_counts.iter().sum::<f32>(), 3.0, "one sample per particle");
}

#[test]
fn test_resampled_grid_covers_extent() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("drift.nc");
    let topo = dir.path().join("topo.nc");
    let out = dir.path().join("counts.nc");
    write_trajectory(&source);
    write_topo(&topo);

    let mut args = process_args(source, out.clone(), topo);
    // Half-degree-scale cells: 2 degrees of latitude span four bins.
    args.resolution = Some(0.5 * 1852.0 * 60.0);
    args.sort = vec![GroupKey::All];
    run(&args).unwrap();

    let file = netcdf::open(&out).unwrap();
    let n_lat = file.dimension("lat").unwrap().len();
    assert!(n_lat >= 4, "resampled grid must cover the native extent");
    let all_counts = get_values(&file, "all_counts");
    assert_eq!(all_counts.iter().sum::<f32>(), 6.0, "no sample falls off the grid");
}
