//! NetCDF adapters for the particle post-processor.
//!
//! Three file surfaces, one module each:
//!
//! - [`trajectory`]: particle trajectory files, `(time, particle)` fields
//!   with fill-value sanitization, lazy caching and id filtering.
//! - [`topography`]: grid-definition files, native lon/lat coordinates
//!   (resolved through name aliases) and bathymetry.
//! - [`results`]: the output file, batched accumulation of derived
//!   records, coordinate variables and provenance attributes.
//!
//! All reads and writes go through the `netcdf` crate; file handles are
//! acquired per operation and released on every exit path by drop.

pub mod error;
pub mod results;
pub mod topography;
pub mod trajectory;

pub use error::{IoResult, ParticleIoError};
pub use results::{ResultsData, ResultsFile};
pub use topography::Topography;
pub use trajectory::{ParticleFile, FILL_VALUE_FLOAT, FILL_VALUE_STATE, MISSING_STATE};

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when
/// errors are handled gracefully by the Rust code (e.g., when probing for
/// optional attributes). This disables that output by installing null
/// handlers via `H5Eset_auto2`. Call it early in `main()`, before any
/// HDF5/NetCDF operation; calling it more than once is safe.
pub fn silence_hdf5_errors() {
    use std::sync::Once;

    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and null handlers are a
        // documented way to disable error output.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}
