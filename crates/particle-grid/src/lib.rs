//! Grid binning and grouped aggregation for particle tracking output.
//!
//! This crate is the in-memory core of the particle post-processor: it turns
//! a stream of (possibly ragged, fill-valued, multi-group) particle positions
//! into dense per-cell statistics.
//!
//! # Pipeline
//!
//! ```text
//! topography edges ──► HorizontalGrid ──► cell mesh (m², lat-corrected)
//!                             │
//! particle samples ──────────►├─ counts / counts_by ──► GroupedCounts
//!                             │                              │
//!                             └─ Quantity derivers ──► DerivedRecord
//!                                (counts, concentration, ...)
//! ```
//!
//! File-format adapters live in the `particle-io` crate; this crate performs
//! no I/O.

pub mod error;
pub mod grid;
pub mod histogram;
pub mod quantity;

pub use error::{GridError, GridResult};
pub use grid::{GridKind, HorizontalGrid, DEG_TO_M, M_TO_DEG};
pub use histogram::{GroupKey, GroupedCounts, SampleSet};
pub use quantity::{Concentration, Counts, DerivedRecord, Quantity};
