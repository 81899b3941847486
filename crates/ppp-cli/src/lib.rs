//! Library surface of the `ppp` binary, exposed so integration tests can
//! drive the processing pipeline directly.

pub mod process;
