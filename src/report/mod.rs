//! Report files.
//!
//! Line-delimited JSON reports as produced by the on-device test harness:
//! - `build_info` - line 0, device identification
//! - `datum` - every later line, one event record
//! - `loader` - reading and build-info homologation
//! - `writer` - writing and canonical file names
//! - `csv` - flat CSV export

pub mod build_info;
pub mod csv;
pub mod datum;
pub mod loader;
pub mod writer;

pub use build_info::BuildInfo;
pub use csv::*;
pub use datum::*;
pub use loader::*;
pub use writer::*;
