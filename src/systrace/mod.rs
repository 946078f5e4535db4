//! Kernel trace merging.
//!
//! Folds a companion trace capture into a report:
//! - `capture` - payload extraction from the capture document
//! - `clock` - offset between trace and report clocks
//! - `line` - trace line grammar, filtering, conversion to records
//! - `merge` - ordering and in-place rewrite of the report

pub mod capture;
pub mod clock;
pub mod line;
pub mod merge;

pub use capture::*;
pub use clock::*;
pub use line::*;
pub use merge::*;
