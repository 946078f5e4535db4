//! Structured logging with run context.
//!
//! Every log message carries the run id, and where known the report file and
//! suite name, for easy correlation across a batch of reports.

pub mod structured;

pub use structured::*;
