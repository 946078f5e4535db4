//! Pipeline orchestration module.
//!
//! Multi-report ingestion that coordinates:
//! - Trace merging
//! - Report renaming
//! - Loading and partitioning
//! - Handler dispatch

pub mod context;
pub mod ingestion;

pub use context::*;
pub use ingestion::*;
