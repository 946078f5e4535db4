//! CertReport Core - report ingestion pipeline for device certification runs
//!
//! This crate turns the line-delimited reports written by on-device
//! performance and functional tests into a typed event stream, groups it
//! into suites, and binds each suite to the analysis handler that knows how
//! to read it. When a kernel trace capture was recorded next to a report,
//! its events are merged into the report under a synchronized clock.
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `pipeline` - Multi-report orchestrator and run configuration
//! - `report` - Build info, event records, loading, writing, CSV export
//! - `device` - Device identity and the per-run device registry
//! - `suite` - Suite aggregate and partitioning
//! - `routing` - Handler registry, dispatch, per-suite analysis
//! - `systrace` - Trace capture parsing and clock-synchronized merge
//! - `extraction` - Payload flattening and value coercion
//! - `logging` - Structured logging with run context
//! - `error` - Error type shared by every module

pub mod device;
pub mod error;
pub mod extraction;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod routing;
pub mod suite;
pub mod systrace;

pub use error::{ReportError, Result};
pub use pipeline::context::{PipelineConfig, RunContext};
pub use pipeline::ingestion::{process_report, process_reports, RunResult};

/// Initialize the process-wide logger.
///
/// Safe to call more than once; `RUST_LOG` overrides the default level.
pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}
