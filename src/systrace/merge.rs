//! Merging trace events into a report.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::device::registry::DeviceRegistry;
use crate::error::{ReportError, Result};
use crate::logging::structured::LogContext;
use crate::report::datum::Datum;
use crate::report::loader::load_report;
use crate::report::writer::save_report;
use crate::systrace::capture::read_trace_lines;
use crate::systrace::clock::{find_clock_offset, ClockSync, DEFAULT_CLOCK_SYNC_MARKER};
use crate::systrace::line::{filter_lines, parse_trace_line};

/// Which trace lines to keep and how to find the sync marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    pub keywords: Vec<String>,
    pub pattern: Option<String>,
    pub clock_sync_marker: String,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            pattern: None,
            clock_sync_marker: DEFAULT_CLOCK_SYNC_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub clock: ClockSync,
    pub report_records: usize,
    pub trace_records: usize,
}

/// Concatenate and stably sort by timestamp. Ties keep report records first.
pub fn merge_datums(report: Vec<Datum>, trace: Vec<Datum>) -> Vec<Datum> {
    let mut merged = report;
    merged.extend(trace);
    merged.sort_by_key(Datum::timestamp);
    merged
}

/// Synthetic records for the lines of interest in `lines`.
pub fn convert_trace_lines(lines: &[String], options: &MergeOptions) -> Result<(ClockSync, Vec<Datum>)> {
    let clock = find_clock_offset(lines, &options.clock_sync_marker)?;
    let kept = filter_lines(lines, &options.keywords, options.pattern.as_deref())?;

    let data = kept
        .iter()
        .map(|line| parse_trace_line(line).map(|event| event.to_datum(clock.offset_ns)))
        .collect::<Result<Vec<_>>>()?;

    Ok((clock, data))
}

/// Merge the capture at `trace_path` into the report at `report_path`,
/// rewriting the report in place.
///
/// A capture without a sync marker fails with `ClockSyncMissing` and leaves
/// the report untouched.
pub fn merge_systrace(
    report_path: &Path,
    trace_path: &Path,
    options: &MergeOptions,
    registry: &DeviceRegistry,
    ctx: &LogContext,
) -> Result<MergeSummary> {
    let ctx = ctx.with_report(report_path);

    let lines = read_trace_lines(trace_path)?;
    let (clock, trace) = match convert_trace_lines(&lines, options) {
        Ok(converted) => converted,
        Err(e @ ReportError::ClockSyncMissing) => {
            log::warn!(
                "{} CLOCK_SYNC_MISSING trace={} marker={}",
                ctx,
                trace_path.display(),
                options.clock_sync_marker
            );
            return Err(e);
        }
        Err(e) => return Err(e),
    };
    log::info!(
        "{} CLOCK_SYNC_FOUND offset_ns={} reference_ns={} line={}",
        ctx,
        clock.offset_ns,
        clock.reference_ns,
        clock.line_index
    );

    let (build, data) = load_report(report_path, registry, &ctx)?;
    let summary = MergeSummary {
        clock,
        report_records: data.len(),
        trace_records: trace.len(),
    };

    let merged = merge_datums(data, trace);
    save_report(report_path, &build, &merged)?;

    log::info!(
        "{} SYSTRACE_MERGED report_records={} trace_records={}",
        ctx,
        summary.report_records,
        summary.trace_records
    );
    Ok(summary)
}
