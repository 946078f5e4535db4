//! Clock synchronization between a trace capture and its report.
//!
//! The harness writes a marker into the trace carrying the report-clock time
//! at which it was emitted. The marker's own trace-clock timestamp and that
//! reference give the offset between the two domains. Only the first marker
//! in a capture is used; later ones are ignored even if they disagree.

use crate::error::{ReportError, Result};
use crate::systrace::line::{parse_seconds_ns, parse_trace_line};

/// Marker token written by the harness.
pub const DEFAULT_CLOCK_SYNC_MARKER: &str = "ancer::clock_sync";

/// Marker written by older capture tooling, followed by `parent_ts=<seconds>`.
pub const LEGACY_CLOCK_SYNC_MARKER: &str = "trace_event_clock_sync:";

const LEGACY_PARENT_TS: &str = "parent_ts=";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSync {
    /// `reference_ns - trace_ns`.
    pub offset_ns: i64,
    pub reference_ns: i64,
    pub trace_ns: i64,
    /// Index of the marker line in the scanned lines.
    pub line_index: usize,
}

/// Reference timestamp of a harness marker.
///
/// `<marker>(<id>)|<reference>` carries the reference after the last `|`;
/// without one, the parenthesized number is the reference.
fn harness_reference(line: &str, marker: &str) -> Option<i64> {
    let start = line.find(marker)? + marker.len();
    let tail = &line[start..];

    if let Some(pipe) = tail.rfind('|') {
        if let Ok(reference) = tail[pipe + 1..].trim().parse() {
            return Some(reference);
        }
    }

    let open = tail.find('(')?;
    let close = tail[open..].find(')')? + open;
    tail[open + 1..close].trim().parse().ok()
}

fn legacy_reference(line: &str) -> Option<i64> {
    let start = line.rfind(LEGACY_PARENT_TS)? + LEGACY_PARENT_TS.len();
    let value = line[start..].split_whitespace().next()?;
    parse_seconds_ns(value)
}

/// Find the first sync marker in `lines` and compute the clock offset.
pub fn find_clock_offset(lines: &[String], marker: &str) -> Result<ClockSync> {
    for (line_index, line) in lines.iter().enumerate() {
        let reference = if !marker.is_empty() && line.contains(marker) {
            harness_reference(line, marker)
        } else if line.contains(LEGACY_CLOCK_SYNC_MARKER) {
            legacy_reference(line)
        } else {
            continue;
        };

        let reference_ns = reference.ok_or_else(|| ReportError::TraceLine {
            line: line.clone(),
            reason: "clock sync marker without a reference timestamp".to_string(),
        })?;
        let trace_ns = parse_trace_line(line)?.timestamp_ns;

        return Ok(ClockSync {
            offset_ns: reference_ns - trace_ns,
            reference_ns,
            trace_ns,
            line_index,
        });
    }

    Err(ReportError::ClockSyncMissing)
}
