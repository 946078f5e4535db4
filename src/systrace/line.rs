//! Trace line grammar and conversion.
//!
//! Lines follow the ftrace text layout:
//!
//! ```text
//! <task>-<pid> (<tgid>) [<cpu>] <flags> <seconds>.<fraction>: <token>: <value>
//! surfaceflinger-664 (  664) [003] ...1 518317.537935: tracing_mark_write: B|664|handleMessageInvalidate
//! ```
//!
//! Anything else is rejected.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{ReportError, Result};
use crate::report::datum::{Datum, UNKNOWN_ISSUE_ID};

/// `suite_id` of records converted from trace lines.
pub const SYSTRACE_SUITE_ID: &str = "systrace";

/// Custom field keeping the trace-clock timestamp of a converted record.
pub const UNADJUSTED_TIMESTAMP_KEY: &str = "unadjusted_systrace_timestamp";

lazy_static! {
    static ref TRACE_LINE: Regex =
        Regex::new(r"^\s*(.+?)-(\d+)\s+\(.*?\)\s+\[(\d+)\]\s+.*?(\d+\.\d+):\s+(.*)$").unwrap();
}

/// One parsed trace line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub task: String,
    pub pid: u32,
    pub cpu: u32,
    /// Trace-clock timestamp in nanoseconds.
    pub timestamp_ns: i64,
    pub token: String,
    pub value: String,
}

impl TraceEvent {
    /// Synthetic record in the report clock domain.
    pub fn to_datum(&self, offset_ns: i64) -> Datum {
        let mut custom = Map::new();
        custom.insert(self.token.clone(), Value::String(self.value.clone()));
        custom.insert(UNADJUSTED_TIMESTAMP_KEY.to_string(), Value::from(self.timestamp_ns));

        Datum::new(
            UNKNOWN_ISSUE_ID,
            SYSTRACE_SUITE_ID,
            self.task.as_str(),
            self.pid.to_string(),
            self.cpu,
            self.timestamp_ns - offset_ns,
            custom,
        )
    }
}

fn invalid(line: &str, reason: &str) -> ReportError {
    ReportError::TraceLine {
        line: line.to_string(),
        reason: reason.to_string(),
    }
}

/// Exact nanoseconds from a `<seconds>.<fraction>` string.
///
/// Fractions longer than nine digits are truncated.
pub fn parse_seconds_ns(text: &str) -> Option<i64> {
    let text = text.trim();
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let seconds: i64 = whole.parse().ok()?;
    let mut nanos: i64 = 0;
    for digit in fraction.bytes().chain(std::iter::repeat(b'0')).take(9) {
        nanos = nanos * 10 + i64::from(digit - b'0');
    }
    seconds.checked_mul(1_000_000_000)?.checked_add(nanos)
}

/// Parse one trace line.
pub fn parse_trace_line(line: &str) -> Result<TraceEvent> {
    let caps = TRACE_LINE
        .captures(line)
        .ok_or_else(|| invalid(line, "does not match trace line layout"))?;

    let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();

    let pid = group(2).parse::<u32>().map_err(|_| invalid(line, "pid out of range"))?;
    let cpu = group(3).parse::<u32>().map_err(|_| invalid(line, "cpu out of range"))?;
    let timestamp_ns = parse_seconds_ns(group(4)).ok_or_else(|| invalid(line, "timestamp out of range"))?;

    let (token, value) = group(5)
        .split_once(':')
        .ok_or_else(|| invalid(line, "message has no token separator"))?;

    Ok(TraceEvent {
        task: group(1).trim().to_string(),
        pid,
        cpu,
        timestamp_ns,
        token: token.trim().to_string(),
        value: value.trim().to_string(),
    })
}

/// Keep the lines of interest.
///
/// Keywords take precedence: when any are given, a line is kept if it
/// contains one of them. Otherwise a line is kept if `pattern` matches it.
/// With neither, nothing is kept.
pub fn filter_lines(lines: &[String], keywords: &[String], pattern: Option<&str>) -> Result<Vec<String>> {
    if !keywords.is_empty() {
        return Ok(lines
            .iter()
            .filter(|line| keywords.iter().any(|kw| line.contains(kw.as_str())))
            .cloned()
            .collect());
    }

    match pattern {
        Some(pattern) => {
            let re = Regex::new(pattern)?;
            Ok(lines.iter().filter(|line| re.is_match(line)).cloned().collect())
        }
        None => Ok(Vec::new()),
    }
}
