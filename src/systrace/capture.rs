//! Trace capture extraction.
//!
//! A capture is an HTML document whose trace payload sits between
//! `<!-- BEGIN TRACE -->` and `<!-- END TRACE -->`. Inside that span the
//! payload is split over one or more `<script class="trace-data">` blocks;
//! the longest block holds the kernel trace text.

use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ReportError, Result};

lazy_static! {
    static ref BEGIN_MARKER: Regex = Regex::new(r"(?:<!--\s*)?BEGIN TRACE(?:\s*-->)?").unwrap();
    static ref END_MARKER: Regex = Regex::new(r"(?:<!--\s*)?END TRACE(?:\s*-->)?").unwrap();
    static ref TRACE_DATA_BLOCK: Regex =
        Regex::new(r#"(?s)<script[^>]*class="trace-data"[^>]*>(.*?)</script>"#).unwrap();
}

/// Text between the BEGIN and END markers.
pub fn extract_trace_span(text: &str) -> Result<&str> {
    let begin = BEGIN_MARKER.find(text).ok_or(ReportError::TraceMarkersMissing)?;
    let end = END_MARKER
        .find_at(text, begin.end())
        .ok_or(ReportError::TraceMarkersMissing)?;
    Ok(&text[begin.end()..end.start()])
}

/// Payload blocks of a span. A span without script blocks is one block.
pub fn payload_blocks(span: &str) -> Vec<&str> {
    let blocks: Vec<&str> = TRACE_DATA_BLOCK
        .captures_iter(span)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();
    if blocks.is_empty() {
        vec![span]
    } else {
        blocks
    }
}

/// Trimmed, non-blank, non-comment lines of the longest payload block.
pub fn extract_trace_lines(text: &str) -> Result<Vec<String>> {
    let span = extract_trace_span(text)?;

    let mut longest = "";
    for block in payload_blocks(span) {
        if block.len() > longest.len() {
            longest = block;
        }
    }

    Ok(longest
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Read a capture file and extract its trace lines.
pub fn read_trace_lines(path: &Path) -> Result<Vec<String>> {
    let bytes = fs::read(path)?;
    extract_trace_lines(&String::from_utf8_lossy(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPTURE: &str = r#"<html>
<!-- BEGIN TRACE -->
  <script class="trace-data" type="application/text">
# tracer: nop
  app-1 (1) [000] ...1 1.000000: tracing_mark_write: B|1|short
  </script>
  <script class="trace-data" type="application/text">
# tracer: nop
#
  app-1 (1) [000] ...1 1.000000: tracing_mark_write: B|1|first

  app-1 (1) [001] ...1 2.000000: tracing_mark_write: E|1
  </script>
<!-- END TRACE -->
</html>"#;

    #[test]
    fn test_longest_block_wins() {
        let lines = extract_trace_lines(CAPTURE).unwrap();
        assert_eq!(
            lines,
            vec![
                "app-1 (1) [000] ...1 1.000000: tracing_mark_write: B|1|first",
                "app-1 (1) [001] ...1 2.000000: tracing_mark_write: E|1",
            ]
        );
    }

    #[test]
    fn test_span_without_script_blocks() {
        let text = "BEGIN TRACE\n a-1 (1) [0] . 1.5: x: y\n\n# c\nEND TRACE";
        assert_eq!(extract_trace_lines(text).unwrap(), vec!["a-1 (1) [0] . 1.5: x: y"]);
    }

    #[test]
    fn test_missing_markers() {
        assert!(matches!(
            extract_trace_lines("<html>no trace</html>"),
            Err(ReportError::TraceMarkersMissing)
        ));
        assert!(matches!(
            extract_trace_lines("<!-- BEGIN TRACE --> but never closed"),
            Err(ReportError::TraceMarkersMissing)
        ));
    }

    #[test]
    fn test_read_trace_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture_trace.html");
        std::fs::write(&path, CAPTURE).unwrap();
        assert_eq!(read_trace_lines(&path).unwrap().len(), 2);
    }
}
