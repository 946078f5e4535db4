//! Structured logging utilities.
//!
//! Provides context-aware logging with run_id, report file and suite name
//! included in every log message.

use std::fmt;
use std::path::Path;

/// Logging context for a processing run.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub report: Option<String>,
    pub suite: Option<String>,
}

impl LogContext {
    pub fn new(run_id: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            report: None,
            suite: None,
        }
    }

    /// Context for work on a single report file. Only the file name is kept.
    pub fn with_report(&self, report: &Path) -> Self {
        let name = report
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| report.display().to_string());
        Self {
            run_id: self.run_id.clone(),
            report: Some(name),
            suite: None,
        }
    }

    pub fn with_suite(&self, suite: &str) -> Self {
        Self {
            run_id: self.run_id.clone(),
            report: self.report.clone(),
            suite: Some(suite.to_string()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[run={}]", self.run_id)?;
        if let Some(report) = &self.report {
            write!(f, " [report={}]", report)?;
        }
        if let Some(suite) = &self.suite {
            write!(f, " [suite={}]", suite)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_context_display() {
        let ctx = LogContext::new("run-123");
        assert_eq!(format!("{}", ctx), "[run=run-123]");

        let ctx_with_report = ctx.with_report(Path::new("/tmp/out/blueline-29-x.json"));
        assert_eq!(
            format!("{}", ctx_with_report),
            "[run=run-123] [report=blueline-29-x.json]"
        );

        let ctx_with_suite = ctx_with_report.with_suite("Affinity Test");
        assert_eq!(
            format!("{}", ctx_with_suite),
            "[run=run-123] [report=blueline-29-x.json] [suite=Affinity Test]"
        );
    }
}
