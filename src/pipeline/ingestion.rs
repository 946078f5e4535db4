//! Report ingestion pipeline.
//!
//! Runs each report through the full workflow:
//! 1. Trace merge, when a companion `<stem>_trace.html` capture exists
//! 2. Canonical renaming (optional), carrying the capture along
//! 3. Loading and build-info homologation
//! 4. Suite partitioning
//! 5. Handler dispatch
//!
//! A file that fails is recorded and the run moves on to the next one.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{ReportError, Result};
use crate::logging::structured::LogContext;
use crate::report::loader::load_report;
use crate::report::writer::normalize_report_name;
use crate::routing::registry::DispatchReport;
use crate::suite::partition::{partition_suites, SuiteSet};
use crate::systrace::merge::{merge_systrace, MergeSummary};

use super::context::RunContext;

/// Suffix of the trace capture recorded alongside a report.
pub const TRACE_CAPTURE_SUFFIX: &str = "_trace.html";

/// Outcome of the trace merge step for one report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceMergeOutcome {
    NoCapture,
    Merged(MergeSummary),
    /// The capture had no sync marker; the report was left untouched.
    ClockSyncMissing,
}

/// A report that went through the whole pipeline.
#[derive(Debug)]
pub struct ProcessedReport {
    /// Final location, after any rename.
    pub path: PathBuf,
    pub trace: TraceMergeOutcome,
    pub suites: SuiteSet,
    pub dispatch: DispatchReport,
}

/// A report that failed.
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub code: &'static str,
    pub reason: String,
    /// SHA-256 of the file contents, when the file was readable.
    pub content_hash: Option<String>,
}

/// Result of processing a set of reports.
#[derive(Debug)]
pub struct RunResult {
    pub received_count: usize,
    pub accepted_count: usize,
    pub rejected_count: usize,
    pub reports: Vec<ProcessedReport>,
    pub failures: Vec<FileFailure>,
}

/// `<dir>/<stem>_trace.html` for `<dir>/<stem>.json`.
pub fn companion_trace_path(report: &Path) -> PathBuf {
    let stem = report
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    report.with_file_name(format!("{}{}", stem, TRACE_CAPTURE_SUFFIX))
}

/// Compute SHA256 hash of content.
pub fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Process a set of reports.
///
/// Main entry point for a run. Every path is attempted.
pub fn process_reports(run: &RunContext, paths: &[PathBuf]) -> RunResult {
    let ctx = run.log_context();
    let mut reports = Vec::new();
    let mut failures = Vec::new();

    for path in paths {
        match process_report(run, path) {
            Ok(report) => reports.push(report),
            Err(e) => {
                let failure = FileFailure {
                    path: path.clone(),
                    code: e.code(),
                    reason: e.to_string(),
                    content_hash: fs::read(path).ok().map(|bytes| compute_hash(&bytes)),
                };
                log::warn!(
                    "{} REPORT_FAILED code={} reason={}",
                    ctx.with_report(path),
                    failure.code,
                    failure.reason
                );
                failures.push(failure);
            }
        }
    }

    log::info!(
        "{} RUN_COMPLETE received={} accepted={} rejected={}",
        ctx,
        paths.len(),
        reports.len(),
        failures.len()
    );

    RunResult {
        received_count: paths.len(),
        accepted_count: reports.len(),
        rejected_count: failures.len(),
        reports,
        failures,
    }
}

/// Process a single report.
pub fn process_report(run: &RunContext, path: &Path) -> Result<ProcessedReport> {
    let ctx = run.log_context().with_report(path);
    log::debug!("{} REPORT_PROCESS_START", ctx);

    let trace = merge_companion_trace(run, path, &ctx)?;

    let path = if run.config.normalize_names {
        let renamed = normalize_report_name(path, &run.registry, &ctx)?;
        if renamed != path {
            move_companion_trace(path, &renamed, &ctx)?;
        }
        renamed
    } else {
        path.to_path_buf()
    };
    let ctx = ctx.with_report(&path);

    let (build, data) = load_report(&path, &run.registry, &ctx)?;
    let suites = partition_suites(build, data, &path, &ctx);
    let dispatch = run.handlers.dispatch(&suites, &ctx);

    log::info!(
        "{} REPORT_COMPLETE suites={} handled={} unhandled={}",
        ctx,
        suites.len(),
        dispatch.handled.len(),
        dispatch.unhandled.len()
    );

    Ok(ProcessedReport {
        path,
        trace,
        suites,
        dispatch,
    })
}

/// Rename the capture of `from` so it stays next to the report at `to`.
/// An existing capture at the destination is never replaced.
fn move_companion_trace(from: &Path, to: &Path, ctx: &LogContext) -> Result<()> {
    let capture = companion_trace_path(from);
    if !capture.is_file() {
        return Ok(());
    }

    let target = companion_trace_path(to);
    if target.exists() {
        log::warn!(
            "{} TRACE_RENAME_SKIPPED from={} to={} reason=target_exists",
            ctx,
            capture.display(),
            target.display()
        );
        return Ok(());
    }

    fs::rename(&capture, &target)?;
    log::info!("{} TRACE_RENAMED to={}", ctx, target.display());
    Ok(())
}

fn merge_companion_trace(run: &RunContext, path: &Path, ctx: &LogContext) -> Result<TraceMergeOutcome> {
    let capture = companion_trace_path(path);
    if !capture.is_file() {
        return Ok(TraceMergeOutcome::NoCapture);
    }

    match merge_systrace(path, &capture, &run.config.merge_options(), &run.registry, ctx) {
        Ok(summary) => Ok(TraceMergeOutcome::Merged(summary)),
        Err(ReportError::ClockSyncMissing) => Ok(TraceMergeOutcome::ClockSyncMissing),
        Err(e) => Err(e),
    }
}
