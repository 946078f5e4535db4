//! Report loading.
//!
//! Reads a line-delimited report: line 0 is build info, every later line is
//! one [`Datum`]. A line that is not valid JSON, or not a valid event
//! record, fails the whole file; nothing is skipped or retried.
//!
//! A JSON object on line 0 is kept whole. When it does not name a device,
//! the missing identity keys are homologated from the file name
//! (`<codename>-<sdk>-<suffix>.json`) and the device registry; keys already
//! present are never replaced. When line 0 is blank or not an object, build
//! info is synthesized the same way, falling back to `Unknown` placeholders.
//! Only line 0 may be blank.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::device::DeviceRegistry;
use crate::error::{ReportError, Result};
use crate::logging::structured::LogContext;
use crate::report::build_info::{BuildInfo, UNKNOWN};
use crate::report::datum::Datum;

lazy_static! {
    /// Harness output names: `<codename>-<sdk>-<suffix>`.
    static ref DEVICE_FILE_NAME: Regex = Regex::new(r"^(.+)-(\d+)-.+$").unwrap();
}

/// Load `path`, returning its build info and records in file order.
///
/// Build info that fully identifies a device registers it in `registry`, so
/// later reports from the same device without build info can borrow its
/// brand and model.
pub fn load_report(
    path: &Path,
    registry: &DeviceRegistry,
    ctx: &LogContext,
) -> Result<(BuildInfo, Vec<Datum>)> {
    let ctx = ctx.with_report(path);
    let reader = BufReader::new(File::open(path)?);

    let mut build: Option<BuildInfo> = None;
    let mut data = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;

        if index == 0 && line.trim().is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(&line).map_err(|source| ReportError::Json {
            path: path.to_path_buf(),
            line: line_no,
            source,
        })?;

        if index == 0 {
            build = BuildInfo::from_value(value);
            if build.is_none() {
                log::warn!("{} BUILD_INFO_MALFORMED line=1", ctx);
            }
            continue;
        }

        let datum: Datum =
            serde_json::from_value(value).map_err(|e| ReportError::InvalidRecord {
                line: line_no,
                reason: e.to_string(),
            })?;
        data.push(datum);
    }

    let build = match build {
        Some(build) => resolve_build(build, path, registry, &ctx),
        None => homologate_from_file_name(path, registry, &ctx),
    };

    log::info!(
        "{} REPORT_LOADED records={} device={} sdk={}",
        ctx,
        data.len(),
        build.codename().unwrap_or_else(|| UNKNOWN.to_string()),
        build.sdk_label()
    );

    Ok((build, data))
}

/// Register a fully identified device, or fill gaps from the file name and
/// the registry.
fn resolve_build(
    build: BuildInfo,
    path: &Path,
    registry: &DeviceRegistry,
    ctx: &LogContext,
) -> BuildInfo {
    if let Some(device) = build.device_info() {
        if registry.push(device) {
            log::info!(
                "{} DEVICE_REGISTERED codename={}",
                ctx,
                build.codename().unwrap_or_default()
            );
        }
        return build;
    }

    let build = match build.codename() {
        Some(_) => build,
        None => match file_name_identity(path) {
            Some((codename, sdk)) => {
                log::info!(
                    "{} BUILD_INFO_HOMOLOGATED source=file_name codename={} sdk={}",
                    ctx,
                    codename,
                    sdk
                );
                build.filled_from(&BuildInfo::identity(&codename, &sdk))
            }
            None => {
                log::warn!("{} BUILD_INFO_UNIDENTIFIED reason=unrecognized_file_name", ctx);
                return build;
            }
        },
    };

    match build.codename().and_then(|c| registry.get(&c)) {
        Some(device) => {
            log::info!(
                "{} BUILD_INFO_HOMOLOGATED source=registry codename={}",
                ctx,
                device.codename()
            );
            build.homologated(&device)
        }
        None => build,
    }
}

/// `(codename, sdk)` from a harness output name.
fn file_name_identity(path: &Path) -> Option<(String, String)> {
    let file_name = path.file_name()?.to_string_lossy();
    let caps = DEVICE_FILE_NAME.captures(&file_name)?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

fn homologate_from_file_name(path: &Path, registry: &DeviceRegistry, ctx: &LogContext) -> BuildInfo {
    let Some((codename, sdk)) = file_name_identity(path) else {
        log::warn!(
            "{} BUILD_INFO_HOMOLOGATED source=placeholder reason=unrecognized_file_name",
            ctx
        );
        return BuildInfo::synthesized(UNKNOWN, "00", None);
    };

    let device = registry.get(&codename);

    log::info!(
        "{} BUILD_INFO_HOMOLOGATED source={} codename={} sdk={}",
        ctx,
        if device.is_some() { "registry" } else { "file_name" },
        codename,
        sdk
    );

    BuildInfo::synthesized(&codename, &sdk, device.as_ref())
}
