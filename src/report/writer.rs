//! Report writing and file-name normalization.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use crate::device::DeviceRegistry;
use crate::error::Result;
use crate::logging::structured::LogContext;
use crate::report::build_info::BuildInfo;
use crate::report::datum::Datum;
use crate::report::loader::load_report;

lazy_static! {
    static ref NORMALIZED_NAME: Regex =
        Regex::new(r"^([^_]+)_(.+)_(\d+)_report(?:\((\d+)\))?\.json$").unwrap();
}

/// Write `build` as line 0 and each datum as one following line, in the
/// order given.
///
/// Output goes to a sibling temp file that is renamed over `path`, so a
/// failed write never leaves a truncated report behind.
pub fn save_report(path: &Path, build: &BuildInfo, data: &[Datum]) -> Result<()> {
    let tmp = temp_sibling(path);

    let result = write_lines(&tmp, build, data);
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, path)?;
    Ok(())
}

fn write_lines(path: &Path, build: &BuildInfo, data: &[Datum]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);

    serde_json::to_writer(&mut out, build).map_err(std::io::Error::from)?;
    out.write_all(b"\n")?;

    for datum in data {
        serde_json::to_writer(&mut out, datum).map_err(std::io::Error::from)?;
        out.write_all(b"\n")?;
    }

    out.flush()?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// `<Brand>_<Model>_<sdk>_report.json`, spaces replaced with underscores.
pub fn canonical_report_name(build: &BuildInfo) -> String {
    let (brand, model) = build.display_brand_model();
    format!("{}_{}_{}_report.json", brand, model, build.sdk_label()).replace(' ', "_")
}

/// Rename `path` to its canonical name in the same directory.
///
/// If the canonical name is taken, `(2)`, `(3)`, ... is appended before the
/// extension until a free name is found; existing files are never
/// overwritten. A file that already carries its canonical name stays put.
pub fn normalize_report_name(
    path: &Path,
    registry: &DeviceRegistry,
    ctx: &LogContext,
) -> Result<PathBuf> {
    let (build, _) = load_report(path, registry, ctx)?;
    let canonical = canonical_report_name(&build);

    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let stem = canonical.trim_end_matches(".json");

    let mut target = dir.join(&canonical);
    let mut n = 2;
    while target.exists() {
        if target == path {
            return Ok(path.to_path_buf());
        }
        target = dir.join(format!("{}({}).json", stem, n));
        n += 1;
    }

    fs::rename(path, &target)?;
    log::info!(
        "{} REPORT_RENAMED to={}",
        ctx.with_report(path),
        target.display()
    );
    Ok(target)
}

/// Parsed form of a normalized report name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedName {
    pub brand: String,
    pub model: String,
    pub sdk: u32,
    /// Collision suffix; `None` for the first report of a device.
    pub copy: Option<u32>,
}

/// Recover brand, model and SDK from a normalized report file name.
///
/// Brand is taken up to the first underscore, so multi-word brands come back
/// with their remaining words in `model`.
pub fn parse_normalized_name(file_name: &str) -> Option<NormalizedName> {
    let caps = NORMALIZED_NAME.captures(file_name)?;
    Some(NormalizedName {
        brand: caps[1].to_string(),
        model: caps[2].replace('_', " "),
        sdk: caps[3].parse().ok()?,
        copy: caps.get(4).and_then(|m| m.as_str().parse().ok()),
    })
}
