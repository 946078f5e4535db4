//! Per-suite analysis state.
//!
//! A handler is built once for a suite, when routing binds it, and keeps
//! whatever it derived from the suite's records. `summary()` renders that
//! state as one line of text.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde_json::Value;

use crate::extraction::{value_to_float, value_to_string};
use crate::report::datum::Datum;
use crate::suite::model::Suite;

const NS_PER_S: f64 = 1_000_000_000.0;
const NS_PER_MS: f64 = 1_000_000.0;

/// Every handler type, in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    CalculateWaitPi,
    Cpuset,
    EglPresentationTime,
    MarchingCubes,
    FillRate,
    TextureLoading,
    ChoreographerTimestamps,
    MemoryAccess,
}

impl HandlerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::CalculateWaitPi => "calculate_wait_pi",
            HandlerKind::Cpuset => "cpuset",
            HandlerKind::EglPresentationTime => "egl_presentation_time",
            HandlerKind::MarchingCubes => "marching_cubes",
            HandlerKind::FillRate => "fill_rate",
            HandlerKind::TextureLoading => "texture_loading",
            HandlerKind::ChoreographerTimestamps => "choreographer_timestamps",
            HandlerKind::MemoryAccess => "memory_access",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Analysis state bound to a suite.
#[derive(Debug, Clone, PartialEq)]
pub enum SuiteHandler {
    CalculateWaitPi(CalculateWaitPi),
    Cpuset(Cpuset),
    EglPresentationTime(EglPresentationTime),
    MarchingCubes(MarchingCubes),
    FillRate(FillRate),
    TextureLoading(TextureLoading),
    ChoreographerTimestamps(ChoreographerTimestamps),
    MemoryAccess(MemoryAccess),
}

impl SuiteHandler {
    pub fn kind(&self) -> HandlerKind {
        match self {
            SuiteHandler::CalculateWaitPi(_) => HandlerKind::CalculateWaitPi,
            SuiteHandler::Cpuset(_) => HandlerKind::Cpuset,
            SuiteHandler::EglPresentationTime(_) => HandlerKind::EglPresentationTime,
            SuiteHandler::MarchingCubes(_) => HandlerKind::MarchingCubes,
            SuiteHandler::FillRate(_) => HandlerKind::FillRate,
            SuiteHandler::TextureLoading(_) => HandlerKind::TextureLoading,
            SuiteHandler::ChoreographerTimestamps(_) => HandlerKind::ChoreographerTimestamps,
            SuiteHandler::MemoryAccess(_) => HandlerKind::MemoryAccess,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            SuiteHandler::CalculateWaitPi(h) => h.summary(),
            SuiteHandler::Cpuset(h) => h.summary(),
            SuiteHandler::EglPresentationTime(h) => h.summary(),
            SuiteHandler::MarchingCubes(h) => h.summary(),
            SuiteHandler::FillRate(h) => h.summary(),
            SuiteHandler::TextureLoading(h) => h.summary(),
            SuiteHandler::ChoreographerTimestamps(h) => h.summary(),
            SuiteHandler::MemoryAccess(h) => h.summary(),
        }
    }
}

fn flag(datum: &Datum, path: &str) -> bool {
    match datum.custom_field(path) {
        Some(Value::Bool(b)) => *b,
        Some(v) => value_to_float(v).map(|f| f != 0.0).unwrap_or(false),
        None => false,
    }
}

fn text(datum: &Datum, path: &str) -> Option<String> {
    datum.custom_field(path).map(value_to_string)
}

fn span_seconds(data: &[Datum]) -> f64 {
    match (data.first(), data.last()) {
        (Some(first), Some(last)) => (last.timestamp() - first.timestamp()) as f64 / NS_PER_S,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
}

impl Stats {
    pub fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

impl FromIterator<f64> for Stats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = Stats::default();
        for v in iter {
            stats.push(v);
        }
        stats
    }
}

/// Pi calculation and wait test. The first record carries run parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculateWaitPi {
    pub wait_method: String,
    pub affinity: bool,
    pub iterations_by_thread: BTreeMap<String, Vec<f64>>,
    pub max_iterations: f64,
    pub temperatures_c: Vec<f64>,
    pub duration_s: f64,
}

impl CalculateWaitPi {
    pub fn from_suite(suite: &Suite) -> Self {
        let data = suite.data();
        let (wait_method, affinity) = data
            .first()
            .map(|d| (text(d, "wait_method").unwrap_or_default(), flag(d, "affinity")))
            .unwrap_or_default();

        let mut iterations_by_thread: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut temperatures_c = Vec::new();
        let mut max_iterations = 0.0_f64;
        for datum in data.iter().skip(1) {
            match datum.operation_id() {
                "CalculateWaitPIOperation" => {
                    let iterations = datum.custom_field_numeric("iterations").unwrap_or(0.0);
                    max_iterations = max_iterations.max(iterations);
                    iterations_by_thread
                        .entry(datum.thread_id().to_string())
                        .or_default()
                        .push(iterations);
                }
                "MonitorOperation" => {
                    if let Some(t) = datum.custom_field_numeric("temperature_info.max_cpu_temperature") {
                        temperatures_c.push(t / 1000.0);
                    }
                }
                _ => {}
            }
        }

        Self {
            wait_method,
            affinity,
            iterations_by_thread,
            max_iterations,
            temperatures_c,
            duration_s: span_seconds(data),
        }
    }

    pub fn summary(&self) -> String {
        let peak = self
            .temperatures_c
            .iter()
            .copied()
            .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.max(t))));
        let mut out = format!(
            "{} ({} affinity): {} threads, max {} iterations over {:.2}s",
            self.wait_method,
            if self.affinity { "with" } else { "without" },
            self.iterations_by_thread.len(),
            self.max_iterations,
            self.duration_s
        );
        if let Some(peak) = peak {
            out.push_str(&format!(", peak temperature {:.1}C", peak));
        }
        out
    }
}

/// CPU affinity test.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cpuset {
    pub bigger_cores_first: Option<bool>,
    pub setup_total: usize,
    pub setup_errors: usize,
    pub affinity_kept: usize,
    pub affinity_lost: usize,
}

impl Cpuset {
    pub fn from_suite(suite: &Suite) -> Self {
        let mut state = Self::default();
        for datum in suite.data() {
            if datum.operation_id() != "SaneCpusetOperation" {
                continue;
            }
            match text(datum, "stage").as_deref() {
                Some("Thread setup") => {
                    state.setup_total += 1;
                    if !flag(datum, "cpuset_enabled") {
                        state.setup_errors += 1;
                    }
                }
                Some("Thread in progress") => {
                    if flag(datum, "is_core_among_affine") {
                        state.affinity_kept += 1;
                    } else {
                        state.affinity_lost += 1;
                    }
                }
                Some("Test summary") => {
                    state.bigger_cores_first = Some(flag(datum, "bigger_cores_first"));
                }
                _ => {}
            }
        }
        state
    }

    pub fn summary(&self) -> String {
        let sanity = match self.bigger_cores_first {
            Some(true) => "Cores are numbered from big to LITTLE.",
            Some(false) => "Cores are not numbered from big to LITTLE.",
            None => "Core numbering was not reported.",
        };

        let cpuset = if self.setup_total == 0 {
            "No data collected about CPUSET affinity setup.".to_string()
        } else if self.setup_errors == 0 {
            if self.affinity_lost > 0 {
                "CPUSET is enabled but, at times, affinity wasn't kept.".to_string()
            } else {
                "CPUSET is enabled, and affinity was kept at all times.".to_string()
            }
        } else if self.setup_errors == self.setup_total {
            "CPUSET isn't enabled, as all affinity schedules failed.".to_string()
        } else {
            "CPUSET seems enabled, but some affinity schedules failed.".to_string()
        };

        format!("{} {}", sanity, cpuset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationResult {
    Success,
    Failure,
    Inconclusive,
    Unavailable,
}

/// Presentation time extension test.
#[derive(Debug, Clone, PartialEq)]
pub struct EglPresentationTime {
    pub availability: PresentationResult,
    pub successes: usize,
    pub failures: usize,
    pub inconclusive: usize,
    pub duplicate_frame_ids: bool,
    pub issues: Vec<String>,
}

const PRESENTATION_REQUIRED: [&str; 2] = ["ext_egl_android_presentation_time", "pfn_presentation_time_android"];
const PRESENTATION_SUPPORTING: [&str; 6] = [
    "ext_egl_android_get_frame_timestamps",
    "pfn_get_next_frame_id",
    "pfn_get_frame_timestamps",
    "pfn_get_frame_timestamp_supported",
    "request_timestamp_supported",
    "present_timestamp_supported",
];

impl EglPresentationTime {
    pub fn from_suite(suite: &Suite) -> Self {
        let mut availability_datum = None;
        let mut rows = Vec::new();
        for datum in suite.data() {
            if datum.has_custom_key("requested") && datum.has_custom_key("reported") {
                rows.push(datum);
            } else if datum.has_custom_key("ext_egl_android_presentation_time") {
                availability_datum = Some(datum);
            }
        }

        let availability = match availability_datum {
            None => PresentationResult::Unavailable,
            Some(d) if !PRESENTATION_REQUIRED.iter().all(|k| flag(d, k)) => PresentationResult::Unavailable,
            Some(d) if !PRESENTATION_SUPPORTING.iter().all(|k| flag(d, k)) => PresentationResult::Inconclusive,
            Some(d) if !flag(d, "enabled_surface_timestamps") => PresentationResult::Failure,
            Some(_) => PresentationResult::Success,
        };

        let mut state = Self {
            availability,
            successes: 0,
            failures: 0,
            inconclusive: 0,
            duplicate_frame_ids: false,
            issues: Vec::new(),
        };
        if availability != PresentationResult::Success {
            return state;
        }

        let mut frame_ids = HashSet::new();
        for row in rows {
            let frame_id = text(row, "frame_id").unwrap_or_default();
            if !frame_ids.insert(frame_id.clone()) {
                state.duplicate_frame_ids = true;
            }
            match Self::evaluate_row(row, &frame_id) {
                (PresentationResult::Success, _) => state.successes += 1,
                (PresentationResult::Failure, msg) => {
                    state.failures += 1;
                    state.issues.extend(msg);
                }
                _ => state.inconclusive += 1,
            }
        }
        state
    }

    fn evaluate_row(row: &Datum, frame_id: &str) -> (PresentationResult, Option<String>) {
        if !flag(row, "requested.set") || !flag(row, "reported.requested.set") || !flag(row, "reported.actual.set") {
            return (PresentationResult::Inconclusive, None);
        }
        let requested = row.custom_field_numeric("requested.time").unwrap_or(0.0);
        let reported_requested = row.custom_field_numeric("reported.requested.time").unwrap_or(0.0);
        let reported_actual = row.custom_field_numeric("reported.actual.time").unwrap_or(0.0);

        if requested != reported_requested {
            return (
                PresentationResult::Failure,
                Some(format!(
                    "frame {} reported requested time {} but {} was set",
                    frame_id, reported_requested, requested
                )),
            );
        }
        if reported_actual < reported_requested {
            return (
                PresentationResult::Failure,
                Some(format!(
                    "frame {} presented at {} before requested {}",
                    frame_id, reported_actual, reported_requested
                )),
            );
        }
        (PresentationResult::Success, None)
    }

    pub fn result(&self) -> PresentationResult {
        if self.availability == PresentationResult::Success && self.failures > 0 {
            PresentationResult::Failure
        } else {
            self.availability
        }
    }

    pub fn summary(&self) -> String {
        match self.availability {
            PresentationResult::Unavailable => "Extension unavailable.".to_string(),
            PresentationResult::Inconclusive => {
                "Supporting extension EGL_ANDROID_get_frame_timestamps was not available.".to_string()
            }
            PresentationResult::Failure => "Surface timestamps could not be enabled.".to_string(),
            PresentationResult::Success => {
                let mut out = format!(
                    "{} successful, {} failed, {} inconclusive.",
                    self.successes, self.failures, self.inconclusive
                );
                if self.duplicate_frame_ids {
                    out.push_str(" One or more duplicate frame ids.");
                }
                out
            }
        }
    }
}

/// Marching cubes permutations: voxels per second by thread setup and pinning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarchingCubes {
    pub floating: BTreeMap<String, Stats>,
    pub pinned: BTreeMap<String, Stats>,
}

const MC_RESULTS: &str = "marching_cubes_permutation_results";

impl MarchingCubes {
    pub fn from_suite(suite: &Suite) -> Self {
        let mut state = Self::default();
        for datum in suite.data_for_operation("MarchingCubesGLES3Operation") {
            let Some(vps) = Self::voxels_per_second(datum) else {
                continue;
            };
            let setup = text(datum, &format!("{}.configuration.thread_setup", MC_RESULTS))
                .unwrap_or_else(|| "One".to_string());
            let bucket = if flag(datum, &format!("{}.configuration.pinned", MC_RESULTS)) {
                &mut state.pinned
            } else {
                &mut state.floating
            };
            bucket.entry(setup).or_default().push(vps);
        }
        state
    }

    fn voxels_per_second(datum: &Datum) -> Option<f64> {
        let voxels = datum.custom_field_numeric(&format!("{}.num_voxels_marched_per_iteration", MC_RESULTS))?;
        let duration_s = datum.custom_field_numeric(&format!("{}.average_calc_duration", MC_RESULTS))? / NS_PER_S;
        (duration_s > 0.0).then(|| voxels / duration_s)
    }

    pub fn summary(&self) -> String {
        let render = |label: &str, map: &BTreeMap<String, Stats>| {
            let parts: Vec<String> = map
                .iter()
                .map(|(setup, s)| format!("{} {:.0}..{:.0}", setup, s.min, s.max))
                .collect();
            format!("{}: {}", label, if parts.is_empty() { "none".to_string() } else { parts.join(", ") })
        };
        format!(
            "voxels/s {}; {}",
            render("floating", &self.floating),
            render("pinned", &self.pinned)
        )
    }
}

/// GPU fill rate test.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillRate {
    pub pixels_per_second: Stats,
    pub fps: Stats,
    pub duration_s: f64,
}

impl FillRate {
    pub fn from_suite(suite: &Suite) -> Self {
        let pixels_per_second = suite
            .data_for_operation("FillRateGLES3Operation")
            .filter_map(|d| d.custom_field_numeric("fill_rate.pixels_per_second"))
            .collect();
        let fps = suite
            .data_for_operation("MonitorOperation")
            .filter_map(|d| d.custom_field_numeric("perf_info.fps"))
            .collect();
        Self {
            pixels_per_second,
            fps,
            duration_s: span_seconds(suite.data()),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} fill rate samples, mean {:.0} pixels/s; mean fps {:.1} over {:.2}s",
            self.pixels_per_second.count,
            self.pixels_per_second.mean().unwrap_or(0.0),
            self.fps.mean().unwrap_or(0.0),
            self.duration_s
        )
    }
}

/// Texture loading totals per texture format, grouped by channel composition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureLoading {
    pub compositions: BTreeMap<String, TextureComposition>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextureComposition {
    pub formats: BTreeMap<String, TextureTotals>,
    pub missing_formats: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextureTotals {
    pub size_at_rest: f64,
    pub size_in_memory: f64,
    pub loading_time: f64,
    pub gpu_transfer_time: f64,
}

impl TextureComposition {
    fn apply(&mut self, event_type: &str, datum: &Datum) {
        let format = text(datum, "texture.format").unwrap_or_default();
        if self.missing_formats.contains(&format) {
            return;
        }
        let field = |path: &str| datum.custom_field_numeric(path).unwrap_or(0.0);
        match event_type {
            "TEXTURE_LOAD_END" => {
                let totals = self.formats.entry(format).or_default();
                totals.size_at_rest += field("size_at_rest");
                totals.size_in_memory += field("size_in_memory");
                totals.loading_time += field("loading_time");
            }
            "TEXTURE_GPU_TRANSFER" => {
                self.formats.entry(format).or_default().gpu_transfer_time += field("gpu_trx_time");
            }
            "TEXTURE_LOAD_FAILURE" => {
                self.formats.remove(&format);
                self.missing_formats.push(format);
            }
            _ => {}
        }
    }
}

impl TextureLoading {
    pub fn from_suite(suite: &Suite) -> Self {
        let mut state = Self::default();
        for datum in suite.data_for_operation("TextureLoadingGLES3Operation") {
            let Some(event_type) = text(datum, "event_type") else {
                continue;
            };
            if !matches!(
                event_type.as_str(),
                "TEXTURE_LOAD_END" | "TEXTURE_LOAD_FAILURE" | "TEXTURE_GPU_TRANSFER"
            ) {
                continue;
            }
            let channels = text(datum, "texture.channels").unwrap_or_default();
            state.compositions.entry(channels).or_default().apply(&event_type, datum);
        }
        state
    }

    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .compositions
            .iter()
            .map(|(channels, c)| {
                format!(
                    "{}: {} formats, {} missing",
                    channels,
                    c.formats.len(),
                    c.missing_formats.len()
                )
            })
            .collect();
        if parts.is_empty() {
            "No texture loading events.".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// Choreographer vs. EGL present timestamps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoreographerTimestamps {
    pub has_post_frame_callback: bool,
    pub has_egl_extension: bool,
    pub choreographer_timestamps: Vec<i64>,
    pub egl_frame_timestamps: Vec<i64>,
    pub missed_frame_ids: Vec<String>,
    pub variance_ms: Vec<f64>,
}

/// Allowed distance between a choreographer timestamp and the nearest present.
pub const CHOREOGRAPHER_VARIANCE_BOUND_MS: f64 = 3.0;

fn nearest(sorted: &[i64], target: i64) -> Option<i64> {
    let i = sorted.partition_point(|&v| v < target);
    let after = sorted.get(i).copied();
    let before = i.checked_sub(1).and_then(|j| sorted.get(j).copied());
    match (before, after) {
        (Some(b), Some(a)) => Some(if (target - b).abs() <= (a - target).abs() { b } else { a }),
        (b, a) => b.or(a),
    }
}

impl ChoreographerTimestamps {
    pub fn from_suite(suite: &Suite) -> Self {
        let mut state = Self::default();
        for datum in suite.data() {
            if datum.has_custom_key("has_extension") {
                state.has_egl_extension = flag(datum, "has_extension");
                state.has_post_frame_callback = flag(datum, "has_fp_post_frame_callback");
            } else if let Some(ts) = datum.custom_field("choreographer_timestamp_ns") {
                if let Some(ts) = value_to_float(ts) {
                    state.choreographer_timestamps.push(ts as i64);
                }
            } else if let Some(ts) = datum.custom_field("egl_frame_timestamp_ns") {
                if flag(datum, "success") {
                    if let Some(ts) = value_to_float(ts) {
                        state.egl_frame_timestamps.push(ts as i64);
                    }
                } else {
                    state
                        .missed_frame_ids
                        .push(text(datum, "frame_id").unwrap_or_default());
                }
            }
        }

        let mut sorted = state.egl_frame_timestamps.clone();
        sorted.sort_unstable();
        state.variance_ms = state
            .choreographer_timestamps
            .iter()
            .filter_map(|&ts| nearest(&sorted, ts).map(|egl| (egl - ts) as f64 / NS_PER_MS))
            .collect();
        state
    }

    pub fn passed(&self) -> bool {
        self.has_post_frame_callback
            && self
                .variance_ms
                .iter()
                .all(|v| v.abs() <= CHOREOGRAPHER_VARIANCE_BOUND_MS)
    }

    pub fn summary(&self) -> String {
        if !self.has_post_frame_callback {
            return "Missing function pointer for Choreographer postFrameCallback.".to_string();
        }
        format!(
            "{}: {} frames compared, {} missed",
            if self.passed() { "PASS" } else { "FAIL" },
            self.variance_ms.len(),
            self.missed_frame_ids.len()
        )
    }
}

/// Memory access single core comparison: bytes over time per cpu.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryAccess {
    pub by_cpu: BTreeMap<u32, MemoryThroughput>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryThroughput {
    pub bytes: f64,
    pub time_ns: f64,
}

impl MemoryThroughput {
    pub fn bytes_per_second(&self) -> Option<f64> {
        (self.time_ns > 0.0).then(|| self.bytes / (self.time_ns / NS_PER_S))
    }
}

impl MemoryAccess {
    pub fn from_suite(suite: &Suite) -> Self {
        let mut state = Self::default();
        for cpu in suite.cpu_ids() {
            let mut throughput = MemoryThroughput::default();
            for datum in suite.data_for_cpu(cpu) {
                // "time": "<n> nanoseconds", "bytes": "<n> bytes"
                let bytes = datum
                    .custom_field("bytes")
                    .and_then(|v| value_to_string(v).trim_end_matches(" bytes").trim().parse::<f64>().ok());
                let time = datum.custom_field_numeric("time");
                if let (Some(bytes), Some(time)) = (bytes, time) {
                    throughput.bytes += bytes;
                    throughput.time_ns += time;
                }
            }
            if throughput.time_ns > 0.0 {
                state.by_cpu.insert(cpu, throughput);
            }
        }
        state
    }

    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .by_cpu
            .iter()
            .filter_map(|(cpu, t)| t.bytes_per_second().map(|bps| format!("cpu{} {:.0} B/s", cpu, bps)))
            .collect();
        if parts.is_empty() {
            "No memory access samples.".to_string()
        } else {
            parts.join(", ")
        }
    }
}
