//! Run context and configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::device::registry::DeviceRegistry;
use crate::error::{ReportError, Result};
use crate::logging::structured::LogContext;
use crate::routing::registry::HandlerRegistry;
use crate::systrace::clock::DEFAULT_CLOCK_SYNC_MARKER;
use crate::systrace::merge::MergeOptions;

/// Pipeline settings, loadable from JSON. Missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Trace lines containing any of these are merged.
    pub systrace_keywords: Vec<String>,
    /// Used when no keywords are set.
    pub systrace_pattern: Option<String>,
    pub clock_sync_marker: String,
    /// Rename reports to `<Brand>_<Model>_<sdk>_report.json`.
    pub normalize_names: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            systrace_keywords: Vec::new(),
            systrace_pattern: None,
            clock_sync_marker: DEFAULT_CLOCK_SYNC_MARKER.to_string(),
            normalize_names: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(ReportError::Config)
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            keywords: self.systrace_keywords.clone(),
            pattern: self.systrace_pattern.clone(),
            clock_sync_marker: self.clock_sync_marker.clone(),
        }
    }
}

/// State for one processing run.
///
/// Owns the device registry, so devices learned from one report homologate
/// the reports processed after it.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub config: PipelineConfig,
    pub registry: DeviceRegistry,
    pub handlers: HandlerRegistry,
}

impl RunContext {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_registry(config, DeviceRegistry::new())
    }

    pub fn with_registry(config: PipelineConfig, registry: DeviceRegistry) -> Self {
        let run_id = format!("run-{}", &Uuid::new_v4().to_string()[..8]);
        Self {
            run_id,
            started_at: Utc::now(),
            config,
            registry,
            handlers: HandlerRegistry::standard(),
        }
    }

    pub fn log_context(&self) -> LogContext {
        LogContext::new(&self.run_id)
    }
}
