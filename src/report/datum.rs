//! Event records.
//!
//! A [`Datum`] is one line of a report after line 0. Its free-form `custom`
//! payload is flattened once at construction so fields can be looked up by
//! dotted path, e.g. `fill_rate.pixels_per_second`.
//!
//! `thread_id` is always held as text. Producers that wrote it as a number
//! (`664`) load fine, but a report written back, for example by an in-place
//! trace merge, carries it as a string (`"664"`). Equality is unaffected.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::extraction::{flatten_to_map, value_to_float};

/// Issue id used by older report producers (which omit it) and by
/// synthetic records.
pub const UNKNOWN_ISSUE_ID: i64 = -1;

/// One timestamped observation from a report.
///
/// Fields are read-only so the flattened view cannot drift from `custom`.
/// Equality compares the seven report fields, never the derived view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "DatumRecord", into = "DatumRecord")]
pub struct Datum {
    issue_id: i64,
    suite_id: String,
    operation_id: String,
    thread_id: String,
    cpu_id: u32,
    timestamp: i64,
    custom: Map<String, Value>,
    flattened: Map<String, Value>,
}

impl Datum {
    pub fn new(
        issue_id: i64,
        suite_id: impl Into<String>,
        operation_id: impl Into<String>,
        thread_id: impl Into<String>,
        cpu_id: u32,
        timestamp: i64,
        custom: Map<String, Value>,
    ) -> Self {
        let flattened = flatten_to_map(&custom);
        Self {
            issue_id,
            suite_id: suite_id.into(),
            operation_id: operation_id.into(),
            thread_id: thread_id.into(),
            cpu_id,
            timestamp,
            custom,
            flattened,
        }
    }

    pub fn issue_id(&self) -> i64 {
        self.issue_id
    }

    pub fn suite_id(&self) -> &str {
        &self.suite_id
    }

    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn cpu_id(&self) -> u32 {
        self.cpu_id
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn custom(&self) -> &Map<String, Value> {
        &self.custom
    }

    /// Dotted-path view of `custom`, in payload order.
    pub fn flattened_fields(&self) -> &Map<String, Value> {
        &self.flattened
    }

    pub fn custom_field(&self, path: &str) -> Option<&Value> {
        self.flattened.get(path)
    }

    pub fn custom_field_numeric(&self, path: &str) -> Option<f64> {
        self.custom_field(path).and_then(value_to_float)
    }

    /// True when `custom` has `key` at its top level.
    pub fn has_custom_key(&self, key: &str) -> bool {
        self.custom.contains_key(key)
    }
}

impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        self.issue_id == other.issue_id
            && self.suite_id == other.suite_id
            && self.operation_id == other.operation_id
            && self.thread_id == other.thread_id
            && self.cpu_id == other.cpu_id
            && self.timestamp == other.timestamp
            && self.custom == other.custom
    }
}

/// Wire shape of a report line.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatumRecord {
    #[serde(default = "unknown_issue_id")]
    issue_id: i64,
    suite_id: String,
    operation_id: String,
    #[serde(deserialize_with = "string_or_integer")]
    thread_id: String,
    cpu_id: u32,
    timestamp: i64,
    #[serde(default)]
    custom: Map<String, Value>,
}

fn unknown_issue_id() -> i64 {
    UNKNOWN_ISSUE_ID
}

/// Producers have written `thread_id` both as a string and as a number.
fn string_or_integer<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(i) => i.to_string(),
    })
}

impl From<DatumRecord> for Datum {
    fn from(r: DatumRecord) -> Self {
        Datum::new(
            r.issue_id,
            r.suite_id,
            r.operation_id,
            r.thread_id,
            r.cpu_id,
            r.timestamp,
            r.custom,
        )
    }
}

impl From<Datum> for DatumRecord {
    fn from(d: Datum) -> Self {
        DatumRecord {
            issue_id: d.issue_id,
            suite_id: d.suite_id,
            operation_id: d.operation_id,
            thread_id: d.thread_id,
            cpu_id: d.cpu_id,
            timestamp: d.timestamp,
            custom: d.custom,
        }
    }
}
