//! Suite aggregate.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::report::build_info::{BuildInfo, DEVICE, MANUFACTURER, SDK_INT, UNKNOWN};
use crate::report::datum::Datum;
use crate::routing::handlers::SuiteHandler;

/// All records of one report sharing a `suite_id`.
///
/// Records keep file order. The by-operation and by-cpu indices are built
/// once at construction and hold positions into the record list. The only
/// thing set afterwards is the handler, at most once.
#[derive(Debug, Clone)]
pub struct Suite {
    name: String,
    build: Arc<BuildInfo>,
    data: Vec<Datum>,
    file: PathBuf,
    by_operation: BTreeMap<String, Vec<usize>>,
    by_cpu: BTreeMap<u32, Vec<usize>>,
    handler: OnceLock<SuiteHandler>,
}

impl Suite {
    pub fn new(name: impl Into<String>, build: Arc<BuildInfo>, data: Vec<Datum>, file: &Path) -> Self {
        let mut by_operation: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut by_cpu: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (i, datum) in data.iter().enumerate() {
            by_operation
                .entry(datum.operation_id().to_string())
                .or_default()
                .push(i);
            by_cpu.entry(datum.cpu_id()).or_default().push(i);
        }

        Self {
            name: name.into(),
            build,
            data,
            file: file.to_path_buf(),
            by_operation,
            by_cpu,
            handler: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn build(&self) -> &BuildInfo {
        &self.build
    }

    pub fn data(&self) -> &[Datum] {
        &self.data
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Operation ids present, sorted.
    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.by_operation.keys().map(String::as_str)
    }

    pub fn data_for_operation<'a>(&'a self, operation_id: &str) -> impl Iterator<Item = &'a Datum> + 'a {
        self.indexed(self.by_operation.get(operation_id))
    }

    /// Cpu ids present, ascending.
    pub fn cpu_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.by_cpu.keys().copied()
    }

    pub fn data_for_cpu(&self, cpu_id: u32) -> impl Iterator<Item = &Datum> {
        self.indexed(self.by_cpu.get(&cpu_id))
    }

    fn indexed<'a>(&'a self, positions: Option<&'a Vec<usize>>) -> impl Iterator<Item = &'a Datum> + 'a {
        positions
            .into_iter()
            .flatten()
            .filter_map(move |&i| self.data.get(i))
    }

    /// Distinct `(operation_id, field path)` topics in first-seen order.
    pub fn topics(&self) -> Vec<(String, String)> {
        let mut seen = std::collections::HashSet::new();
        let mut topics = Vec::new();
        for datum in &self.data {
            for field in datum.flattened_fields().keys() {
                let topic = (datum.operation_id().to_string(), field.clone());
                if seen.insert(topic.clone()) {
                    topics.push(topic);
                }
            }
        }
        topics
    }

    /// `"<MANUFACTURER> <DEVICE> SDK <SDK_INT>"`.
    pub fn identifier(&self) -> String {
        let field = |key: &str| self.build.get(key).unwrap_or_else(|| UNKNOWN.to_string());
        format!("{} {} SDK {}", field(MANUFACTURER), field(DEVICE), field(SDK_INT))
    }

    pub fn description(&self) -> String {
        format!("{} ({})", self.name, self.identifier())
    }

    pub fn handler(&self) -> Option<&SuiteHandler> {
        self.handler.get()
    }

    /// Bind the analysis handler. Returns false if one was already bound.
    pub fn bind_handler(&self, handler: SuiteHandler) -> bool {
        self.handler.set(handler).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn datum(op: &str, cpu: u32, ts: i64, custom: Value) -> Datum {
        let custom: Map<String, Value> = custom.as_object().cloned().unwrap_or_default();
        Datum::new(0, "S", op, "1", cpu, ts, custom)
    }

    fn suite() -> Suite {
        let build = BuildInfo::from_value(json!({
            "MANUFACTURER": "Google", "DEVICE": "blueline", "SDK_INT": 29
        }))
        .unwrap();
        Suite::new(
            "S",
            Arc::new(build),
            vec![
                datum("B", 2, 1, json!({"x": 1})),
                datum("A", 0, 2, json!({"y": {"z": 2}})),
                datum("B", 0, 3, json!({"x": 3})),
            ],
            Path::new("report.json"),
        )
    }

    #[test]
    fn test_indices() {
        let s = suite();
        assert_eq!(s.operations().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(s.cpu_ids().collect::<Vec<_>>(), vec![0, 2]);

        let b: Vec<i64> = s.data_for_operation("B").map(|d| d.timestamp()).collect();
        assert_eq!(b, vec![1, 3]);
        let cpu0: Vec<i64> = s.data_for_cpu(0).map(|d| d.timestamp()).collect();
        assert_eq!(cpu0, vec![2, 3]);
        assert_eq!(s.data_for_operation("missing").count(), 0);
    }

    #[test]
    fn test_topics() {
        assert_eq!(
            suite().topics(),
            vec![
                ("B".to_string(), "x".to_string()),
                ("A".to_string(), "y.z".to_string()),
            ]
        );
    }

    #[test]
    fn test_identifier_and_description() {
        let s = suite();
        assert_eq!(s.identifier(), "Google blueline SDK 29");
        assert_eq!(s.description(), "S (Google blueline SDK 29)");
    }
}
