//! Suite partitioning.
//!
//! Groups a report's records by `suite_id` in a single pass. Records keep
//! their relative order inside each suite; duplicates are kept.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::logging::structured::LogContext;
use crate::report::build_info::BuildInfo;
use crate::report::datum::Datum;
use crate::suite::model::Suite;

/// Suites of one report, keyed by name, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct SuiteSet {
    suites: Vec<Suite>,
    by_name: HashMap<String, usize>,
}

impl SuiteSet {
    pub fn get(&self, name: &str) -> Option<&Suite> {
        self.by_name.get(name).and_then(|&i| self.suites.get(i))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Suite> {
        self.suites.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.suites.iter().map(Suite::name)
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    pub fn into_vec(self) -> Vec<Suite> {
        self.suites
    }
}

impl<'a> IntoIterator for &'a SuiteSet {
    type Item = &'a Suite;
    type IntoIter = std::slice::Iter<'a, Suite>;

    fn into_iter(self) -> Self::IntoIter {
        self.suites.iter()
    }
}

/// Partition `data` from `file` into suites sharing `build`.
pub fn partition_suites(build: BuildInfo, data: Vec<Datum>, file: &Path, ctx: &LogContext) -> SuiteSet {
    let build = Arc::new(build);

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Datum>> = HashMap::new();
    for datum in data {
        let group = groups.entry(datum.suite_id().to_string()).or_insert_with(|| {
            order.push(datum.suite_id().to_string());
            Vec::new()
        });
        group.push(datum);
    }

    let mut set = SuiteSet::default();
    for name in order {
        let records = groups.remove(&name).unwrap_or_default();
        log::debug!(
            "{} SUITE_PARTITIONED records={}",
            ctx.with_suite(&name),
            records.len()
        );
        set.by_name.insert(name.clone(), set.suites.len());
        set.suites
            .push(Suite::new(name, Arc::clone(&build), records, file));
    }

    set
}
