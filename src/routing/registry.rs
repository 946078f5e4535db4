//! Handler registry and dispatch.
//!
//! Resolution is a first-match-wins scan over an ordered descriptor list.
//! Registration order decides which handler runs when two predicates accept
//! the same input.

use std::fmt;

use crate::logging::structured::LogContext;
use crate::report::datum::Datum;
use crate::routing::handlers::{
    CalculateWaitPi, ChoreographerTimestamps, Cpuset, EglPresentationTime, FillRate, HandlerKind,
    MarchingCubes, MemoryAccess, SuiteHandler, TextureLoading,
};
use crate::suite::model::Suite;
use crate::suite::partition::SuiteSet;

/// What a handler matches on.
#[derive(Clone, Copy)]
pub enum Claim {
    /// Predicate over the suite name.
    SuiteName(fn(&str) -> bool),
    /// Predicate over single records; a suite is claimed when any record is.
    Datum(fn(&Datum) -> bool),
}

impl Claim {
    pub fn claims_suite(&self, suite: &Suite) -> bool {
        match self {
            Claim::SuiteName(pred) => pred(suite.name()),
            Claim::Datum(pred) => suite.data().iter().any(|d| pred(d)),
        }
    }

    pub fn claims_datum(&self, datum: &Datum) -> bool {
        match self {
            Claim::SuiteName(pred) => pred(datum.suite_id()),
            Claim::Datum(pred) => pred(datum),
        }
    }
}

impl fmt::Debug for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Claim::SuiteName(_) => f.write_str("SuiteName"),
            Claim::Datum(_) => f.write_str("Datum"),
        }
    }
}

#[derive(Clone, Copy)]
pub struct HandlerDescriptor {
    pub kind: HandlerKind,
    pub claim: Claim,
    pub build: fn(&Suite) -> SuiteHandler,
}

impl HandlerDescriptor {
    pub fn new(kind: HandlerKind, claim: Claim, build: fn(&Suite) -> SuiteHandler) -> Self {
        Self { kind, claim, build }
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("kind", &self.kind)
            .field("claim", &self.claim)
            .finish()
    }
}

/// Ordered, fixed list of handler descriptors.
#[derive(Debug, Clone)]
pub struct HandlerRegistry {
    descriptors: Vec<HandlerDescriptor>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl HandlerRegistry {
    pub fn new(descriptors: Vec<HandlerDescriptor>) -> Self {
        Self { descriptors }
    }

    /// The built-in handlers in their registration order.
    pub fn standard() -> Self {
        Self::new(vec![
            HandlerDescriptor::new(
                HandlerKind::CalculateWaitPi,
                Claim::SuiteName(|name| name.contains("WaitForPI")),
                |s| SuiteHandler::CalculateWaitPi(CalculateWaitPi::from_suite(s)),
            ),
            HandlerDescriptor::new(
                HandlerKind::Cpuset,
                Claim::SuiteName(|name| name.contains("Sane CPUSET")),
                |s| SuiteHandler::Cpuset(Cpuset::from_suite(s)),
            ),
            HandlerDescriptor::new(
                HandlerKind::EglPresentationTime,
                Claim::SuiteName(|name| name.contains("EGL Presentation Time")),
                |s| SuiteHandler::EglPresentationTime(EglPresentationTime::from_suite(s)),
            ),
            HandlerDescriptor::new(
                HandlerKind::MarchingCubes,
                Claim::SuiteName(|name| name.contains("Marching Cubes Permutations Test")),
                |s| SuiteHandler::MarchingCubes(MarchingCubes::from_suite(s)),
            ),
            HandlerDescriptor::new(
                HandlerKind::FillRate,
                Claim::Datum(|d| d.suite_id().contains("GPU fill rate")),
                |s| SuiteHandler::FillRate(FillRate::from_suite(s)),
            ),
            HandlerDescriptor::new(
                HandlerKind::TextureLoading,
                Claim::Datum(|d| d.suite_id().contains("Texture Loading")),
                |s| SuiteHandler::TextureLoading(TextureLoading::from_suite(s)),
            ),
            HandlerDescriptor::new(
                HandlerKind::ChoreographerTimestamps,
                Claim::Datum(|d| d.operation_id().contains("ChoreographerTimestampsOperation")),
                |s| SuiteHandler::ChoreographerTimestamps(ChoreographerTimestamps::from_suite(s)),
            ),
            HandlerDescriptor::new(
                HandlerKind::MemoryAccess,
                Claim::Datum(|d| d.suite_id().contains("MA:SCC:")),
                |s| SuiteHandler::MemoryAccess(MemoryAccess::from_suite(s)),
            ),
        ])
    }

    pub fn descriptors(&self) -> &[HandlerDescriptor] {
        &self.descriptors
    }

    pub fn resolve_suite(&self, suite: &Suite) -> Option<&HandlerDescriptor> {
        self.descriptors.iter().find(|d| d.claim.claims_suite(suite))
    }

    pub fn resolve_datum(&self, datum: &Datum) -> Option<&HandlerDescriptor> {
        self.descriptors.iter().find(|d| d.claim.claims_datum(datum))
    }

    /// Bind a handler to every suite that has none yet.
    ///
    /// Suites nothing claims stay inert and are listed as unhandled.
    pub fn dispatch(&self, suites: &SuiteSet, ctx: &LogContext) -> DispatchReport {
        let mut report = DispatchReport::default();
        for suite in suites {
            let suite_ctx = ctx.with_suite(suite.name());
            if let Some(bound) = suite.handler() {
                report.handled.push((suite.name().to_string(), bound.kind()));
                continue;
            }
            match self.resolve_suite(suite) {
                Some(descriptor) => {
                    suite.bind_handler((descriptor.build)(suite));
                    log::info!(
                        "{} HANDLER_MATCHED handler={} records={}",
                        suite_ctx,
                        descriptor.kind,
                        suite.len()
                    );
                    report.handled.push((suite.name().to_string(), descriptor.kind));
                }
                None => {
                    log::warn!("{} HANDLER_NOT_FOUND records={}", suite_ctx, suite.len());
                    report.unhandled.push(suite.name().to_string());
                }
            }
        }
        report
    }

    /// Resolve a handler per `(operation_id, field)` topic of `suite`.
    ///
    /// A topic is resolved through the first record that carries it.
    pub fn dispatch_topics(&self, suite: &Suite, ctx: &LogContext) -> Vec<TopicRoute> {
        let suite_ctx = ctx.with_suite(suite.name());
        suite
            .topics()
            .into_iter()
            .map(|(operation_id, field)| {
                let handler = suite
                    .data_for_operation(&operation_id)
                    .find(|d| d.flattened_fields().contains_key(&field))
                    .and_then(|d| self.resolve_datum(d))
                    .map(|descriptor| descriptor.kind);
                if handler.is_none() {
                    log::debug!(
                        "{} HANDLER_NOT_FOUND operation={} field={}",
                        suite_ctx,
                        operation_id,
                        field
                    );
                }
                TopicRoute {
                    operation_id,
                    field,
                    handler,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRoute {
    pub operation_id: String,
    pub field: String,
    pub handler: Option<HandlerKind>,
}

/// Outcome of one dispatch pass, in suite order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub handled: Vec<(String, HandlerKind)>,
    pub unhandled: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::build_info::BuildInfo;
    use crate::suite::partition::partition_suites;
    use serde_json::{json, Map, Value};
    use std::path::Path;

    fn datum(suite: &str, op: &str, custom: Value) -> Datum {
        let custom: Map<String, Value> = custom.as_object().cloned().unwrap_or_default();
        Datum::new(0, suite, op, "1", 0, 0, custom)
    }

    fn suites(data: Vec<Datum>) -> SuiteSet {
        partition_suites(BuildInfo::default(), data, Path::new("r.json"), &LogContext::new("test-run"))
    }

    #[test]
    fn test_suite_name_claim() {
        let set = suites(vec![datum("Sane CPUSET", "SaneCpusetOperation", json!({}))]);
        let registry = HandlerRegistry::standard();
        let resolved = registry.resolve_suite(set.get("Sane CPUSET").unwrap()).unwrap();
        assert_eq!(resolved.kind, HandlerKind::Cpuset);
    }

    #[test]
    fn test_datum_claim_via_operation() {
        let d = datum("Frame pacing", "ChoreographerTimestampsOperation", json!({}));
        let registry = HandlerRegistry::standard();
        assert_eq!(
            registry.resolve_datum(&d).map(|h| h.kind),
            Some(HandlerKind::ChoreographerTimestamps)
        );
        let set = suites(vec![d]);
        assert_eq!(
            registry.resolve_suite(set.get("Frame pacing").unwrap()).map(|h| h.kind),
            Some(HandlerKind::ChoreographerTimestamps)
        );
    }

    #[test]
    fn test_first_match_wins() {
        // Claimed by name (WaitForPI) and by datum (GPU fill rate).
        let name = "WaitForPI GPU fill rate";
        let set = suites(vec![datum(name, "Op", json!({}))]);
        let suite = set.get(name).unwrap();

        let standard = HandlerRegistry::standard();
        assert_eq!(standard.resolve_suite(suite).unwrap().kind, HandlerKind::CalculateWaitPi);

        let mut reordered = standard.descriptors().to_vec();
        reordered.reverse();
        let reordered = HandlerRegistry::new(reordered);
        assert_eq!(reordered.resolve_suite(suite).unwrap().kind, HandlerKind::FillRate);
    }

    #[test]
    fn test_dispatch_binds_and_reports_unhandled() {
        let set = suites(vec![
            datum("GPU fill rate", "FillRateGLES3Operation", json!({"fill_rate": {"pixels_per_second": 5}})),
            datum("Unknown suite", "Op", json!({})),
        ]);
        let ctx = LogContext::new("test-run");
        let report = HandlerRegistry::standard().dispatch(&set, &ctx);

        assert_eq!(report.handled, vec![("GPU fill rate".to_string(), HandlerKind::FillRate)]);
        assert_eq!(report.unhandled, vec!["Unknown suite".to_string()]);
        assert_eq!(
            set.get("GPU fill rate").unwrap().handler().map(|h| h.kind()),
            Some(HandlerKind::FillRate)
        );
        assert!(set.get("Unknown suite").unwrap().handler().is_none());
    }

    #[test]
    fn test_dispatch_binds_once() {
        let set = suites(vec![datum("Sane CPUSET", "SaneCpusetOperation", json!({}))]);
        let ctx = LogContext::new("test-run");
        HandlerRegistry::standard().dispatch(&set, &ctx);

        // A second pass with a different registry keeps the first binding.
        let only_fill_rate = HandlerRegistry::new(vec![HandlerDescriptor::new(
            HandlerKind::FillRate,
            Claim::SuiteName(|_| true),
            |s| SuiteHandler::FillRate(FillRate::from_suite(s)),
        )]);
        let report = only_fill_rate.dispatch(&set, &ctx);
        assert_eq!(report.handled[0].1, HandlerKind::Cpuset);
    }

    #[test]
    fn test_dispatch_topics() {
        let set = suites(vec![
            datum("MA:SCC:0", "MemoryAccessOperation", json!({"bytes": "1 bytes"})),
            datum("MA:SCC:0", "Other", json!({"x": 1})),
        ]);
        let routes = HandlerRegistry::standard().dispatch_topics(set.get("MA:SCC:0").unwrap(), &LogContext::new("t"));
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].field, "bytes");
        assert!(routes.iter().all(|r| r.handler == Some(HandlerKind::MemoryAccess)));
    }

    #[test]
    fn test_empty_registry_resolves_nothing() {
        let set = suites(vec![datum("Sane CPUSET", "Op", json!({}))]);
        let registry = HandlerRegistry::new(Vec::new());
        assert!(registry.resolve_suite(set.get("Sane CPUSET").unwrap()).is_none());
    }
}
