use std::path::Path;

use certreport_core::device::DeviceRegistry;
use certreport_core::extraction::flatten_object;
use certreport_core::logging::LogContext;
use certreport_core::report::{load_report, save_report, BuildInfo, Datum};
use certreport_core::routing::HandlerRegistry;
use certreport_core::suite::partition_suites;
use certreport_core::systrace::merge_datums;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-z ]{0,8}".prop_map(Value::from),
        prop::collection::vec(any::<i32>(), 0..3).prop_map(|v| json!(v)),
    ]
}

fn flat_map() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::vec(("[a-z]{1,6}", leaf()), 0..6).prop_map(|pairs| pairs.into_iter().collect())
}

fn build_info() -> impl Strategy<Value = BuildInfo> {
    let key = prop_oneof![
        prop::sample::select(vec!["MANUFACTURER", "BRAND", "MODEL", "DEVICE", "PRODUCT", "SDK_INT", "FINGERPRINT"])
            .prop_map(String::from),
        "[A-Z_]{1,10}",
    ];
    prop::collection::vec((key, leaf()), 0..8).prop_map(|pairs| BuildInfo::new(pairs.into_iter().collect()))
}

fn datum() -> impl Strategy<Value = Datum> {
    (
        -1_i64..1000,
        prop::sample::select(vec!["A", "B", "C", "WaitForPI", "GPU fill rate"]),
        "[A-Za-z]{1,8}",
        "[0-9]{1,5}",
        0_u32..8,
        0_i64..1_000_000,
        flat_map(),
    )
        .prop_map(|(issue, suite, op, thread, cpu, ts, custom)| {
            let mut nested = Map::new();
            nested.insert("inner".into(), Value::Object(custom.clone()));
            let mut payload = custom;
            payload.insert("outer".into(), Value::Object(nested));
            Datum::new(issue, suite, op, thread, cpu, ts, payload)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn flatten_of_flat_object_is_identity(object in flat_map()) {
        let flattened = flatten_object(&object);
        let expected: Vec<(String, Value)> = object.into_iter().collect();
        prop_assert_eq!(flattened, expected);
    }

    #[test]
    fn partition_keeps_every_record_once(data in prop::collection::vec(datum(), 0..40)) {
        let set = partition_suites(BuildInfo::default(), data.clone(), Path::new("r.json"), &LogContext::new("prop"));

        let total: usize = set.iter().map(|s| s.len()).sum();
        prop_assert_eq!(total, data.len());
        for suite in &set {
            prop_assert!(suite.data().iter().all(|d| d.suite_id() == suite.name()));
            let expected: Vec<&Datum> = data.iter().filter(|d| d.suite_id() == suite.name()).collect();
            let actual: Vec<&Datum> = suite.data().iter().collect();
            prop_assert_eq!(actual, expected);
        }
    }

    #[test]
    fn dispatch_is_deterministic(data in prop::collection::vec(datum(), 1..20)) {
        let registry = HandlerRegistry::standard();
        let set = partition_suites(BuildInfo::default(), data, Path::new("r.json"), &LogContext::new("prop"));
        for suite in &set {
            let first = registry.resolve_suite(suite).map(|d| d.kind);
            let second = registry.resolve_suite(suite).map(|d| d.kind);
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn merge_output_is_sorted_and_complete(
        report in prop::collection::vec(datum(), 0..20),
        trace in prop::collection::vec(datum(), 0..20),
    ) {
        let expected_len = report.len() + trace.len();
        let merged = merge_datums(report, trace);
        prop_assert_eq!(merged.len(), expected_len);
        prop_assert!(merged.windows(2).all(|w| w[0].timestamp() <= w[1].timestamp()));
    }

    #[test]
    fn save_then_load_round_trips(build in build_info(), data in prop::collection::vec(datum(), 0..20)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prop.json");

        save_report(&path, &build, &data).unwrap();
        let (loaded_build, loaded) = load_report(&path, &DeviceRegistry::new(), &LogContext::new("prop")).unwrap();
        prop_assert_eq!(loaded_build, build);
        prop_assert_eq!(loaded, data);
    }
}
