//! Field flattening.
//!
//! Projects a nested JSON object into dotted-path leaf entries, e.g.
//! `{"fill_rate": {"num_quads": 4}}` becomes `("fill_rate.num_quads", 4)`.
//!
//! Only objects are descended into; arrays and scalars are leaves. An empty
//! nested object contributes no entries. There is no cycle detection, which
//! cannot arise from parsed JSON but would recurse without bound on a
//! hand-built cyclic structure.

use serde_json::{Map, Value};

/// Flatten `object` into `(path, leaf)` pairs in key-iteration order.
pub fn flatten_object(object: &Map<String, Value>) -> Vec<(String, Value)> {
    let mut out = Vec::with_capacity(object.len());
    flatten_into(object, None, &mut out);
    out
}

/// Flatten `object` into a path-keyed map, preserving the same order as
/// [`flatten_object`]. Later duplicates of a path overwrite earlier ones.
pub fn flatten_to_map(object: &Map<String, Value>) -> Map<String, Value> {
    flatten_object(object).into_iter().collect()
}

fn flatten_into(object: &Map<String, Value>, prefix: Option<&str>, out: &mut Vec<(String, Value)>) {
    for (key, value) in object {
        let path = match prefix {
            Some(p) => format!("{}.{}", p, key),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) => flatten_into(nested, Some(&path), out),
            leaf => out.push((path, leaf.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_flatten_nested() {
        let data = obj(json!({
            "foo": 1,
            "bar": {"baz": 2},
            "baz": {"qux": 5, "corge": {"grault": 6}}
        }));

        let flat = flatten_object(&data);
        assert_eq!(
            flat,
            vec![
                ("foo".to_string(), json!(1)),
                ("bar.baz".to_string(), json!(2)),
                ("baz.qux".to_string(), json!(5)),
                ("baz.corge.grault".to_string(), json!(6)),
            ]
        );
    }

    #[test]
    fn test_flatten_keeps_input_order() {
        let data = obj(json!({"zeta": 1, "alpha": {"y": 2, "b": 3}}));
        let paths: Vec<String> = flatten_object(&data).into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["zeta", "alpha.y", "alpha.b"]);
    }

    #[test]
    fn test_arrays_are_leaves() {
        let data = obj(json!({"cores": [0, 1, {"x": 2}]}));
        assert_eq!(
            flatten_object(&data),
            vec![("cores".to_string(), json!([0, 1, {"x": 2}]))]
        );
    }

    #[test]
    fn test_empty_nested_object_has_no_leaves() {
        let data = obj(json!({"a": {}, "b": null}));
        assert_eq!(flatten_object(&data), vec![("b".to_string(), Value::Null)]);
    }

    #[test]
    fn test_flatten_to_map_lookup() {
        let data = obj(json!({"perf_info": {"fps": 59.9}}));
        let map = flatten_to_map(&data);
        assert_eq!(map.get("perf_info.fps"), Some(&json!(59.9)));
        assert_eq!(map.get("perf_info"), None);
    }
}
