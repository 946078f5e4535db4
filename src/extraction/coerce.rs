//! JSON value coercion.
//!
//! Report producers have changed over time and encode the same quantity as a
//! number, a numeric string, a boolean string or a duration such as
//! `"500 ms"`. These helpers give one view over all of them.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    /// `<integer> <unit>` duration strings. Only the magnitude is returned;
    /// callers know which unit their field reports in.
    static ref TIME_EXPRESSIONS: Vec<Regex> = vec![
        Regex::new(r"^(\d+) (nanoseconds|ns|nsec)$").unwrap(),
        Regex::new(r"^(\d+) (milliseconds|ms|msec)$").unwrap(),
        Regex::new(r"^(\d+) (seconds|s|sec)$").unwrap(),
    ];
}

/// Convert a JSON value to a string representation.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(), // Arrays and objects as JSON strings
    }
}

/// Convert a JSON value to a float if possible.
///
/// # Examples
/// ```
/// use certreport_core::extraction::value_to_float;
/// use serde_json::json;
/// assert_eq!(value_to_float(&json!("123.45")), Some(123.45));
/// assert_eq!(value_to_float(&json!("True")), Some(1.0));
/// assert_eq!(value_to_float(&json!("500 msec")), Some(500.0));
/// assert_eq!(value_to_float(&json!("fast")), None);
/// ```
pub fn value_to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => string_to_float(s),
        _ => None,
    }
}

fn string_to_float(s: &str) -> Option<f64> {
    if let Ok(f) = s.trim().parse::<f64>() {
        return Some(f);
    }
    match s {
        "True" => return Some(1.0),
        "False" => return Some(0.0),
        _ => {}
    }
    TIME_EXPRESSIONS
        .iter()
        .find_map(|re| re.captures(s))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Convert a JSON value to an integer if possible.
pub fn value_to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_float_plain() {
        assert_eq!(value_to_float(&json!(123.45)), Some(123.45));
        assert_eq!(value_to_float(&json!("123.45")), Some(123.45));
        assert_eq!(value_to_float(&json!(7)), Some(7.0));
    }

    #[test]
    fn test_to_float_booleans() {
        assert_eq!(value_to_float(&json!("True")), Some(1.0));
        assert_eq!(value_to_float(&json!("False")), Some(0.0));
        assert_eq!(value_to_float(&json!(true)), Some(1.0));
    }

    #[test]
    fn test_to_float_durations() {
        for s in ["500 nanoseconds", "500 ns", "500 nsec"] {
            assert_eq!(value_to_float(&json!(s)), Some(500.0), "{}", s);
        }
        for s in ["500 milliseconds", "500 ms", "500 msec"] {
            assert_eq!(value_to_float(&json!(s)), Some(500.0), "{}", s);
        }
        for s in ["500 seconds", "500 s", "500 sec"] {
            assert_eq!(value_to_float(&json!(s)), Some(500.0), "{}", s);
        }
        assert_eq!(value_to_float(&json!("500 minutes")), None);
    }

    #[test]
    fn test_to_float_rejects_structures() {
        assert_eq!(value_to_float(&json!([1])), None);
        assert_eq!(value_to_float(&Value::Null), None);
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(value_to_int(&json!(42)), Some(42));
        assert_eq!(value_to_int(&json!("29")), Some(29));
        assert_eq!(value_to_int(&json!("x")), None);
        assert_eq!(value_to_string(&json!("a")), "a");
        assert_eq!(value_to_string(&json!(1.5)), "1.5");
        assert_eq!(value_to_string(&Value::Null), "");
    }
}
