//! Recursive weighted structural diff between a validated value and the
//! expected answer. Deterministic, no side effects; divergence is data,
//! never an error.
//!
//! Known limitation, kept by design: list elements are compared as opaque
//! values at matching indices — no recursion into nested structures and no
//! partial string credit inside lists.

use crate::model::{FieldScore, MatchKind};
use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};

const FIELD_WEIGHT: f64 = 1.0;

/// Compare `actual` against `expected`, returning an accuracy in [0, 100]
/// and a per-field breakdown for the top level of `expected`.
pub fn score(actual: &Map<String, Value>, expected: &Map<String, Value>) -> (f64, Vec<FieldScore>) {
    // An empty expectation is trivially satisfied.
    if expected.is_empty() {
        return (100.0, Vec::new());
    }

    let actual_norm: Map<String, Value> = actual
        .iter()
        .map(|(k, v)| (k.clone(), normalize_dates(v)))
        .collect();
    let expected_norm: Map<String, Value> = expected
        .iter()
        .map(|(k, v)| (k.clone(), normalize_dates(v)))
        .collect();
    if actual_norm == expected_norm {
        return (100.0, Vec::new());
    }

    let mut total = 0.0;
    let mut earned = 0.0;
    let mut fields = Vec::with_capacity(expected_norm.len());

    for (key, expected_value) in &expected_norm {
        total += FIELD_WEIGHT;

        let Some(actual_value) = actual_norm.get(key) else {
            fields.push(field(key, 0.0, MatchKind::MissingField));
            continue;
        };

        let (ratio, kind) = score_value(actual_value, expected_value);
        earned += FIELD_WEIGHT * ratio;
        fields.push(field(key, ratio, kind));
    }

    let accuracy = if total > 0.0 {
        (earned / total) * 100.0
    } else {
        0.0
    };
    (accuracy, fields)
}

fn score_value(actual: &Value, expected: &Value) -> (f64, MatchKind) {
    match (actual, expected) {
        (Value::Object(a), Value::Object(e)) => {
            let (pct, _) = score(a, e);
            (pct / 100.0, MatchKind::NestedObject)
        }
        (Value::Array(a), Value::Array(e)) => (score_list(a, e), MatchKind::ListMatch),
        _ => score_scalar(actual, expected),
    }
}

fn score_list(actual: &[Value], expected: &[Value]) -> f64 {
    if expected.is_empty() {
        return if actual.is_empty() { 1.0 } else { 0.0 };
    }
    if actual.is_empty() {
        return 0.0;
    }
    let overlap = expected.len().min(actual.len());
    let matches = (0..overlap).filter(|&i| expected[i] == actual[i]).count();
    matches as f64 / expected.len() as f64
}

fn score_scalar(actual: &Value, expected: &Value) -> (f64, MatchKind) {
    let actual_str = fold_to_string(actual);
    let expected_str = fold_to_string(expected);

    if actual_str == expected_str {
        return (1.0, MatchKind::ExactMatch);
    }

    // Substring credit applies to string/string pairs only.
    if actual.is_string() && expected.is_string() {
        if actual_str.contains(&expected_str) || expected_str.contains(&actual_str) {
            return (0.5, MatchKind::PartialMatch);
        }
        return (0.0, MatchKind::NoMatch);
    }

    if json_type(actual) != json_type(expected) {
        (0.0, MatchKind::TypeMismatch)
    } else {
        (0.0, MatchKind::NoMatch)
    }
}

/// Case-folded string form used for scalar comparison. Strings compare by
/// their content, everything else by its JSON rendering.
fn fold_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.to_lowercase(),
        other => other.to_string().to_lowercase(),
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn field(path: &str, ratio: f64, kind: MatchKind) -> FieldScore {
    FieldScore {
        field_path: path.to_string(),
        ratio,
        kind,
    }
}

/// Rewrite every string leaf that holds a datetime or date into its
/// canonical ISO-8601 form, so equivalent representations compare equal.
/// Non-date strings are left untouched.
pub fn normalize_dates(v: &Value) -> Value {
    match v {
        Value::String(s) => Value::String(canonicalize_date(s)),
        Value::Array(items) => Value::Array(items.iter().map(normalize_dates).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, val)| (k.clone(), normalize_dates(val)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn canonicalize_date(s: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.to_rfc3339();
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.format("%Y-%m-%d").to_string();
    }
    s.to_string()
}
