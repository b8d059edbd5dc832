use serde_json::Value;

/// Exact-equality filter over a homogeneous set of records. No case
/// normalization, no partial matches; records lacking the field never
/// match. Input order is preserved and an empty result is not an error.
pub fn match_field(records: &[Value], field: &str, value: &Value) -> Vec<Value> {
    records
        .iter()
        .filter(|record| record.get(field) == Some(value))
        .cloned()
        .collect()
}
