use serde_json::Value;

use super::scalar;

/// Result fields worth printing on their own, in order of priority.
const PRIORITY_KEYS: [&str; 6] = [
    "scenario_valuation",
    "valuation",
    "pv_total",
    "capex_burden",
    "accelerators_per_year",
    "base_case",
];

/// Print just the key answer: one `ticker: value` line per row for row
/// tables, else the highest-priority result field.
pub fn print_minimal(value: &Value) {
    if let Some(Value::Array(rows)) = value.get("results") {
        if let Some(key) = rows.first().and_then(priority_key) {
            for row in rows {
                let label = ["ticker", "case", "year"]
                    .iter()
                    .find_map(|k| row.get(*k))
                    .map(scalar)
                    .unwrap_or_default();
                let val = row.get(key).map(scalar).unwrap_or_default();
                println!("{}: {}", label, val);
            }
            return;
        }
    }

    let result = value.get("result").unwrap_or(value);
    if let Some(key) = priority_key(result) {
        if let Some(val) = result.get(key) {
            println!("{}", scalar(val));
            return;
        }
    }

    if let Value::Object(map) = result {
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, scalar(val));
            return;
        }
    }

    println!("{}", scalar(result));
}

fn priority_key(value: &Value) -> Option<&'static str> {
    PRIORITY_KEYS
        .iter()
        .copied()
        .find(|k| value.get(*k).is_some_and(|v| !v.is_null()))
}
