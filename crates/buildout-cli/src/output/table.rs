use colored::Colorize;
use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{grid_records, scalar};

/// Columns that identify a row; shown first regardless of key order.
const KEY_COLUMNS: [&str; 3] = ["ticker", "case", "year"];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) if is_envelope(map) => print_envelope(map),
        Value::Object(map) => print_field_table(map),
        Value::Array(arr) => print_row_table(arr),
        _ => println!("{}", value),
    }
}

fn is_envelope(map: &Map<String, Value>) -> bool {
    map.contains_key("result") || map.contains_key("results") || map.contains_key("grid")
}

fn print_envelope(envelope: &Map<String, Value>) {
    match envelope.get("result") {
        Some(Value::Object(result)) => print_field_table(result),
        Some(other) if !other.is_null() => println!("{}", scalar(other)),
        _ => {}
    }

    if let Some(Value::Array(rows)) = envelope.get("results") {
        println!();
        print_row_table(rows);
    }

    if let Some(grid) = envelope.get("grid") {
        if let Some(records) = grid_records(grid, true) {
            println!();
            let mut builder = Builder::default();
            for record in records {
                builder.push_record(record);
            }
            println!("{}", Table::from(builder));
            println!("* base case");
        }
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\n{}", "Warnings:".yellow().bold());
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_field_table(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_row_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers = ordered_headers(first);
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

pub(crate) fn ordered_headers(first: &Map<String, Value>) -> Vec<String> {
    let mut headers: Vec<String> = KEY_COLUMNS
        .iter()
        .filter(|k| first.contains_key(**k))
        .map(|k| k.to_string())
        .collect();
    headers.extend(
        first
            .keys()
            .filter(|k| !KEY_COLUMNS.contains(&k.as_str()))
            .cloned(),
    );
    headers
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        other => scalar(other),
    }
}
