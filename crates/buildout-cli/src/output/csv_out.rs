use serde_json::Value;
use std::io;

use super::table::ordered_headers;
use super::{grid_records, scalar};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// Write the primary table of the output as CSV to stdout: the grid if there
/// is one, else the row table, else the result fields.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    match value {
        Value::Object(map) => {
            if let Some(records) = map.get("grid").and_then(|g| grid_records(g, false)) {
                for record in records {
                    let _ = wtr.write_record(&record);
                }
            } else if let Some(Value::Array(rows)) = map.get("results") {
                write_rows(&mut wtr, rows);
            } else if let Some(Value::Object(result)) = map.get("result") {
                write_fields(&mut wtr, result.iter());
            } else {
                write_fields(&mut wtr, map.iter());
            }
        }
        Value::Array(arr) => write_rows(&mut wtr, arr),
        _ => {
            let _ = wtr.write_record([scalar(value)]);
        }
    }

    let _ = wtr.flush();
}

fn write_fields<'v>(wtr: &mut StdoutWriter<'_>, fields: impl Iterator<Item = (&'v String, &'v Value)>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in fields {
        let _ = wtr.write_record([key.as_str(), &scalar(val)]);
    }
}

fn write_rows(wtr: &mut StdoutWriter<'_>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([scalar(item)]);
        }
        return;
    };

    let headers = ordered_headers(first);
    let _ = wtr.write_record(&headers);
    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(scalar).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}
