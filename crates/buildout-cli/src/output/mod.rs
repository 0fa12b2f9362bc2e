pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("JSON serialization error: {}", e),
        },
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// A serialised sensitivity grid laid out as a header plus one line per row
/// value. `mark_base` appends `*` to the base case cell.
pub(crate) fn grid_records(grid: &Value, mark_base: bool) -> Option<Vec<Vec<String>>> {
    let row_variable = grid.get("row_variable")?.as_str()?;
    let column_variable = grid.get("column_variable")?.as_str()?;
    let row_values = grid.get("row_values")?.as_array()?;
    let column_values = grid.get("column_values")?.as_array()?;
    let cells = grid.get("cells")?.as_array()?;
    let base = grid
        .get("base_case_position")
        .and_then(|p| p.as_array())
        .and_then(|p| Some((p.first()?.as_u64()?, p.get(1)?.as_u64()?)));

    let mut records = Vec::with_capacity(row_values.len() + 1);
    let mut header = vec![format!("{} \\ {}", row_variable, column_variable)];
    header.extend(column_values.iter().map(scalar));
    records.push(header);

    for (i, (row_value, row)) in row_values.iter().zip(cells).enumerate() {
        let mut record = vec![scalar(row_value)];
        for (j, cell) in row.as_array()?.iter().enumerate() {
            let mut text = scalar(cell);
            if mark_base && base == Some((i as u64, j as u64)) {
                text.push('*');
            }
            record.push(text);
        }
        records.push(record);
    }
    Some(records)
}

/// Render a JSON scalar without quotes; containers fall back to JSON text.
pub(crate) fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
