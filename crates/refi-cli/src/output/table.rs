use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{format_cell, schedule_rows};

/// Rows shown for each schedule in table mode.
const PREVIEW_ROWS: usize = 24;

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_fields(map);
            }
        }
        _ => println!("{}", format_cell(value)),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    if let Value::Object(res_map) = result {
        print_fields(res_map);

        // Schedules: the result itself, or nested current/new schedules
        if let Some(rows) = schedule_rows(result) {
            print_schedule_preview("Schedule", rows);
        }
        for (key, label) in [
            ("current_schedule", "Current loan"),
            ("new_schedule", "New loan"),
        ] {
            if let Some(rows) = res_map.get(key).and_then(schedule_rows) {
                print_schedule_preview(label, rows);
            }
        }
    } else {
        println!("{}", format_cell(result));
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
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

/// Scalar fields as a two-column table; nested schedules are skipped here.
fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        if schedule_rows(val).is_some() || key == "schedule" {
            continue;
        }
        builder.push_record([key.as_str(), &format_cell(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_schedule_preview(label: &str, rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        println!("\n{}: (empty)", label);
        return;
    };

    println!(
        "\n{} (first {} of {} periods)",
        label,
        rows.len().min(PREVIEW_ROWS),
        rows.len()
    );
    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for item in rows.iter().take(PREVIEW_ROWS) {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_cell).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}
