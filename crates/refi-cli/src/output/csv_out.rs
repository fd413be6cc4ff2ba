use serde_json::Value;
use std::io;

use refi_core::amortization::schedule::ScheduleComparisonRow;

use super::{format_cell, schedule_rows};

/// Write output as CSV to stdout.
///
/// Schedule results become one row per period; anything else is written as
/// `field,value` pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(rows) = schedule_rows(result) {
        write_rows_csv(&mut wtr, rows);
    } else if let Value::Object(map) = result {
        let _ = wtr.write_record(["field", "value"]);
        for (key, val) in map {
            if schedule_rows(val).is_some() {
                continue;
            }
            let _ = wtr.write_record([key.as_str(), &csv_value(val)]);
        }
    } else {
        let _ = wtr.write_record([&csv_value(result)]);
    }

    if let Err(e) = wtr.flush() {
        tracing::error!("CSV write error: {}", e);
    }
}

/// Side-by-side export of two schedules, one row per period, cells of a
/// schedule that has already ended zero-filled.
pub fn write_schedule_export<W: io::Write>(
    writer: W,
    rows: &[ScheduleComparisonRow],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(ScheduleComparisonRow::export_header())?;
    for row in rows {
        wtr.write_record(row.export_record())?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_rows_csv<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        return;
    };
    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    let _ = wtr.write_record(&headers);
    for item in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(csv_value).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}

/// CSV cells keep nulls empty and arrays inline, unlike the table view.
fn csv_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Array(_) => serde_json::to_string(value).unwrap_or_default(),
        _ => format_cell(value),
    }
}
