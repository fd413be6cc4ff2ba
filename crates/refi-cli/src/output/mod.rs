pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Locate the amortization rows inside a result object, whether the result
/// is a schedule itself or wraps one under `schedule`.
pub(crate) fn schedule_rows(result: &Value) -> Option<&Vec<Value>> {
    result
        .get("rows")
        .or_else(|| result.get("schedule").and_then(|s| s.get("rows")))
        .and_then(Value::as_array)
}

/// Render a scalar cell. Long arrays are summarised rather than inlined.
pub(crate) fn format_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "—".to_string(),
        Value::Array(arr) => format!("[{} values]", arr.len()),
        Value::Object(map) => match map.get("ratio") {
            // LoanToValue::Ratio
            Some(ratio) if map.len() == 1 => format_cell(ratio),
            _ => serde_json::to_string(value).unwrap_or_default(),
        },
    }
}
