use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use refi_core::amortization::{payment, schedule};
use refi_core::refinance::analysis;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Amortization
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_payment(input_json: String) -> NapiResult<String> {
    let input: payment::LoanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = payment::calculate_loan_payment(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Same envelope as `calculate_payment`, but `payments_made` is mandatory.
#[napi]
pub fn calculate_remaining_balance(input_json: String) -> NapiResult<String> {
    let input: payment::LoanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    if input.payments_made.is_none() {
        return Err(napi::Error::from_reason(
            "payments_made is required for a remaining balance",
        ));
    }
    let output = payment::calculate_loan_payment(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn build_amortization_schedule(input_json: String) -> NapiResult<String> {
    let input: schedule::ScheduleInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = schedule::build_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Refinance
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_refinance(input_json: String) -> NapiResult<String> {
    let input: analysis::RefinanceInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = analysis::analyze_refinance(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct ExportInput {
    current: schedule::AmortizationSchedule,
    new: schedule::AmortizationSchedule,
}

/// Merged side-by-side rows for two schedules.
///
/// Accepts either `{ "current": <schedule>, "new": <schedule> }` or a full
/// refinance input, in which case both schedules are built first.
#[napi]
pub fn export_schedules_csv_rows(input_json: String) -> NapiResult<String> {
    let value: serde_json::Value = serde_json::from_str(&input_json).map_err(to_napi_error)?;

    let merged = if value.get("current").and_then(|c| c.get("rows")).is_some() {
        let input: ExportInput = serde_json::from_value(value).map_err(to_napi_error)?;
        schedule::merge_schedules(&input.current, &input.new)
    } else {
        let input: analysis::RefinanceInput =
            serde_json::from_value(value).map_err(to_napi_error)?;
        let result = analysis::analyze_refinance(&input)
            .map_err(to_napi_error)?
            .result;
        schedule::merge_schedules(&result.current_schedule, &result.new_schedule)
    };

    let rows: Vec<serde_json::Map<String, serde_json::Value>> = merged
        .iter()
        .map(|row| {
            schedule::ScheduleComparisonRow::export_header()
                .into_iter()
                .zip(row.export_record())
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect()
        })
        .collect();
    serde_json::to_string(&rows).map_err(to_napi_error)
}
