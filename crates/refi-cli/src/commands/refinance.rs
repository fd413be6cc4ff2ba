use std::fs::File;
use std::io;

use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use refi_core::amortization::schedule::{merge_schedules, DEFAULT_MAX_OVERRUN_PERIODS};
use refi_core::refinance::analysis::{self, RefinanceInput};
use refi_core::refinance::loans::{CurrentLoan, RefiOffer};

use crate::input;
use crate::output::csv_out;

/// Arguments for a refinance comparison
#[derive(Args)]
pub struct RefinanceArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Current loan: principal at origination
    #[arg(long)]
    pub original_principal: Option<Decimal>,

    /// Current loan: APR in percent
    #[arg(long)]
    pub current_rate: Option<Decimal>,

    /// Current loan: original term in years
    #[arg(long)]
    pub original_term: Option<u32>,

    /// Current loan: monthly payments already made
    #[arg(long, default_value_t = 0)]
    pub payments_made: u32,

    /// Current loan: monthly PMI
    #[arg(long)]
    pub current_pmi: Option<Decimal>,

    /// Home value (0 when unknown; LTV is then unbounded)
    #[arg(long)]
    pub home_value: Option<Decimal>,

    /// Years you expect to keep the mortgage
    #[arg(long)]
    pub horizon_years: Option<Decimal>,

    /// Discount rate for NPV, APR in percent
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Offer: new principal (defaults to today's balance on the current loan)
    #[arg(long)]
    pub new_principal: Option<Decimal>,

    /// Offer: APR in percent
    #[arg(long)]
    pub new_rate: Option<Decimal>,

    /// Offer: term in years (defaults to years left, minimum 15)
    #[arg(long)]
    pub new_term: Option<u32>,

    /// Offer: points as percent of the new principal
    #[arg(long)]
    pub points: Option<Decimal>,

    /// Offer: lender credits
    #[arg(long)]
    pub lender_credits: Option<Decimal>,

    /// Offer: other closing costs
    #[arg(long)]
    pub closing_costs: Option<Decimal>,

    /// Offer: monthly PMI
    #[arg(long)]
    pub new_pmi: Option<Decimal>,

    /// Offer: extra principal paid every month
    #[arg(long)]
    pub extra_principal: Option<Decimal>,

    /// Periods allowed past each loan's nominal term before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_OVERRUN_PERIODS)]
    pub max_overrun_periods: u32,

    /// Date of the next payment (YYYY-MM-DD); dates every schedule row
    #[arg(long)]
    pub first_payment_date: Option<NaiveDate>,
}

/// Arguments for exporting both schedules side by side
#[derive(Args)]
pub struct ExportSchedulesArgs {
    #[command(flatten)]
    pub refinance: RefinanceArgs,

    /// Destination CSV file (stdout when omitted)
    #[arg(long)]
    pub out: Option<String>,
}

fn refinance_input(args: &RefinanceArgs) -> Result<RefinanceInput, Box<dyn std::error::Error>> {
    if let Some(loaded) = input::load(args.input.as_deref())? {
        return Ok(loaded);
    }

    let current = CurrentLoan {
        original_principal: args
            .original_principal
            .ok_or("--original-principal is required (or provide --input)")?,
        apr_pct: args
            .current_rate
            .ok_or("--current-rate is required (or provide --input)")?,
        original_term_years: args
            .original_term
            .ok_or("--original-term is required (or provide --input)")?,
        payments_made: args.payments_made,
        monthly_pmi: args.current_pmi.unwrap_or(Decimal::ZERO),
    };

    let new_principal = match args.new_principal {
        Some(p) => p,
        None => current.remaining_principal()?.round_dp(2),
    };
    let offer = RefiOffer {
        new_principal,
        apr_pct: args
            .new_rate
            .ok_or("--new-rate is required (or provide --input)")?,
        term_years: args
            .new_term
            .unwrap_or_else(|| current.suggested_refi_term_years()),
        points_pct_of_loan: args.points.unwrap_or(Decimal::ZERO),
        lender_credits: args.lender_credits.unwrap_or(Decimal::ZERO),
        other_closing_costs: args.closing_costs.unwrap_or(Decimal::ZERO),
        monthly_pmi: args.new_pmi.unwrap_or(Decimal::ZERO),
        extra_principal_per_month: args.extra_principal.unwrap_or(Decimal::ZERO),
    };

    Ok(RefinanceInput {
        current,
        offer,
        home_value: args
            .home_value
            .ok_or("--home-value is required (or provide --input)")?,
        horizon_years: args.horizon_years.unwrap_or(dec!(7)),
        discount_rate_pct: args.discount_rate.unwrap_or(dec!(5)),
        max_overrun_periods: args.max_overrun_periods,
        first_payment_date: args.first_payment_date,
    })
}

pub fn run_refinance(args: RefinanceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let refi_input = refinance_input(&args)?;
    let result = analysis::analyze_refinance(&refi_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Write the merged current/new schedules as CSV. Returns a short summary
/// when writing to a file, `Value::Null` when the CSV went to stdout.
pub fn run_export_schedules(args: ExportSchedulesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let refi_input = refinance_input(&args.refinance)?;
    let analysis = analysis::analyze_refinance(&refi_input)?.result;
    let merged = merge_schedules(&analysis.current_schedule, &analysis.new_schedule);

    match args.out {
        Some(path) => {
            let file = File::create(&path)
                .map_err(|e| format!("Failed to create '{}': {}", path, e))?;
            csv_out::write_schedule_export(file, &merged)?;
            tracing::info!(rows = merged.len(), path = %path, "wrote schedule export");
            Ok(json!({
                "path": path,
                "rows": merged.len(),
                "current_periods": analysis.current_schedule.len(),
                "new_periods": analysis.new_schedule.len(),
            }))
        }
        None => {
            csv_out::write_schedule_export(io::stdout().lock(), &merged)?;
            Ok(Value::Null)
        }
    }
}
