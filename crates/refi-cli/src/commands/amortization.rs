use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use refi_core::amortization::payment::{self, LoanInput, MONTHS_PER_YEAR};
use refi_core::amortization::schedule::{
    self, ScheduleInput, ScheduleOptions, DEFAULT_MAX_OVERRUN_PERIODS,
};

use crate::input;

/// Loan terms shared by the payment and balance commands
#[derive(Args)]
pub struct LoanTermsArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan principal
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual rate in percent (e.g. 6.5 for 6.5%)
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Term in years (fractions allowed)
    #[arg(long)]
    pub years: Option<Decimal>,

    /// Payments per year
    #[arg(long, default_value_t = MONTHS_PER_YEAR)]
    pub periods_per_year: u32,
}

/// Arguments for the level-payment calculation
#[derive(Args)]
pub struct PaymentArgs {
    #[command(flatten)]
    pub loan: LoanTermsArgs,
}

/// Arguments for the remaining-balance projection
#[derive(Args)]
pub struct RemainingBalanceArgs {
    #[command(flatten)]
    pub loan: LoanTermsArgs,

    /// Payments already made
    #[arg(long)]
    pub payments_made: Option<u32>,
}

/// Arguments for a full amortization schedule
#[derive(Args)]
pub struct ScheduleArgs {
    #[command(flatten)]
    pub loan: LoanTermsArgs,

    /// Extra principal paid every period
    #[arg(long)]
    pub extra_principal: Option<Decimal>,

    /// Periods allowed past the nominal term before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_OVERRUN_PERIODS)]
    pub max_overrun_periods: u32,

    /// Date of the first payment (YYYY-MM-DD)
    #[arg(long)]
    pub first_payment_date: Option<NaiveDate>,
}

fn loan_input(args: &LoanTermsArgs, payments_made: Option<u32>) -> Result<LoanInput, Box<dyn std::error::Error>> {
    Ok(LoanInput {
        principal: args
            .principal
            .ok_or("--principal is required (or provide --input)")?,
        annual_rate_pct: args.rate.ok_or("--rate is required (or provide --input)")?,
        years: args.years.ok_or("--years is required (or provide --input)")?,
        periods_per_year: args.periods_per_year,
        payments_made,
    })
}

pub fn run_payment(args: PaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan: LoanInput = match input::load(args.loan.input.as_deref())? {
        Some(loan) => loan,
        None => loan_input(&args.loan, None)?,
    };
    let result = payment::calculate_loan_payment(&loan)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_remaining_balance(args: RemainingBalanceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let loan: LoanInput = match input::load(args.loan.input.as_deref())? {
        Some(loan) => loan,
        None => {
            let made = args
                .payments_made
                .ok_or("--payments-made is required (or provide --input)")?;
            loan_input(&args.loan, Some(made))?
        }
    };
    if loan.payments_made.is_none() {
        return Err("payments_made is required for a balance projection".into());
    }
    let result = payment::calculate_loan_payment(&loan)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let schedule_input: ScheduleInput = match input::load(args.loan.input.as_deref())? {
        Some(si) => si,
        None => {
            let loan = loan_input(&args.loan, None)?;
            ScheduleInput {
                principal: loan.principal,
                annual_rate_pct: loan.annual_rate_pct,
                years: loan.years,
                options: ScheduleOptions {
                    periods_per_year: loan.periods_per_year,
                    extra_principal_per_period: args.extra_principal.unwrap_or(Decimal::ZERO),
                    max_overrun_periods: args.max_overrun_periods,
                    first_payment_date: args.first_payment_date,
                },
            }
        }
    };
    let result = schedule::build_schedule(&schedule_input)?;
    Ok(serde_json::to_value(result)?)
}
