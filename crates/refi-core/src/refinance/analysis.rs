//! End-to-end refinance comparison: today's loan against one offer.
//!
//! Everything runs monthly. The current loan is re-amortized from today over
//! its remaining term; the offer is amortized from scratch with its extra
//! principal. The two payment streams are compared month by month over the
//! borrower's planning horizon.

use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::economics::{
    break_even_months, compute_ltv, effective_refi_costs, npv_of_refi, LoanToValue,
};
use super::loans::{CurrentLoan, RefiOffer};
use super::savings::{build_savings_stream, cumulative_savings, horizon_months};
use crate::amortization::payment::{payment, MONTHS_PER_YEAR};
use crate::amortization::schedule::{
    amortization_schedule, AmortizationSchedule, ScheduleOptions, DEFAULT_MAX_OVERRUN_PERIODS,
};
use crate::error::RefiError;
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Years};
use crate::RefiResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// LTV above which lenders normally require mortgage insurance.
const PMI_LTV_THRESHOLD: Decimal = dec!(0.80);

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Everything needed to evaluate one refinance offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinanceInput {
    pub current: CurrentLoan,
    pub offer: RefiOffer,
    /// Current market value of the home.
    pub home_value: Money,
    /// How long the borrower expects to keep the mortgage.
    pub horizon_years: Years,
    /// Borrower's discount rate for NPV, APR percent.
    pub discount_rate_pct: Percent,
    /// Safety cap passed to both schedules.
    #[serde(default = "default_max_overrun_periods")]
    pub max_overrun_periods: u32,
    /// Date of the next payment; dates every schedule row when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_payment_date: Option<NaiveDate>,
}

fn default_max_overrun_periods() -> u32 {
    DEFAULT_MAX_OVERRUN_PERIODS
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinanceAnalysis {
    /// Principal owed on the current loan today.
    pub remaining_principal: Money,
    pub remaining_term_years: Years,
    /// P&I on the current loan re-amortized over its remaining term.
    pub current_monthly_payment: Money,
    pub new_monthly_payment: Money,
    /// New minus current P&I (negative when the offer lowers the payment).
    pub monthly_payment_change: Money,
    /// Current minus new P&I.
    pub monthly_savings_pi: Money,
    /// Current minus new P&I, each including its PMI.
    pub monthly_savings_total: Money,
    pub current_ltv: LoanToValue,
    pub new_ltv: LoanToValue,
    pub upfront_costs: Money,
    /// Months of total savings to recover upfront costs; `None` if never.
    pub break_even_months: Option<Decimal>,
    pub npv: Money,
    pub horizon_months: u32,
    pub current_total_interest: Money,
    pub new_total_interest: Money,
    /// Interest avoided if both loans are held to payoff.
    pub interest_saved: Money,
    pub savings_stream: Vec<Money>,
    pub cumulative_savings: Vec<Money>,
    pub current_schedule: AmortizationSchedule,
    pub new_schedule: AmortizationSchedule,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compare the current mortgage with a refinance offer.
pub fn analyze_refinance(
    input: &RefinanceInput,
) -> RefiResult<ComputationOutput<RefinanceAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    validate_input(input)?;

    let current = &input.current;
    let offer = &input.offer;
    let months = horizon_months(input.horizon_years)?;

    let remaining_principal = current.remaining_principal()?;
    let remaining_term_years = current.remaining_term_years();
    let current_monthly_payment = payment(
        remaining_principal,
        current.apr_pct,
        remaining_term_years,
        MONTHS_PER_YEAR,
    )?;
    let new_monthly_payment = offer.monthly_payment()?;

    let base_options = ScheduleOptions {
        max_overrun_periods: input.max_overrun_periods,
        first_payment_date: input.first_payment_date,
        ..ScheduleOptions::default()
    };
    let current_schedule = amortization_schedule(
        remaining_principal,
        current.apr_pct,
        remaining_term_years,
        &base_options,
    )?;
    let new_schedule = amortization_schedule(
        offer.new_principal,
        offer.apr_pct,
        Decimal::from(offer.term_years),
        &base_options
            .clone()
            .with_extra_principal(offer.extra_principal_per_month),
    )?;

    let current_ltv = compute_ltv(remaining_principal, input.home_value);
    let new_ltv = compute_ltv(offer.new_principal, input.home_value);
    let upfront_costs = effective_refi_costs(offer);
    let monthly_discount_rate =
        input.discount_rate_pct / dec!(100) / Decimal::from(MONTHS_PER_YEAR);

    let monthly_savings_pi = current_monthly_payment - new_monthly_payment;
    let monthly_savings_total = (current_monthly_payment + current.monthly_pmi)
        - (new_monthly_payment + offer.monthly_pmi);

    let savings_stream = build_savings_stream(
        &current_schedule,
        &new_schedule,
        months,
        current.monthly_pmi,
        offer.monthly_pmi,
    );
    let npv = npv_of_refi(&savings_stream, monthly_discount_rate, upfront_costs)?;
    let break_even = break_even_months(upfront_costs, monthly_savings_total);

    let current_total_interest = current_schedule.total_interest();
    let new_total_interest = new_schedule.total_interest();

    collect_warnings(
        &mut warnings,
        input,
        months,
        break_even,
        &new_ltv,
        &current_schedule,
        &new_schedule,
    );

    tracing::debug!(
        npv = %npv,
        upfront_costs = %upfront_costs,
        monthly_savings_total = %monthly_savings_total,
        horizon_months = months,
        "refinance analysis complete"
    );

    let output = RefinanceAnalysis {
        remaining_principal,
        remaining_term_years,
        current_monthly_payment,
        new_monthly_payment,
        monthly_payment_change: new_monthly_payment - current_monthly_payment,
        monthly_savings_pi,
        monthly_savings_total,
        current_ltv,
        new_ltv,
        upfront_costs,
        break_even_months: break_even,
        npv,
        horizon_months: months,
        current_total_interest,
        new_total_interest,
        interest_saved: current_total_interest - new_total_interest,
        cumulative_savings: cumulative_savings(&savings_stream),
        savings_stream,
        current_schedule,
        new_schedule,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Level-payment refinance comparison (break-even, NPV of monthly savings)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn collect_warnings(
    warnings: &mut Vec<String>,
    input: &RefinanceInput,
    months: u32,
    break_even: Option<Decimal>,
    new_ltv: &LoanToValue,
    current_schedule: &AmortizationSchedule,
    new_schedule: &AmortizationSchedule,
) {
    match break_even {
        None => warnings.push(
            "Monthly payment including PMI does not fall; upfront costs are never recovered"
                .into(),
        ),
        Some(bem) if bem > Decimal::from(months) => warnings.push(format!(
            "Break-even at {:.1} months falls beyond the {}-month horizon",
            bem, months
        )),
        Some(_) => {}
    }

    if input.home_value <= Decimal::ZERO {
        warnings.push("Home value is not positive; LTV is unbounded".into());
    } else if new_ltv.exceeds(PMI_LTV_THRESHOLD) && input.offer.monthly_pmi.is_zero() {
        warnings.push(format!(
            "New LTV is {new_ltv} with no PMI entered; lenders usually require mortgage insurance above 80%"
        ));
    }

    if !input.current.monthly_pmi.is_zero() || !input.offer.monthly_pmi.is_zero() {
        warnings.push(
            "PMI is modelled as a flat monthly amount for the whole horizon; in practice it may drop once LTV reaches 80%"
                .into(),
        );
    }

    for (label, schedule) in [("Current", current_schedule), ("New", new_schedule)] {
        if !schedule.paid_off {
            warnings.push(format!(
                "{label} loan schedule stopped after {} periods with {} still owed",
                schedule.len(),
                schedule.final_balance().round_dp(2)
            ));
        }
    }
}

fn validate_input(input: &RefinanceInput) -> RefiResult<()> {
    let current = &input.current;
    let offer = &input.offer;

    let non_negative = [
        ("current.original_principal", current.original_principal),
        ("current.apr_pct", current.apr_pct),
        ("current.monthly_pmi", current.monthly_pmi),
        ("offer.new_principal", offer.new_principal),
        ("offer.apr_pct", offer.apr_pct),
        ("offer.points_pct_of_loan", offer.points_pct_of_loan),
        ("offer.lender_credits", offer.lender_credits),
        ("offer.other_closing_costs", offer.other_closing_costs),
        ("offer.monthly_pmi", offer.monthly_pmi),
        ("offer.extra_principal_per_month", offer.extra_principal_per_month),
        ("discount_rate_pct", input.discount_rate_pct),
    ];
    for (field, value) in non_negative {
        if value < Decimal::ZERO {
            return Err(RefiError::InvalidInput {
                field: field.into(),
                reason: "Must be non-negative".into(),
            });
        }
    }

    if current.original_term_years == 0 {
        return Err(RefiError::InvalidInput {
            field: "current.original_term_years".into(),
            reason: "Original term must be at least one year".into(),
        });
    }
    if current.payments_made > current.total_payments() {
        return Err(RefiError::InvalidInput {
            field: "current.payments_made".into(),
            reason: format!(
                "Cannot exceed the {} payments of the original term",
                current.total_payments()
            ),
        });
    }
    if offer.term_years == 0 {
        return Err(RefiError::InvalidInput {
            field: "offer.term_years".into(),
            reason: "New term must be at least one year".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn assert_close(actual: Decimal, expected: Decimal, tol: Decimal, msg: &str) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "{}: expected ~{}, got {} (diff = {})",
            msg,
            expected,
            actual,
            diff
        );
    }

    fn standard_input() -> RefinanceInput {
        let mut offer = RefiOffer::new(dec!(386_299.89), dec!(6.1), 27);
        offer.other_closing_costs = dec!(4000);
        RefinanceInput {
            current: CurrentLoan {
                original_principal: dec!(400_000),
                apr_pct: dec!(6.75),
                original_term_years: 30,
                payments_made: 36,
                monthly_pmi: Decimal::ZERO,
            },
            offer,
            home_value: dec!(520_000),
            horizon_years: dec!(7),
            discount_rate_pct: dec!(5),
            max_overrun_periods: DEFAULT_MAX_OVERRUN_PERIODS,
            first_payment_date: None,
        }
    }

    fn run(input: &RefinanceInput) -> RefinanceAnalysis {
        analyze_refinance(input).unwrap().result
    }

    #[test]
    fn test_standard_rate_drop() {
        let out = run(&standard_input());
        assert_close(out.remaining_principal, dec!(386_299.89), dec!(0.01), "remaining");
        assert_eq!(out.remaining_term_years, dec!(27));
        assert_close(out.current_monthly_payment, dec!(2594.39), dec!(0.01), "current P&I");
        assert_close(out.new_monthly_payment, dec!(2434.63), dec!(0.01), "new P&I");
        assert_close(out.monthly_savings_pi, dec!(159.77), dec!(0.01), "P&I savings");
        assert_eq!(out.monthly_savings_pi, out.monthly_savings_total);
        assert_eq!(out.monthly_payment_change, -out.monthly_savings_pi);
        assert_eq!(out.upfront_costs, dec!(4000));
        assert_close(out.break_even_months.unwrap(), dec!(25.04), dec!(0.01), "break-even");
        assert_close(out.npv, dec!(7303.74), dec!(0.05), "NPV");
        assert_eq!(out.horizon_months, 84);
        assert_eq!(out.savings_stream.len(), 84);
        assert_eq!(out.cumulative_savings.len(), 84);
        assert_eq!(out.current_schedule.len(), 324);
        assert_eq!(out.new_schedule.len(), 324);
        assert_close(out.interest_saved, dec!(51_764.21), dec!(1), "interest saved");
    }

    #[test]
    fn test_current_ltv() {
        let out = run(&standard_input());
        let ltv = out.current_ltv.ratio().unwrap();
        assert_close(ltv, dec!(0.7429), dec!(0.0001), "current LTV");
    }

    #[test]
    fn test_cumulative_ends_at_stream_sum() {
        let out = run(&standard_input());
        let total: Decimal = out.savings_stream.iter().sum();
        assert_eq!(*out.cumulative_savings.last().unwrap(), total);
    }

    #[test]
    fn test_no_savings_means_no_break_even() {
        let mut input = standard_input();
        input.offer.apr_pct = dec!(7.5);
        let result = analyze_refinance(&input).unwrap();
        assert!(result.result.break_even_months.is_none());
        assert!(result.result.npv < Decimal::ZERO);
        assert!(result.warnings.iter().any(|w| w.contains("never recovered")));
    }

    #[test]
    fn test_extreme_discount_rate_over_long_horizon() {
        let mut input = standard_input();
        input.discount_rate_pct = dec!(300);
        input.horizon_years = dec!(30);
        let out = run(&input);
        assert_eq!(out.horizon_months, 360);
        // Only the first few months of savings carry any weight at 25%/month.
        assert!(out.npv < Decimal::ZERO);
        assert!(out.npv > -out.upfront_costs);
    }

    #[test]
    fn test_extra_principal_on_new_loan() {
        let mut input = standard_input();
        input.offer.extra_principal_per_month = dec!(300);
        let out = run(&input);
        assert_eq!(out.new_schedule.len(), 250);
        // Break-even is on scheduled P&I, so extra principal does not move it.
        assert_close(out.break_even_months.unwrap(), dec!(25.04), dec!(0.01), "break-even");
        assert!(out.npv < Decimal::ZERO);
        assert!(out.interest_saved > dec!(150_000));
    }

    #[test]
    fn test_zero_home_value_unbounded_ltv() {
        let mut input = standard_input();
        input.home_value = Decimal::ZERO;
        let result = analyze_refinance(&input).unwrap();
        assert!(result.result.current_ltv.is_unbounded());
        assert!(result.result.new_ltv.is_unbounded());
        assert!(result.warnings.iter().any(|w| w.contains("unbounded")));
    }

    #[test]
    fn test_zero_horizon() {
        let mut input = standard_input();
        input.horizon_years = Decimal::ZERO;
        let out = run(&input);
        assert!(out.savings_stream.is_empty());
        assert_eq!(out.npv, dec!(-4000));
    }

    #[test]
    fn test_negative_horizon_rejected() {
        let mut input = standard_input();
        input.horizon_years = dec!(-2);
        assert!(matches!(
            analyze_refinance(&input),
            Err(RefiError::InvalidHorizon { .. })
        ));
    }

    #[test]
    fn test_break_even_beyond_horizon_warns() {
        let mut input = standard_input();
        input.horizon_years = dec!(1);
        let result = analyze_refinance(&input).unwrap();
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("beyond the 12-month horizon")));
    }

    #[test]
    fn test_pmi_affects_total_savings() {
        let mut input = standard_input();
        input.current.monthly_pmi = dec!(100);
        input.offer.monthly_pmi = dec!(50);
        let out = run(&input);
        assert_eq!(
            out.monthly_savings_total,
            out.monthly_savings_pi + dec!(50)
        );
        assert_close(out.savings_stream[0], out.monthly_savings_total, dec!(0.0000001), "month 1");
    }

    #[test]
    fn test_high_ltv_without_pmi_warns() {
        let mut input = standard_input();
        input.home_value = dec!(400_000);
        let result = analyze_refinance(&input).unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("mortgage insurance")));
    }

    #[test]
    fn test_payments_made_beyond_term_rejected() {
        let mut input = standard_input();
        input.current.payments_made = 361;
        match analyze_refinance(&input) {
            Err(RefiError::InvalidInput { field, .. }) => {
                assert_eq!(field, "current.payments_made")
            }
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_amount_rejected() {
        let mut input = standard_input();
        input.offer.lender_credits = dec!(-1);
        assert!(matches!(
            analyze_refinance(&input),
            Err(RefiError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_metadata_populated() {
        let result = analyze_refinance(&standard_input()).unwrap();
        assert!(!result.methodology.is_empty());
        assert_eq!(result.metadata.precision, "rust_decimal_128bit");
        assert_eq!(result.assumptions["horizon_years"], serde_json::json!("7"));
    }
}
