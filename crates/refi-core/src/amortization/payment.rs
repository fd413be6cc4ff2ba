//! Level-payment and remaining-balance formulas for fully amortizing,
//! fixed-rate loans.
//!
//! Rates are quoted as APR percent and converted to a per-period rate
//! `r = apr / 100 / periods_per_year`. Signs are not validated here: these
//! are the raw formulas, and callers feeding them negative principals or
//! rates get whatever the algebra produces.

use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::RefiError;
use crate::time_value::growth_factor;
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Rate, Years};
use crate::RefiResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Monthly payments, the frequency every US fixed-rate mortgage uses.
pub const MONTHS_PER_YEAR: u32 = 12;

/// Per-period rates smaller than this are treated as interest-free.
const ZERO_RATE_TOLERANCE: Decimal = dec!(0.000000001);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Loan terms for a standalone payment / balance calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanInput {
    pub principal: Money,
    pub annual_rate_pct: Percent,
    pub years: Years,
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: u32,
    /// When set, also project the balance after this many payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payments_made: Option<u32>,
}

pub(crate) fn default_periods_per_year() -> u32 {
    MONTHS_PER_YEAR
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanPaymentOutput {
    pub payment: Money,
    pub periodic_rate: Rate,
    pub periods: Decimal,
    /// Level payment times the nominal period count.
    pub total_of_payments: Money,
    pub total_interest: Money,
    pub remaining_balance: Option<Money>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Per-period rate as a decimal from an APR quoted in percent.
pub fn periodic_rate(annual_rate_pct: Percent, periods_per_year: u32) -> RefiResult<Rate> {
    validate_frequency(periods_per_year)?;
    Ok(annual_rate_pct / dec!(100) / Decimal::from(periods_per_year))
}

/// Nominal number of payments, `years × periods_per_year` (may be fractional).
pub fn period_count(years: Years, periods_per_year: u32) -> RefiResult<Decimal> {
    validate_frequency(periods_per_year)?;
    Ok(years * Decimal::from(periods_per_year))
}

pub(crate) fn is_effectively_zero(rate: Rate) -> bool {
    rate.abs() < ZERO_RATE_TOLERANCE
}

fn validate_frequency(periods_per_year: u32) -> RefiResult<()> {
    if periods_per_year == 0 {
        return Err(RefiError::InvalidInput {
            field: "periods_per_year".into(),
            reason: "Payment frequency must be at least one period per year".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Level payment per period for a fully amortizing loan.
///
/// `P = r·L / (1 − (1 + r)^−n)` with `n = years × periods_per_year`.
///
/// Two degenerate cases short-circuit the closed form:
/// * `n == 0`: the whole principal is due immediately and is returned as is.
/// * `r ≈ 0`: straight-line payoff, `principal / n`.
pub fn payment(
    principal: Money,
    annual_rate_pct: Percent,
    years: Years,
    periods_per_year: u32,
) -> RefiResult<Money> {
    let n = period_count(years, periods_per_year)?;
    if n.is_zero() {
        return Ok(principal);
    }

    let r = periodic_rate(annual_rate_pct, periods_per_year)?;
    if is_effectively_zero(r) {
        return Ok(principal / n);
    }

    let denom = Decimal::ONE - growth_factor(r, -n)?;
    if denom.is_zero() {
        return Err(RefiError::DivisionByZero {
            context: "level payment annuity factor".into(),
        });
    }

    Ok(r * principal / denom)
}

/// Principal still owed after `payments_made` level payments.
///
/// Uses the future-value decomposition
/// `L(1 + r)^k − P((1 + r)^k − 1) / r`, or `L − P·k` for an interest-free loan.
///
/// `payments_made` is not clamped. Keeping it within
/// `0..=years_total × periods_per_year` is the caller's job; past the end of
/// the term the result goes negative.
pub fn remaining_balance(
    original_principal: Money,
    annual_rate_pct: Percent,
    years_total: Years,
    payments_made: u32,
    periods_per_year: u32,
) -> RefiResult<Money> {
    let r = periodic_rate(annual_rate_pct, periods_per_year)?;
    let pmt = payment(
        original_principal,
        annual_rate_pct,
        years_total,
        periods_per_year,
    )?;
    let k = Decimal::from(payments_made);

    if is_effectively_zero(r) {
        return Ok(original_principal - pmt * k);
    }

    let factor = growth_factor(r, k)?;
    Ok(original_principal * factor - pmt * ((factor - Decimal::ONE) / r))
}

/// Level payment, lifetime totals and (optionally) the current balance for
/// one set of loan terms, wrapped in the output envelope.
pub fn calculate_loan_payment(input: &LoanInput) -> RefiResult<ComputationOutput<LoanPaymentOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let periods = period_count(input.years, input.periods_per_year)?;
    let periodic = periodic_rate(input.annual_rate_pct, input.periods_per_year)?;
    let pmt = payment(
        input.principal,
        input.annual_rate_pct,
        input.years,
        input.periods_per_year,
    )?;

    if periods.is_zero() {
        warnings.push("Zero-length term: the whole principal is due immediately".into());
    }

    let remaining = match input.payments_made {
        Some(k) => {
            if Decimal::from(k) > periods {
                warnings.push(format!(
                    "{k} payments exceed the {periods}-period term; the projected balance is past payoff"
                ));
            }
            Some(remaining_balance(
                input.principal,
                input.annual_rate_pct,
                input.years,
                k,
                input.periods_per_year,
            )?)
        }
        None => None,
    };

    let total_of_payments = if periods.is_zero() { pmt } else { pmt * periods };
    let output = LoanPaymentOutput {
        payment: pmt,
        periodic_rate: periodic,
        periods,
        total_of_payments,
        total_interest: total_of_payments - input.principal,
        remaining_balance: remaining,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Level-payment annuity (closed form)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const TOL: Decimal = dec!(0.01);

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

    #[test]
    fn test_payment_30yr_6pct() {
        let pmt = payment(dec!(300_000), dec!(6), dec!(30), MONTHS_PER_YEAR).unwrap();
        assert_close(pmt, dec!(1798.65), TOL, "30y 6% payment");
    }

    #[test]
    fn test_payment_zero_rate_is_straight_line() {
        let pmt = payment(dec!(300_000), Decimal::ZERO, dec!(30), MONTHS_PER_YEAR).unwrap();
        assert_eq!(pmt, dec!(300_000) / dec!(360));
    }

    #[test]
    fn test_payment_zero_term_returns_principal() {
        let pmt = payment(dec!(100_000), dec!(5), Decimal::ZERO, MONTHS_PER_YEAR).unwrap();
        assert_eq!(pmt, dec!(100_000));
    }

    #[test]
    fn test_payment_tiny_rate_treated_as_zero() {
        // 0.0000001% APR → r ≈ 8e-11 per month, below tolerance
        let pmt = payment(dec!(1200), dec!(0.0000001), dec!(1), MONTHS_PER_YEAR).unwrap();
        assert_eq!(pmt, dec!(100));
    }

    #[test]
    fn test_payment_fractional_term() {
        // 27.5 years = 330 payments; must sit between the 27y and 28y payments
        let p275 = payment(dec!(350_000), dec!(6.5), dec!(27.5), MONTHS_PER_YEAR).unwrap();
        let p27 = payment(dec!(350_000), dec!(6.5), dec!(27), MONTHS_PER_YEAR).unwrap();
        let p28 = payment(dec!(350_000), dec!(6.5), dec!(28), MONTHS_PER_YEAR).unwrap();
        assert!(p275 < p27 && p275 > p28);
    }

    #[test]
    fn test_payment_annual_frequency() {
        // 10,000 over 2 years at 10% annual: 10000 * 0.1 / (1 - 1.1^-2) = 5761.90
        let pmt = payment(dec!(10_000), dec!(10), dec!(2), 1).unwrap();
        assert_close(pmt, dec!(5761.90), TOL, "annual payment");
    }

    #[test]
    fn test_payment_rejects_zero_frequency() {
        let err = payment(dec!(10_000), dec!(5), dec!(10), 0).unwrap_err();
        match err {
            RefiError::InvalidInput { field, .. } => assert_eq!(field, "periods_per_year"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_remaining_balance_after_60_payments() {
        let bal =
            remaining_balance(dec!(300_000), dec!(6), dec!(30), 60, MONTHS_PER_YEAR).unwrap();
        assert_close(bal, dec!(279_163.07), TOL, "balance after 5 years");
    }

    #[test]
    fn test_remaining_balance_no_payments_is_principal() {
        let bal = remaining_balance(dec!(300_000), dec!(6), dec!(30), 0, MONTHS_PER_YEAR).unwrap();
        assert_close(bal, dec!(300_000), dec!(0.0000001), "balance at origination");
    }

    #[test]
    fn test_remaining_balance_full_term_is_zero() {
        let bal =
            remaining_balance(dec!(300_000), dec!(6), dec!(30), 360, MONTHS_PER_YEAR).unwrap();
        assert_close(bal, Decimal::ZERO, dec!(1), "balance at maturity");
    }

    #[test]
    fn test_remaining_balance_zero_rate_is_linear() {
        let bal =
            remaining_balance(dec!(300_000), Decimal::ZERO, dec!(30), 60, MONTHS_PER_YEAR).unwrap();
        let expected = dec!(300_000) - (dec!(300_000) / dec!(360)) * dec!(60);
        assert_close(bal, expected, TOL, "zero-rate balance");
    }

    #[test]
    fn test_remaining_balance_past_term_goes_negative() {
        let bal =
            remaining_balance(dec!(120_000), Decimal::ZERO, dec!(10), 130, MONTHS_PER_YEAR).unwrap();
        assert_eq!(bal, dec!(-10_000));
    }

    #[test]
    fn test_calculate_loan_payment_totals() {
        let input = LoanInput {
            principal: dec!(300_000),
            annual_rate_pct: dec!(6),
            years: dec!(30),
            periods_per_year: MONTHS_PER_YEAR,
            payments_made: Some(60),
        };
        let out = calculate_loan_payment(&input).unwrap();
        let r = &out.result;
        assert_eq!(r.periods, dec!(360));
        assert_eq!(r.periodic_rate, dec!(0.005));
        assert_close(r.total_interest, dec!(347_514.57), TOL, "closed-form interest");
        assert_close(r.remaining_balance.unwrap(), dec!(279_163.07), TOL, "balance");
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_calculate_loan_payment_warns_past_term() {
        let input = LoanInput {
            principal: dec!(120_000),
            annual_rate_pct: Decimal::ZERO,
            years: dec!(10),
            periods_per_year: MONTHS_PER_YEAR,
            payments_made: Some(130),
        };
        let out = calculate_loan_payment(&input).unwrap();
        assert_eq!(out.result.remaining_balance, Some(dec!(-10_000)));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_periodic_rate() {
        assert_eq!(periodic_rate(dec!(6), 12).unwrap(), dec!(0.005));
    }
}
