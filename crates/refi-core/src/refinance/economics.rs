//! Refinance economics: upfront cost, break-even, NPV and loan-to-value.

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::loans::RefiOffer;
use crate::time_value::npv;
use crate::types::{Money, Rate};
use crate::RefiResult;

/// Loan-to-value ratio, or `Unbounded` when the home value is not positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanToValue {
    Ratio(Decimal),
    Unbounded,
}

impl LoanToValue {
    pub fn ratio(&self) -> Option<Decimal> {
        match self {
            LoanToValue::Ratio(r) => Some(*r),
            LoanToValue::Unbounded => None,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, LoanToValue::Unbounded)
    }

    /// `f64` view for charting; `Unbounded` is positive infinity.
    pub fn as_f64(&self) -> f64 {
        match self {
            LoanToValue::Ratio(r) => r.to_f64().unwrap_or(f64::INFINITY),
            LoanToValue::Unbounded => f64::INFINITY,
        }
    }

    pub fn exceeds(&self, threshold: Decimal) -> bool {
        match self {
            LoanToValue::Ratio(r) => *r > threshold,
            LoanToValue::Unbounded => true,
        }
    }
}

impl fmt::Display for LoanToValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanToValue::Ratio(r) => write!(f, "{:.1}%", r * dec!(100)),
            LoanToValue::Unbounded => write!(f, "—"),
        }
    }
}

/// Cash due at closing: points net of lender credits (never below zero),
/// plus other closing costs.
pub fn effective_refi_costs(offer: &RefiOffer) -> Money {
    let points_cost = offer.points_pct_of_loan / dec!(100) * offer.new_principal;
    (points_cost - offer.lender_credits).max(Decimal::ZERO) + offer.other_closing_costs
}

/// Months of savings needed to recover `total_costs`.
///
/// `None` when the refinance saves nothing per month, which is different
/// from breaking even immediately (`Some(0)` for zero costs).
pub fn break_even_months(total_costs: Money, monthly_savings: Money) -> Option<Decimal> {
    if monthly_savings <= Decimal::ZERO {
        return None;
    }
    Some(total_costs / monthly_savings)
}

/// Present value of monthly savings, month 1 onward, less the upfront cost.
pub fn npv_of_refi(
    savings_stream: &[Money],
    monthly_discount_rate: Rate,
    upfront_costs: Money,
) -> RefiResult<Money> {
    let mut flows = Vec::with_capacity(savings_stream.len() + 1);
    flows.push(-upfront_costs);
    flows.extend_from_slice(savings_stream);
    npv(monthly_discount_rate, &flows)
}

pub fn compute_ltv(principal_owed: Money, home_value: Money) -> LoanToValue {
    if home_value <= Decimal::ZERO {
        return LoanToValue::Unbounded;
    }
    LoanToValue::Ratio(principal_owed / home_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_refi_offer() -> RefiOffer {
        RefiOffer {
            new_principal: dec!(380_000),
            apr_pct: dec!(5.5),
            term_years: 25,
            points_pct_of_loan: dec!(0.5),
            lender_credits: dec!(500),
            other_closing_costs: dec!(2000),
            monthly_pmi: dec!(50),
            extra_principal_per_month: Decimal::ZERO,
        }
    }

    #[test]
    fn test_effective_refi_costs() {
        // 0.005 * 380,000 - 500 + 2,000
        assert_eq!(effective_refi_costs(&sample_refi_offer()), dec!(3400));
    }

    #[test]
    fn test_credits_cannot_make_points_negative() {
        let mut offer = sample_refi_offer();
        offer.lender_credits = dec!(5000);
        assert_eq!(effective_refi_costs(&offer), dec!(2000));
    }

    #[test]
    fn test_break_even_months() {
        assert_eq!(break_even_months(dec!(5000), dec!(200)), Some(dec!(25)));
        assert_eq!(break_even_months(dec!(5000), Decimal::ZERO), None);
        assert_eq!(break_even_months(dec!(5000), dec!(-100)), None);
        assert_eq!(break_even_months(Decimal::ZERO, dec!(150)), Some(Decimal::ZERO));
    }

    #[test]
    fn test_npv_of_level_savings() {
        let savings = vec![dec!(100); 120];
        let value = npv_of_refi(&savings, dec!(0.05) / dec!(12), dec!(5000)).unwrap();
        // 100 * (1 - (1 + 0.05/12)^-120) / (0.05/12) = 9428.14
        assert!((value - dec!(4428.14)).abs() < dec!(0.01), "got {value}");
    }

    #[test]
    fn test_npv_at_300_pct_over_thirty_years() {
        let savings = vec![dec!(100); 360];
        let value = npv_of_refi(&savings, dec!(300) / dec!(100) / dec!(12), dec!(1000)).unwrap();
        // 100 / 0.25 = 400 of present value against 1000 upfront
        assert!((value - dec!(-600)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_npv_empty_stream_is_negative_cost() {
        let value = npv_of_refi(&[], dec!(0.004), dec!(3400)).unwrap();
        assert_eq!(value, dec!(-3400));
    }

    #[test]
    fn test_npv_zero_discount_is_plain_sum() {
        let value = npv_of_refi(&[dec!(10), dec!(20), dec!(30)], Decimal::ZERO, dec!(15)).unwrap();
        assert_eq!(value, dec!(45));
    }

    #[test]
    fn test_compute_ltv() {
        assert_eq!(
            compute_ltv(dec!(400_000), dec!(500_000)),
            LoanToValue::Ratio(dec!(0.8))
        );
        assert!(compute_ltv(dec!(400_000), Decimal::ZERO).is_unbounded());
        assert_eq!(compute_ltv(dec!(400_000), Decimal::ZERO).as_f64(), f64::INFINITY);
        assert!(compute_ltv(dec!(400_000), dec!(-1)).is_unbounded());
    }

    #[test]
    fn test_ltv_display() {
        assert_eq!(LoanToValue::Ratio(dec!(0.8)).to_string(), "80.0%");
        assert_eq!(LoanToValue::Unbounded.to_string(), "—");
    }

    #[test]
    fn test_ltv_exceeds() {
        assert!(LoanToValue::Ratio(dec!(0.85)).exceeds(dec!(0.8)));
        assert!(!LoanToValue::Ratio(dec!(0.8)).exceeds(dec!(0.8)));
        assert!(LoanToValue::Unbounded.exceeds(dec!(0.8)));
    }

    #[test]
    fn test_ltv_serde_shape() {
        let json = serde_json::to_value(LoanToValue::Unbounded).unwrap();
        assert_eq!(json, serde_json::json!("unbounded"));
        let json = serde_json::to_value(LoanToValue::Ratio(dec!(0.8))).unwrap();
        assert_eq!(json, serde_json::json!({ "ratio": "0.8" }));
    }
}
