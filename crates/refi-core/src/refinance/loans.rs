//! Borrower-side inputs: the mortgage being replaced and the offer on the table.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amortization::payment::{payment, remaining_balance, MONTHS_PER_YEAR};
use crate::types::{Money, Percent, Years};
use crate::RefiResult;

/// Shortest refinance term the offer defaults will suggest.
const MIN_SUGGESTED_TERM_YEARS: u32 = 15;

/// The existing mortgage, as originated, plus how far into it the borrower is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentLoan {
    /// Principal at origination.
    pub original_principal: Money,
    /// Note rate as APR percent (6.75 = 6.75%).
    pub apr_pct: Percent,
    pub original_term_years: u32,
    /// Monthly payments already made.
    pub payments_made: u32,
    /// Flat monthly mortgage insurance.
    #[serde(default)]
    pub monthly_pmi: Money,
}

impl CurrentLoan {
    /// Payments over the full original term.
    pub fn total_payments(&self) -> u32 {
        self.original_term_years.saturating_mul(MONTHS_PER_YEAR)
    }

    /// Principal still owed today.
    pub fn remaining_principal(&self) -> RefiResult<Money> {
        remaining_balance(
            self.original_principal,
            self.apr_pct,
            Decimal::from(self.original_term_years),
            self.payments_made,
            MONTHS_PER_YEAR,
        )
    }

    /// Years left on the original term, `(term × 12 − payments made) / 12`.
    pub fn remaining_term_years(&self) -> Years {
        (Decimal::from(self.total_payments()) - Decimal::from(self.payments_made))
            / Decimal::from(MONTHS_PER_YEAR)
    }

    /// Monthly P&I as originated.
    pub fn scheduled_payment(&self) -> RefiResult<Money> {
        payment(
            self.original_principal,
            self.apr_pct,
            Decimal::from(self.original_term_years),
            MONTHS_PER_YEAR,
        )
    }

    /// Default term for a replacement loan: whole years left on this one, but
    /// never shorter than 15.
    pub fn suggested_refi_term_years(&self) -> u32 {
        let years_paid = self.payments_made / MONTHS_PER_YEAR;
        self.original_term_years
            .saturating_sub(years_paid)
            .max(MIN_SUGGESTED_TERM_YEARS)
    }
}

/// A proposed refinance, with its upfront pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefiOffer {
    pub new_principal: Money,
    pub apr_pct: Percent,
    pub term_years: u32,
    /// Discount points as percent of the new principal (0.5 = half a point).
    #[serde(default)]
    pub points_pct_of_loan: Percent,
    #[serde(default)]
    pub lender_credits: Money,
    #[serde(default)]
    pub other_closing_costs: Money,
    #[serde(default)]
    pub monthly_pmi: Money,
    /// Voluntary principal added to every payment on the new loan.
    #[serde(default)]
    pub extra_principal_per_month: Money,
}

impl RefiOffer {
    /// An offer with no points, credits, closing costs, PMI or prepayment.
    pub fn new(new_principal: Money, apr_pct: Percent, term_years: u32) -> Self {
        Self {
            new_principal,
            apr_pct,
            term_years,
            points_pct_of_loan: Decimal::ZERO,
            lender_credits: Decimal::ZERO,
            other_closing_costs: Decimal::ZERO,
            monthly_pmi: Decimal::ZERO,
            extra_principal_per_month: Decimal::ZERO,
        }
    }

    /// Monthly P&I on the new loan, before any extra principal.
    pub fn monthly_payment(&self) -> RefiResult<Money> {
        payment(
            self.new_principal,
            self.apr_pct,
            Decimal::from(self.term_years),
            MONTHS_PER_YEAR,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_current_loan() -> CurrentLoan {
        CurrentLoan {
            original_principal: dec!(400_000),
            apr_pct: dec!(6.75),
            original_term_years: 30,
            payments_made: 36,
            monthly_pmi: dec!(100),
        }
    }

    #[test]
    fn test_remaining_term_years() {
        assert_eq!(sample_current_loan().remaining_term_years(), dec!(27));

        let mut loan = sample_current_loan();
        loan.payments_made = 40;
        // (360 - 40) / 12
        assert_eq!(loan.remaining_term_years(), dec!(320) / dec!(12));
    }

    #[test]
    fn test_remaining_principal_after_three_years() {
        let bal = sample_current_loan().remaining_principal().unwrap();
        assert!((bal - dec!(386_299.89)).abs() < dec!(0.01));
    }

    #[test]
    fn test_scheduled_payment() {
        let pmt = sample_current_loan().scheduled_payment().unwrap();
        assert!((pmt - dec!(2594.39)).abs() < dec!(0.01));
    }

    #[test]
    fn test_suggested_refi_term() {
        assert_eq!(sample_current_loan().suggested_refi_term_years(), 27);

        let mut seasoned = sample_current_loan();
        seasoned.payments_made = 240;
        assert_eq!(seasoned.suggested_refi_term_years(), 15);
    }

    #[test]
    fn test_offer_defaults_from_json() {
        let offer: RefiOffer = serde_json::from_str(
            r#"{"new_principal": "380000", "apr_pct": 5.5, "term_years": 25}"#,
        )
        .unwrap();
        assert_eq!(offer, RefiOffer::new(dec!(380_000), dec!(5.5), 25));
    }
}
