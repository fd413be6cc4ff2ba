//! Month-by-month payment savings of the new loan over the old one.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::amortization::payment::MONTHS_PER_YEAR;
use crate::amortization::schedule::AmortizationSchedule;
use crate::error::RefiError;
use crate::types::{Money, Years};
use crate::RefiResult;

/// Planning horizon in whole months. Negative horizons are rejected;
/// fractional months are truncated.
pub fn horizon_months(years: Years) -> RefiResult<u32> {
    if years < Decimal::ZERO {
        return Err(RefiError::InvalidHorizon { years });
    }
    (years * Decimal::from(MONTHS_PER_YEAR))
        .trunc()
        .to_u32()
        .ok_or(RefiError::InvalidHorizon { years })
}

/// `(old payment + old PMI) − (new payment + new PMI)` for each of the first
/// `months` months.
///
/// A schedule that ends inside the horizon contributes a zero payment
/// afterwards. PMI is charged every month of the horizon regardless.
pub fn build_savings_stream(
    current: &AmortizationSchedule,
    new: &AmortizationSchedule,
    months: u32,
    current_pmi: Money,
    new_pmi: Money,
) -> Vec<Money> {
    (0..months as usize)
        .map(|i| (current.payment_at(i) + current_pmi) - (new.payment_at(i) + new_pmi))
        .collect()
}

/// Running total of a savings stream.
pub fn cumulative_savings(stream: &[Money]) -> Vec<Money> {
    stream
        .iter()
        .scan(Decimal::ZERO, |acc, s| {
            *acc += s;
            Some(*acc)
        })
        .collect()
}
