use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::RefiError;
use crate::types::{Money, Rate};
use crate::RefiResult;

/// Net Present Value of a series of cash flows, the first flow at t = 0.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> RefiResult<Money> {
    if rate <= dec!(-1) {
        return Err(RefiError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            match discount.checked_mul(one_plus_r) {
                Some(next) => discount = next,
                // Remaining terms are below Decimal resolution.
                None => break,
            }
        }
        if discount.is_zero() {
            return Err(RefiError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        let term = cf.checked_div(discount).ok_or_else(|| RefiError::Overflow {
            context: format!("NPV term at period {t}"),
        })?;
        result = result.checked_add(term).ok_or_else(|| RefiError::Overflow {
            context: "NPV sum".into(),
        })?;
    }

    Ok(result)
}

/// Compounding factor (1 + rate)^periods.
///
/// Whole period counts use exact repeated multiplication; fractional counts
/// (a 27.5-year term, say) fall back to `powd`.
pub fn growth_factor(rate: Rate, periods: Decimal) -> RefiResult<Decimal> {
    let base = Decimal::ONE + rate;
    let whole = if periods.fract().is_zero() {
        periods.to_i64()
    } else {
        None
    };

    let factor = match whole {
        Some(n) if n >= 0 => base.checked_powi(n),
        Some(n) => base
            .checked_powi(-n)
            .and_then(|f| Decimal::ONE.checked_div(f)),
        None => base.checked_powd(periods),
    };

    factor.ok_or_else(|| RefiError::Overflow {
        context: format!("growth factor (1 + {rate})^{periods}"),
    })
}
