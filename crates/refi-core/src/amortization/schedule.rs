//! Period-by-period amortization tables with optional extra-principal
//! acceleration, plus the period-aligned merge used for side-by-side export.

use std::time::Instant;

use chrono::{Days, Months, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::payment::{
    default_periods_per_year, payment, period_count, periodic_rate, MONTHS_PER_YEAR,
};
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Years};
use crate::RefiResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Periods allowed past the nominal term before iteration is abandoned.
pub const DEFAULT_MAX_OVERRUN_PERIODS: u32 = 600;

/// Balances left below this after a payment are swept into that payment.
const BALANCE_EPSILON: Decimal = dec!(0.000001);

/// Decimal places of amounts in the schedule export.
const EXPORT_DP: u32 = 2;

/// Column suffixes of the schedule export, in order.
pub const EXPORT_COLUMNS: [&str; 6] = [
    "period",
    "interest",
    "principal",
    "extra_principal",
    "payment",
    "balance",
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One period of an amortization table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationRow {
    /// 1-based period index.
    pub period: u32,
    pub interest: Money,
    /// Scheduled principal portion of the level payment.
    pub principal: Money,
    /// Extra principal actually applied this period.
    pub extra_principal: Money,
    /// Interest plus principal actually paid.
    pub payment: Money,
    /// Balance after this period's payment.
    pub balance: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<NaiveDate>,
}

impl AmortizationRow {
    /// Zero-filled stand-in for a period the schedule never reached.
    pub fn filler() -> Self {
        Self {
            period: 0,
            interest: dec!(0.0),
            principal: dec!(0.0),
            extra_principal: dec!(0.0),
            payment: dec!(0.0),
            balance: dec!(0.0),
            payment_date: None,
        }
    }

    /// CSV cells: amounts to cents, every cell of a filler row `0.0`.
    fn export_fields(&self) -> [String; 6] {
        let period = if self.period == 0 {
            dec!(0.0).to_string()
        } else {
            self.period.to_string()
        };
        [
            period,
            self.interest.round_dp(EXPORT_DP).to_string(),
            self.principal.round_dp(EXPORT_DP).to_string(),
            self.extra_principal.round_dp(EXPORT_DP).to_string(),
            self.payment.round_dp(EXPORT_DP).to_string(),
            self.balance.round_dp(EXPORT_DP).to_string(),
        ]
    }
}

/// Knobs for [`amortization_schedule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOptions {
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: u32,
    /// Voluntary principal added to every payment.
    #[serde(default)]
    pub extra_principal_per_period: Money,
    /// Safety cap: iteration stops after `nominal periods + max_overrun_periods`.
    #[serde(default = "default_max_overrun_periods")]
    pub max_overrun_periods: u32,
    /// Date of the first payment; when set every row carries a payment date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_payment_date: Option<NaiveDate>,
}

fn default_max_overrun_periods() -> u32 {
    DEFAULT_MAX_OVERRUN_PERIODS
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            periods_per_year: MONTHS_PER_YEAR,
            extra_principal_per_period: Decimal::ZERO,
            max_overrun_periods: DEFAULT_MAX_OVERRUN_PERIODS,
            first_payment_date: None,
        }
    }
}

impl ScheduleOptions {
    pub fn with_extra_principal(mut self, extra: Money) -> Self {
        self.extra_principal_per_period = extra;
        self
    }
}

/// A complete amortization table.
///
/// `paid_off` is false when the overrun cap stopped iteration before the
/// balance reached zero; the last row's balance is then nonzero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub rows: Vec<AmortizationRow>,
    pub paid_off: bool,
}

impl AmortizationSchedule {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_interest(&self) -> Money {
        self.rows.iter().map(|r| r.interest).sum()
    }

    pub fn total_paid(&self) -> Money {
        self.rows.iter().map(|r| r.payment).sum()
    }

    /// Balance after the last row; zero for an empty schedule.
    pub fn final_balance(&self) -> Money {
        self.rows.last().map(|r| r.balance).unwrap_or(Decimal::ZERO)
    }

    /// Payment due in 0-based period `idx`, zero once the loan has ended.
    pub fn payment_at(&self, idx: usize) -> Money {
        self.rows.get(idx).map(|r| r.payment).unwrap_or(Decimal::ZERO)
    }

    /// First `n` rows, for previews.
    pub fn head(&self, n: usize) -> &[AmortizationRow] {
        &self.rows[..n.min(self.rows.len())]
    }
}

/// Both schedules' rows for one period; a side that has already ended is
/// zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleComparisonRow {
    pub period: u32,
    pub current: AmortizationRow,
    pub new: AmortizationRow,
}

impl ScheduleComparisonRow {
    /// Header row for the side-by-side export, e.g. `current_period, ..., new_balance`.
    pub fn export_header() -> Vec<String> {
        ["current", "new"]
            .iter()
            .flat_map(|side| EXPORT_COLUMNS.iter().map(move |c| format!("{side}_{c}")))
            .collect()
    }

    pub fn export_record(&self) -> Vec<String> {
        self.current
            .export_fields()
            .into_iter()
            .chain(self.new.export_fields())
            .collect()
    }
}

/// Flat input for building a single schedule from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInput {
    pub principal: Money,
    pub annual_rate_pct: Percent,
    pub years: Years,
    #[serde(flatten)]
    pub options: ScheduleOptions,
}

/// Schedule plus its headline aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleOutput {
    pub base_payment: Money,
    pub periods: u32,
    pub total_interest: Money,
    pub total_paid: Money,
    pub schedule: AmortizationSchedule,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Generate the amortization table for a fixed-rate loan.
///
/// The level payment is computed once over the full nominal term. Each period
/// pays interest on the running balance, the scheduled principal, and up to
/// `extra_principal_per_period` more, never more than the balance. Rows stop
/// as soon as the balance reaches zero, or after
/// `round(n) + max_overrun_periods` periods, whichever comes first.
///
/// A non-positive principal yields an empty, paid-off schedule.
pub fn amortization_schedule(
    principal: Money,
    annual_rate_pct: Percent,
    years: Years,
    options: &ScheduleOptions,
) -> RefiResult<AmortizationSchedule> {
    let ppy = options.periods_per_year;
    let r = periodic_rate(annual_rate_pct, ppy)?;
    let n = period_count(years, ppy)?;
    let base_payment = payment(principal, annual_rate_pct, years, ppy)?;

    if principal <= Decimal::ZERO {
        return Ok(AmortizationSchedule {
            rows: Vec::new(),
            paid_off: true,
        });
    }

    let nominal_periods = n.round().to_u32().unwrap_or(0);
    let max_periods = nominal_periods.saturating_add(options.max_overrun_periods);
    let extra = options.extra_principal_per_period;

    let mut rows = Vec::with_capacity(nominal_periods.min(max_periods) as usize);
    let mut balance = principal;
    let mut period: u32 = 0;

    while balance > Decimal::ZERO && period < max_periods {
        period += 1;

        let interest = balance * r;
        let scheduled_principal = base_payment - interest;
        let headroom = (balance - scheduled_principal).max(Decimal::ZERO);
        let extra_applied = extra.min(headroom);

        let mut principal_paid = (scheduled_principal + extra_applied).min(balance);
        if balance - principal_paid < BALANCE_EPSILON {
            principal_paid = balance;
        }
        balance = (balance - principal_paid).max(Decimal::ZERO);

        rows.push(AmortizationRow {
            period,
            interest,
            principal: scheduled_principal,
            extra_principal: extra_applied,
            payment: interest + principal_paid,
            balance,
            payment_date: options
                .first_payment_date
                .and_then(|first| payment_date(first, period, ppy)),
        });
    }

    let paid_off = balance.is_zero();
    if paid_off {
        tracing::debug!(periods = rows.len(), nominal_periods, "amortization schedule paid off");
    } else {
        tracing::warn!(
            periods = rows.len(),
            remaining_balance = %balance,
            "amortization schedule hit the overrun cap before payoff"
        );
    }

    Ok(AmortizationSchedule { rows, paid_off })
}

/// Total interest paid over a schedule; zero when it is empty.
pub fn total_interest(schedule: &AmortizationSchedule) -> Money {
    schedule.total_interest()
}

/// Join two schedules by period index, zero-filling whichever runs out first.
pub fn merge_schedules(
    current: &AmortizationSchedule,
    new: &AmortizationSchedule,
) -> Vec<ScheduleComparisonRow> {
    let len = current.len().max(new.len());
    (0..len)
        .map(|idx| ScheduleComparisonRow {
            period: idx as u32 + 1,
            current: current
                .rows
                .get(idx)
                .cloned()
                .unwrap_or_else(AmortizationRow::filler),
            new: new
                .rows
                .get(idx)
                .cloned()
                .unwrap_or_else(AmortizationRow::filler),
        })
        .collect()
}

/// Build a schedule from a JSON-style input, wrapped in the output envelope.
pub fn build_schedule(input: &ScheduleInput) -> RefiResult<ComputationOutput<ScheduleOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let schedule = amortization_schedule(
        input.principal,
        input.annual_rate_pct,
        input.years,
        &input.options,
    )?;
    let base_payment = payment(
        input.principal,
        input.annual_rate_pct,
        input.years,
        input.options.periods_per_year,
    )?;

    if !schedule.paid_off {
        warnings.push(format!(
            "Schedule stopped after {} periods with {} still owed; raise max_overrun_periods or review inputs",
            schedule.len(),
            schedule.final_balance().round_dp(2)
        ));
    }

    let output = ScheduleOutput {
        base_payment,
        periods: schedule.len() as u32,
        total_interest: schedule.total_interest(),
        total_paid: schedule.total_paid(),
        schedule,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Level-payment amortization with extra principal",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Due date of 1-based `period`. Frequencies that divide a year into whole
/// months step by months; the rest step by `365 / periods_per_year` days.
fn payment_date(first: NaiveDate, period: u32, periods_per_year: u32) -> Option<NaiveDate> {
    let offset = period.checked_sub(1)?;
    if MONTHS_PER_YEAR % periods_per_year == 0 {
        let step = MONTHS_PER_YEAR / periods_per_year;
        first.checked_add_months(Months::new(step.checked_mul(offset)?))
    } else {
        let days = 365 * u64::from(offset) / u64::from(periods_per_year);
        first.checked_add_days(Days::new(days))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
