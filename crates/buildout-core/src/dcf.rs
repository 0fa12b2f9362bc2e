use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::RampAssumptions;
use crate::error::BuildoutError;
use crate::time_value::{gordon_terminal_value, present_value};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::BuildoutResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One ramp year of a company's incremental income.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowRecord {
    pub year: i32,
    pub utilisation: Rate,
    /// Steady-state incremental income scaled by utilisation (billions USD)
    pub incremental_net: Money,
    /// `incremental_net` discounted to the base year
    pub present_value: Money,
}

/// Standalone projection request: a steady-state figure plus the ramp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfInput {
    /// Steady-state incremental net income (billions USD)
    pub incremental_net_income: Money,
    #[serde(default)]
    pub ramp: RampAssumptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfProjection {
    pub cashflows: Vec<CashflowRecord>,
    /// Sum of the explicit ramp-year present values
    pub pv_of_cashflows: Money,
    /// Gordon growth value at the end of the ramp, undiscounted
    pub terminal_value: Money,
    pub pv_of_terminal: Money,
    pub pv_total: Money,
    /// Terminal PV as a fraction of `pv_total`
    pub terminal_value_pct: Rate,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Ramp a steady-state income figure over the schedule, discount each year to
/// the base year, and add a Gordon growth terminal value on the last ramp
/// year's undiscounted income, discounted one period past the ramp.
///
/// Fails when the discount rate does not exceed terminal growth.
pub fn project_cashflows(
    incremental_net_income: Money,
    ramp: &RampAssumptions,
) -> BuildoutResult<DcfProjection> {
    if ramp.discount_rate <= ramp.terminal_growth {
        return Err(BuildoutError::FinancialImpossibility(format!(
            "Terminal growth rate ({}) must be less than the discount rate ({}) for the Gordon growth model",
            ramp.terminal_growth, ramp.discount_rate
        )));
    }
    let last = ramp.schedule.last().ok_or_else(|| BuildoutError::InvalidInput {
        field: "ramp.schedule".into(),
        reason: "Ramp schedule must contain at least one year".into(),
    })?;

    let cashflows = ramp
        .schedule
        .iter()
        .map(|step| {
            let incremental_net = incremental_net_income * step.utilisation;
            let periods = i64::from(step.year - ramp.base_year);
            Ok(CashflowRecord {
                year: step.year,
                utilisation: step.utilisation,
                incremental_net,
                present_value: present_value(incremental_net, ramp.discount_rate, periods)?,
            })
        })
        .collect::<BuildoutResult<Vec<_>>>()?;

    let pv_of_cashflows: Money = cashflows.iter().map(|c| c.present_value).sum();

    let last_incremental = incremental_net_income * last.utilisation;
    let terminal_value =
        gordon_terminal_value(last_incremental, ramp.discount_rate, ramp.terminal_growth)?;
    let terminal_periods = i64::from(last.year - ramp.base_year) + 1;
    let pv_of_terminal = present_value(terminal_value, ramp.discount_rate, terminal_periods)?;

    let pv_total = pv_of_cashflows
        .checked_add(pv_of_terminal)
        .ok_or_else(|| {
            BuildoutError::FinancialImpossibility(
                "Present value of the ramp and terminal value overflows".into(),
            )
        })?;
    let terminal_value_pct = if pv_total.is_zero() {
        Decimal::ZERO
    } else {
        pv_of_terminal / pv_total
    };

    Ok(DcfProjection {
        cashflows,
        pv_of_cashflows,
        terminal_value,
        pv_of_terminal,
        pv_total,
        terminal_value_pct,
    })
}

/// Project a single figure with the standard output envelope.
pub fn calculate_dcf(input: &DcfInput) -> BuildoutResult<ComputationOutput<DcfProjection>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.ramp.validate(&mut warnings)?;
    let projection = project_cashflows(input.incremental_net_income, &input.ramp)?;

    if projection.terminal_value_pct > dec!(0.75) {
        warnings.push(format!(
            "Terminal value represents {:.1}% of discounted value; consider extending the ramp",
            projection.terminal_value_pct * dec!(100)
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Utilisation-ramped incremental income DCF with Gordon growth terminal value",
        input,
        warnings,
        elapsed,
        projection,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
