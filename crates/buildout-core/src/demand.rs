use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::DemandAssumptions;
use crate::error::BuildoutError;
use crate::BuildoutResult;

const KW_PER_GW: Decimal = dec!(1_000_000);

/// Accelerator volume implied by the weekly compute build-out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandOutput {
    pub target_gw_per_week: Decimal,
    pub weeks_per_year: Decimal,
    pub accelerators_per_week: Decimal,
    pub accelerators_per_year: Decimal,
    /// Nameplate capacity added per year in GW
    pub annual_nameplate_gw: Decimal,
}

/// accelerators/week = GW/week * 1e6 * power share / kW per accelerator.
pub fn accelerator_demand(input: &DemandAssumptions) -> BuildoutResult<DemandOutput> {
    if input.gpu_power_kw.is_zero() {
        return Err(BuildoutError::DivisionByZero {
            context: "accelerator power draw (gpu_power_kw)".into(),
        });
    }

    let overflow = || BuildoutError::InvalidInput {
        field: "demand".into(),
        reason: "Accelerator volume overflows".into(),
    };
    let accelerators_per_week = input
        .target_gw_per_week
        .checked_mul(KW_PER_GW)
        .and_then(|kw| kw.checked_mul(input.gpu_power_share))
        .and_then(|kw| kw.checked_div(input.gpu_power_kw))
        .ok_or_else(overflow)?;
    let accelerators_per_year = accelerators_per_week
        .checked_mul(input.weeks_per_year)
        .ok_or_else(overflow)?;
    let annual_nameplate_gw = input
        .target_gw_per_week
        .checked_mul(input.weeks_per_year)
        .ok_or_else(overflow)?;

    Ok(DemandOutput {
        target_gw_per_week: input.target_gw_per_week,
        weeks_per_year: input.weeks_per_year,
        accelerators_per_week,
        accelerators_per_year,
        annual_nameplate_gw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_gw_per_week_is_52m_accelerators() {
        let out = accelerator_demand(&DemandAssumptions::default()).unwrap();
        assert_eq!(out.accelerators_per_week, dec!(1_000_000));
        assert_eq!(out.accelerators_per_year, dec!(52_000_000));
        assert_eq!(out.annual_nameplate_gw, dec!(52));
    }

    #[test]
    fn test_demand_scales_linearly_with_gw() {
        let mut input = DemandAssumptions::default();
        input.target_gw_per_week = dec!(2.5);
        let out = accelerator_demand(&input).unwrap();
        assert_eq!(out.accelerators_per_year, dec!(130_000_000));
    }

    #[test]
    fn test_lower_power_share_means_fewer_accelerators() {
        let mut input = DemandAssumptions::default();
        input.gpu_power_share = dec!(0.35);
        let out = accelerator_demand(&input).unwrap();
        assert_eq!(out.accelerators_per_year, dec!(26_000_000));
    }

    #[test]
    fn test_zero_power_draw_rejected() {
        let mut input = DemandAssumptions::default();
        input.gpu_power_kw = Decimal::ZERO;
        assert!(accelerator_demand(&input).is_err());
    }

    #[test]
    fn test_overflowing_volume_is_an_error() {
        let mut input = DemandAssumptions::default();
        input.gpu_power_kw = dec!(0.000000000000000000000000001);
        assert!(accelerator_demand(&input).is_err());
    }
}
