use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::LithographyAssumptions;
use crate::error::BuildoutError;
use crate::types::{Money, Ticker};
use crate::BuildoutResult;

use super::AllocationInputs;

/// EUV tool demand and the resulting income for the lithography vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LithographyAllocation {
    pub ticker: Ticker,
    pub wafer_starts: Decimal,
    pub layer_exposures: Decimal,
    pub euv_tools_needed: Decimal,
    /// Tools beyond the installed high-end base; never negative
    pub incremental_tools: Decimal,
    pub systems_net_income: Money,
    pub service_net_income: Money,
    /// Systems plus service income (billions USD)
    pub net_income: Money,
}

pub fn allocate_lithography(
    inputs: &AllocationInputs,
    litho: &LithographyAssumptions,
) -> BuildoutResult<LithographyAllocation> {
    if litho.dies_per_wafer.is_zero() {
        return Err(BuildoutError::DivisionByZero {
            context: "lithography dies per wafer".into(),
        });
    }
    if litho.euv_tool_annual_throughput.is_zero() {
        return Err(BuildoutError::DivisionByZero {
            context: "EUV tool annual throughput".into(),
        });
    }

    let wafer_starts = (inputs.accelerators_per_year / litho.dies_per_wafer) * litho.wafer_multiplier;
    let layer_exposures = wafer_starts * litho.euv_layers_per_device;
    let euv_tools_needed = layer_exposures / litho.euv_tool_annual_throughput;
    // Demand inside the installed base adds nothing.
    let incremental_tools = (euv_tools_needed - litho.installed_high_end_tools).max(Decimal::ZERO);

    let system_revenue = incremental_tools * litho.unit_price;
    let systems_net_income = system_revenue * litho.systems_margin;
    let service_net_income = system_revenue * litho.service_revenue_ratio * litho.service_margin;

    Ok(LithographyAllocation {
        ticker: litho.ticker.clone(),
        wafer_starts,
        layer_exposures,
        euv_tools_needed,
        incremental_tools,
        systems_net_income,
        service_net_income,
        net_income: systems_net_income + service_net_income,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn inputs(accelerators_per_year: Decimal) -> AllocationInputs {
        AllocationInputs {
            target_gw_per_week: dec!(1.0),
            weeks_per_year: dec!(52),
            accelerators_per_year,
        }
    }

    #[test]
    fn test_default_tool_demand() {
        let out = allocate_lithography(&inputs(dec!(52_000_000)), &LithographyAssumptions::default())
            .unwrap();
        // 52M / 70 * 4 * 22 / 1.1M ≈ 59.43 tools
        assert!((out.euv_tools_needed - dec!(59.4286)).abs() < dec!(0.001));
        assert!((out.incremental_tools - dec!(39.4286)).abs() < dec!(0.001));
        // 39.43 * 0.32 * (0.28 + 0.25 * 0.20) ≈ 4.164
        assert!((out.net_income - dec!(4.164)).abs() < dec!(0.001));
        assert_eq!(out.net_income, out.systems_net_income + out.service_net_income);
    }

    #[test]
    fn test_demand_within_installed_base_is_zero() {
        // 20M accelerators need ≈22.9 tools; raise the installed base above it.
        let mut litho = LithographyAssumptions::default();
        litho.installed_high_end_tools = dec!(30);
        let out = allocate_lithography(&inputs(dec!(20_000_000)), &litho).unwrap();
        assert!(out.euv_tools_needed <= litho.installed_high_end_tools);
        assert_eq!(out.incremental_tools, Decimal::ZERO);
        assert_eq!(out.net_income, Decimal::ZERO);
    }

    #[test]
    fn test_demand_exactly_at_installed_base_is_zero() {
        // 1.1M exposures per tool: 70 dies, 1 wafer multiple, 1 layer, 77M units = 1 tool
        let litho = LithographyAssumptions {
            wafer_multiplier: dec!(1),
            euv_layers_per_device: dec!(1),
            installed_high_end_tools: dec!(1),
            ..LithographyAssumptions::default()
        };
        let out = allocate_lithography(&inputs(dec!(77_000_000)), &litho).unwrap();
        assert_eq!(out.euv_tools_needed, dec!(1));
        assert_eq!(out.net_income, Decimal::ZERO);
    }

    #[test]
    fn test_zero_throughput_rejected() {
        let mut litho = LithographyAssumptions::default();
        litho.euv_tool_annual_throughput = Decimal::ZERO;
        assert!(allocate_lithography(&inputs(dec!(52_000_000)), &litho).is_err());
    }
}
