use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::EnergyAssumptions;
use crate::types::{Money, Ticker};

use super::{allocate_pool, AllocationInputs};

/// kWh delivered by one GW of capacity over a year at full output.
const KWH_PER_GW_YEAR: Decimal = dec!(8_760_000_000);
const KWH_PER_TWH: Decimal = dec!(1_000_000_000);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyAllocation {
    pub annual_energy_kwh: Decimal,
    pub annual_energy_twh: Decimal,
    /// Electricity revenue pool (USD)
    pub annual_revenue: Money,
    /// Incremental net income per named producer (billions USD)
    pub net_income: BTreeMap<Ticker, Money>,
}

pub fn allocate_energy(inputs: &AllocationInputs, energy: &EnergyAssumptions) -> EnergyAllocation {
    let annual_energy_kwh =
        inputs.target_gw_per_week * inputs.weeks_per_year * KWH_PER_GW_YEAR * energy.capacity_factor;
    let annual_revenue = annual_energy_kwh * energy.price_per_kwh;

    EnergyAllocation {
        annual_energy_kwh,
        annual_energy_twh: annual_energy_kwh / KWH_PER_TWH,
        annual_revenue,
        net_income: allocate_pool(annual_revenue, &energy.producers),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_energy_allocation() {
        let inputs = AllocationInputs {
            target_gw_per_week: dec!(1.0),
            weeks_per_year: dec!(52),
            accelerators_per_year: dec!(52_000_000),
        };
        let out = allocate_energy(&inputs, &EnergyAssumptions::default());
        // 52 GW * 8.76 TWh/GW * 0.9
        assert_eq!(out.annual_energy_twh, dec!(409.968));
        assert_eq!(out.annual_revenue, dec!(26_647_920_000));
        // 26.64792B * 0.40 * 0.18
        assert_eq!(out.net_income["NEE"], dec!(1.91865024));
        // 26.64792B * 0.30 * 0.22
        assert_eq!(out.net_income["CEG"], dec!(1.75876272));
    }

    #[test]
    fn test_energy_ignores_accelerator_volume() {
        let mut inputs = AllocationInputs {
            target_gw_per_week: dec!(1.0),
            weeks_per_year: dec!(52),
            accelerators_per_year: dec!(52_000_000),
        };
        let a = allocate_energy(&inputs, &EnergyAssumptions::default());
        inputs.accelerators_per_year = dec!(1);
        let b = allocate_energy(&inputs, &EnergyAssumptions::default());
        assert_eq!(a, b);
    }
}
