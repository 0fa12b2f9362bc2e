use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::TeslaParameterSet;
use crate::types::{Money, USD_PER_BILLION};

use super::AllocationInputs;

/// Hours of storage paired with each GW of new capacity.
const STORAGE_HOURS: Decimal = dec!(4);
const KWH_PER_GWH: Decimal = dec!(1_000_000);
const UNITS_PER_MILLION: Decimal = dec!(1_000_000);

/// Tesla's incremental income split by business line (billions USD).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeslaAllocation {
    pub storage_gwh: Decimal,
    pub storage_net_income: Money,
    pub fsd_net_income: Money,
    pub robotics_net_income: Money,
    pub net_income: Money,
}

pub fn allocate_tesla(
    inputs: &AllocationInputs,
    params: &TeslaParameterSet,
    service_revenue_pool: Money,
) -> TeslaAllocation {
    let storage_gwh =
        inputs.target_gw_per_week * inputs.weeks_per_year * params.storage_penetration * STORAGE_HOURS;
    let storage_revenue =
        storage_gwh * KWH_PER_GWH * params.storage_price_per_kwh * params.storage_share;
    let storage_net_income = storage_revenue * params.storage_margin / USD_PER_BILLION;

    let fsd_revenue = params.fsd_subscribers * UNITS_PER_MILLION * params.fsd_arpu;
    let fsd_net_income = fsd_revenue * params.fsd_margin / USD_PER_BILLION;

    let robotics_net_income =
        service_revenue_pool * params.robotics_share * params.robotics_margin / USD_PER_BILLION;

    TeslaAllocation {
        storage_gwh,
        storage_net_income,
        fsd_net_income,
        robotics_net_income,
        net_income: storage_net_income + fsd_net_income + robotics_net_income,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POOL: Decimal = dec!(1_304_576_000_000);

    fn inputs() -> AllocationInputs {
        AllocationInputs {
            target_gw_per_week: dec!(1.0),
            weeks_per_year: dec!(52),
            accelerators_per_year: dec!(52_000_000),
        }
    }

    #[test]
    fn test_base_case() {
        let out = allocate_tesla(&inputs(), &TeslaParameterSet::base_case(), POOL);
        assert_eq!(out.storage_gwh, dec!(72.8));
        assert_eq!(out.storage_net_income, dec!(2.75184));
        assert_eq!(out.fsd_net_income, dec!(15.84));
        assert_eq!(out.robotics_net_income, dec!(15.654912));
        assert_eq!(out.net_income, dec!(34.246752));
    }

    #[test]
    fn test_downside_case() {
        let out = allocate_tesla(&inputs(), &TeslaParameterSet::downside_case(), POOL);
        assert_eq!(out.storage_net_income, dec!(0.704704));
        assert_eq!(out.fsd_net_income, dec!(5.184));
        assert_eq!(out.robotics_net_income, dec!(9.78432));
        assert_eq!(out.net_income, dec!(15.673024));
    }

    #[test]
    fn test_downside_below_base() {
        let base = allocate_tesla(&inputs(), &TeslaParameterSet::base_case(), POOL);
        let downside = allocate_tesla(&inputs(), &TeslaParameterSet::downside_case(), POOL);
        assert!(downside.net_income < base.net_income);
    }

    #[test]
    fn test_fsd_independent_of_build_out() {
        let mut idle = inputs();
        idle.target_gw_per_week = Decimal::ZERO;
        let out = allocate_tesla(&idle, &TeslaParameterSet::base_case(), Decimal::ZERO);
        assert_eq!(out.storage_net_income, Decimal::ZERO);
        assert_eq!(out.robotics_net_income, Decimal::ZERO);
        assert_eq!(out.net_income, dec!(15.84));
    }
}
