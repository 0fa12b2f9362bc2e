use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::MemoryAssumptions;
use crate::types::{Money, Ticker};

use super::{allocate_pool, AllocationInputs};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryAllocation {
    pub total_stacks: Decimal,
    /// HBM revenue pool (USD)
    pub stack_revenue: Money,
    /// Incremental net income per named vendor (billions USD)
    pub net_income: BTreeMap<Ticker, Money>,
}

/// HBM stacks follow accelerator volume one-for-`stacks_per_accelerator`.
pub fn allocate_memory(inputs: &AllocationInputs, memory: &MemoryAssumptions) -> MemoryAllocation {
    let total_stacks = inputs.accelerators_per_year * memory.stacks_per_accelerator;
    let stack_revenue = total_stacks * memory.stack_asp;

    MemoryAllocation {
        total_stacks,
        stack_revenue,
        net_income: allocate_pool(stack_revenue, &memory.vendors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_hbm_allocation() {
        let inputs = AllocationInputs {
            target_gw_per_week: dec!(1.0),
            weeks_per_year: dec!(52),
            accelerators_per_year: dec!(52_000_000),
        };
        let out = allocate_memory(&inputs, &MemoryAssumptions::default());
        assert_eq!(out.total_stacks, dec!(416_000_000));
        assert_eq!(out.stack_revenue, dec!(287_040_000_000));
        // 287.04B * 0.60 * 0.22
        assert_eq!(out.net_income["SKH"], dec!(37.88928));
        // 287.04B * 0.30 * 0.20
        assert_eq!(out.net_income["MU"], dec!(17.2224));
        assert!(!out.net_income.contains_key("OTHER"));
    }
}
