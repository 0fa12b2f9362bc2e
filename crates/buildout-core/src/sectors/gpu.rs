use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::GpuAssumptions;
use crate::types::{Money, Multiple, Rate, Ticker, USD_PER_BILLION};

use super::AllocationInputs;

/// Accelerator revenue attributed to one vendor (USD).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorRevenue {
    pub name: String,
    pub share: Rate,
    pub asp: Money,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpuAllocation {
    pub vendor_revenue: Vec<VendorRevenue>,
    /// Sum over every vendor, residual share included (USD)
    pub total_gpu_revenue: Money,
    /// Incremental net income per named vendor (billions USD)
    pub net_income: BTreeMap<Ticker, Money>,
    /// GPU revenue converted into downstream platform revenue (USD)
    pub service_revenue_pool: Money,
    /// Capex needed for the full compute stack around the accelerators (USD)
    pub stack_capex_total: Money,
}

/// units * share * ASP
pub fn vendor_revenue(accelerators_per_year: Decimal, share: Rate, asp: Money) -> Money {
    accelerators_per_year * share * asp
}

/// Vendor revenue * net margin, in billions.
pub fn vendor_net_income(
    accelerators_per_year: Decimal,
    share: Rate,
    asp: Money,
    net_margin: Rate,
) -> Money {
    vendor_revenue(accelerators_per_year, share, asp) * net_margin / USD_PER_BILLION
}

pub fn stack_capex(total_gpu_revenue: Money, stack_multiplier: Multiple) -> Money {
    total_gpu_revenue * stack_multiplier
}

pub fn service_revenue_pool(
    total_gpu_revenue: Money,
    stack_multiplier: Multiple,
    service_conversion: Rate,
) -> Money {
    stack_capex(total_gpu_revenue, stack_multiplier) * service_conversion
}

/// Allocate accelerator revenue across vendors and derive the stack-level
/// pools that feed the service and Tesla sectors.
pub fn allocate_gpu(inputs: &AllocationInputs, gpu: &GpuAssumptions) -> GpuAllocation {
    let vendor_revenue: Vec<VendorRevenue> = gpu
        .vendors
        .iter()
        .map(|v| VendorRevenue {
            name: v.name.clone(),
            share: v.share,
            asp: v.asp,
            revenue: self::vendor_revenue(inputs.accelerators_per_year, v.share, v.asp),
        })
        .collect();

    let total_gpu_revenue: Money = vendor_revenue.iter().map(|v| v.revenue).sum();

    let net_income = gpu
        .vendors
        .iter()
        .filter_map(|v| {
            v.net_margin.map(|margin| {
                (
                    v.name.clone(),
                    vendor_net_income(inputs.accelerators_per_year, v.share, v.asp, margin),
                )
            })
        })
        .collect();

    GpuAllocation {
        vendor_revenue,
        total_gpu_revenue,
        net_income,
        service_revenue_pool: service_revenue_pool(
            total_gpu_revenue,
            gpu.stack_multiplier,
            gpu.service_conversion,
        ),
        stack_capex_total: stack_capex(total_gpu_revenue, gpu.stack_multiplier),
    }
}

/// Revenue left with vendors that have no modelled net margin.
pub fn unattributed_revenue(allocation: &GpuAllocation, gpu: &GpuAssumptions) -> Money {
    allocation
        .vendor_revenue
        .iter()
        .filter(|r| {
            gpu.vendors
                .iter()
                .any(|v| v.name == r.name && v.net_margin.is_none())
        })
        .map(|r| r.revenue)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AcceleratorVendor;
    use rust_decimal_macros::dec;

    fn default_inputs() -> AllocationInputs {
        AllocationInputs {
            target_gw_per_week: dec!(1.0),
            weeks_per_year: dec!(52),
            accelerators_per_year: dec!(52_000_000),
        }
    }

    #[test]
    fn test_default_vendor_net_income() {
        let out = allocate_gpu(&default_inputs(), &GpuAssumptions::default());
        // 52M * 0.65 * 12,000 * 0.38 / 1e9
        assert_eq!(out.net_income["NVDA"], dec!(154.128));
        // 52M * 0.25 * 10,000 * 0.28 / 1e9
        assert_eq!(out.net_income["AMD"], dec!(36.4));
        assert!(!out.net_income.contains_key("CUSTOM"));
    }

    #[test]
    fn test_total_revenue_includes_custom_silicon() {
        let out = allocate_gpu(&default_inputs(), &GpuAssumptions::default());
        // 405.6B + 130B + 46.8B
        assert_eq!(out.total_gpu_revenue, dec!(582_400_000_000));
        assert_eq!(
            unattributed_revenue(&out, &GpuAssumptions::default()),
            dec!(46_800_000_000)
        );
    }

    #[test]
    fn test_stack_pools() {
        let out = allocate_gpu(&default_inputs(), &GpuAssumptions::default());
        assert_eq!(out.stack_capex_total, dec!(1_630_720_000_000));
        assert_eq!(out.service_revenue_pool, dec!(1_304_576_000_000));
    }

    #[test]
    fn test_named_revenue_never_exceeds_total() {
        let mut gpu = GpuAssumptions::default();
        gpu.vendors = vec![
            AcceleratorVendor {
                name: "NVDA".into(),
                share: dec!(0.5),
                asp: dec!(15_000),
                net_margin: Some(dec!(0.4)),
            },
            AcceleratorVendor {
                name: "AMD".into(),
                share: dec!(0.3),
                asp: dec!(9_000),
                net_margin: Some(dec!(0.2)),
            },
        ];
        let out = allocate_gpu(&default_inputs(), &gpu);
        let named: Money = out
            .vendor_revenue
            .iter()
            .filter(|r| out.net_income.contains_key(&r.name))
            .map(|r| r.revenue)
            .sum();
        assert!(named <= out.total_gpu_revenue);
    }

    #[test]
    fn test_zero_volume_gives_zero_income() {
        let mut inputs = default_inputs();
        inputs.accelerators_per_year = Decimal::ZERO;
        let out = allocate_gpu(&inputs, &GpuAssumptions::default());
        assert!(out.net_income.values().all(|v| v.is_zero()));
        assert!(out.service_revenue_pool.is_zero());
    }
}
