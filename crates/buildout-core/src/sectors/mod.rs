//! Sector allocators. Each turns the shared demand figures into incremental
//! net income (billions of USD) for the companies in one sector. They read
//! only `AllocationInputs` and, for the service and Tesla sectors, the
//! service revenue pool produced by the GPU allocator.

pub mod energy;
pub mod gpu;
pub mod lithography;
pub mod memory;
pub mod platform;
pub mod tesla;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::MarketParticipant;
use crate::demand::DemandOutput;
use crate::types::{Money, Ticker, USD_PER_BILLION};

/// Upstream quantities every allocator may read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationInputs {
    pub target_gw_per_week: Decimal,
    pub weeks_per_year: Decimal,
    pub accelerators_per_year: Decimal,
}

impl From<&DemandOutput> for AllocationInputs {
    fn from(demand: &DemandOutput) -> Self {
        Self {
            target_gw_per_week: demand.target_gw_per_week,
            weeks_per_year: demand.weeks_per_year,
            accelerators_per_year: demand.accelerators_per_year,
        }
    }
}

/// Split a USD revenue pool across participants with a net margin; the
/// residual participants receive nothing.
pub(crate) fn allocate_pool(
    revenue_usd: Money,
    participants: &[MarketParticipant],
) -> BTreeMap<Ticker, Money> {
    participants
        .iter()
        .filter_map(|p| {
            p.net_margin
                .map(|margin| (p.name.clone(), revenue_usd * p.share * margin / USD_PER_BILLION))
        })
        .collect()
}
