use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::PlatformAssumptions;
use crate::types::{Money, Rate, Ticker, USD_PER_BILLION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformAllocation {
    /// Share of the service pool allocated to modelled platforms
    pub allocated_share: Rate,
    /// Incremental net income per platform company (billions USD)
    pub net_income: BTreeMap<Ticker, Money>,
}

/// Split the service revenue pool across the platform companies. Shares need
/// not sum to one; the remainder accrues to companies outside the model.
pub fn allocate_platform(service_revenue_pool: Money, platform: &PlatformAssumptions) -> PlatformAllocation {
    let net_income = platform
        .companies
        .iter()
        .map(|c| {
            (
                c.ticker.clone(),
                service_revenue_pool * c.share * c.net_margin / USD_PER_BILLION,
            )
        })
        .collect();

    PlatformAllocation {
        allocated_share: platform.companies.iter().map(|c| c.share).sum(),
        net_income,
    }
}
