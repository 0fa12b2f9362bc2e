use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, info_span, warn};

use crate::baseline::{BaselineRegistry, CompanyBaseline};
use crate::config::{PlatformAssumptions, ScenarioConfig};
use crate::dcf::{project_cashflows, DcfProjection};
use crate::demand::{accelerator_demand, DemandOutput};
use crate::error::BuildoutError;
use crate::sectors::energy::{allocate_energy, EnergyAllocation};
use crate::sectors::gpu::{allocate_gpu, GpuAllocation};
use crate::sectors::lithography::{allocate_lithography, LithographyAllocation};
use crate::sectors::memory::{allocate_memory, MemoryAllocation};
use crate::sectors::platform::{allocate_platform, PlatformAllocation};
use crate::sectors::tesla::{allocate_tesla, TeslaAllocation};
use crate::sectors::AllocationInputs;
use crate::types::{
    with_metadata, ComputationOutput, Money, Multiple, Rate, Ticker, BILLIONS_PER_TRILLION,
    USD_PER_BILLION,
};
use crate::BuildoutResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A company re-valued under the scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyScenario {
    pub baseline: CompanyBaseline,
    /// Incremental net income from exactly one sector allocator (billions USD)
    pub incremental_net_income: Money,
    /// Scenario multiple; `Some(0)` is a real multiple, not a fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerated_pe: Option<Multiple>,
}

impl CompanyScenario {
    pub fn new(
        baseline: CompanyBaseline,
        incremental_net_income: Money,
        rerated_pe: Option<Multiple>,
    ) -> Self {
        Self {
            baseline,
            incremental_net_income,
            rerated_pe,
        }
    }

    pub fn total_net_income(&self) -> Money {
        self.baseline.net_income + self.incremental_net_income
    }

    pub fn applied_multiple(&self) -> Multiple {
        match self.rerated_pe {
            Some(multiple) => multiple,
            None => self.baseline.pe_multiple,
        }
    }

    /// Scenario market value in trillions of USD.
    pub fn valuation(&self) -> Money {
        self.total_net_income() * self.applied_multiple() / BILLIONS_PER_TRILLION
    }
}

/// Incremental income per unit of capex burden. Companies with no capex
/// burden report `NotApplicable` instead of dividing by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageRatio {
    Value(Decimal),
    NotApplicable,
}

impl CoverageRatio {
    pub fn compute(incremental_net_income: Money, capex_burden: Money) -> Self {
        if capex_burden.is_zero() {
            CoverageRatio::NotApplicable
        } else {
            CoverageRatio::Value(incremental_net_income / capex_burden)
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            CoverageRatio::Value(v) => Some(*v),
            CoverageRatio::NotApplicable => None,
        }
    }
}

const NOT_APPLICABLE: &str = "n/a";

impl fmt::Display for CoverageRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageRatio::Value(v) => write!(f, "{:.1}", v),
            CoverageRatio::NotApplicable => f.write_str(NOT_APPLICABLE),
        }
    }
}

impl Serialize for CoverageRatio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CoverageRatio::Value(v) => Serialize::serialize(v, serializer),
            CoverageRatio::NotApplicable => serializer.serialize_str(NOT_APPLICABLE),
        }
    }
}

impl<'de> Deserialize<'de> for CoverageRatio {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == NOT_APPLICABLE {
            return Ok(CoverageRatio::NotApplicable);
        }
        raw.parse::<Decimal>()
            .map(CoverageRatio::Value)
            .map_err(serde::de::Error::custom)
    }
}

/// One row of the ticker-indexed valuation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub ticker: Ticker,
    pub sector: String,
    /// Trillions USD
    pub baseline_market_cap: Money,
    /// Billions USD
    pub baseline_net_income: Money,
    /// Billions USD, steady state
    pub incremental_net_income: Money,
    /// Trillions USD at the applied multiple
    pub scenario_valuation: Money,
    pub applied_multiple: Multiple,
    /// Discounted value of the ramped incremental income (billions USD)
    pub pv_incremental_net_income: Money,
    /// Annual share of stack capex (billions USD)
    pub capex_burden: Money,
    pub ni_to_capex: CoverageRatio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapexRow {
    pub ticker: Ticker,
    pub service_share: Rate,
    /// Billions USD
    pub capex_burden: Money,
}

/// Build-out totals reported alongside the company table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioHeadline {
    pub accelerators_per_year: Decimal,
    /// Billions USD
    pub total_gpu_revenue: Money,
    /// Billions USD
    pub hbm_revenue_pool: Money,
    pub annual_nameplate_gw: Decimal,
    pub annual_energy_twh: Decimal,
    /// Billions USD
    pub service_revenue_pool: Money,
    /// Billions USD
    pub stack_capex_total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeslaCase {
    pub incremental_net_income: Money,
    pub applied_multiple: Multiple,
    /// Trillions USD
    pub valuation: Money,
    pub allocation: TeslaAllocation,
}

/// Best-estimate and stress-tested Tesla valuations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeslaValuations {
    pub base: TeslaCase,
    pub downside: TeslaCase,
}

/// Raw output of every sector allocator for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorAllocations {
    pub demand: DemandOutput,
    pub gpu: GpuAllocation,
    pub lithography: LithographyAllocation,
    pub memory: MemoryAllocation,
    pub energy: EnergyAllocation,
    pub platform: PlatformAllocation,
    pub tesla_base: TeslaAllocation,
    pub tesla_downside: TeslaAllocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutput {
    pub headline: ScenarioHeadline,
    /// Sorted by scenario valuation, largest first
    pub summary: Vec<SummaryRow>,
    pub cashflows: BTreeMap<Ticker, DcfProjection>,
    /// Sorted by ticker
    pub capex: Vec<CapexRow>,
    pub tesla: TeslaValuations,
    pub sectors: SectorAllocations,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run every sector allocator in dependency order: demand, then GPU (which
/// yields the service pool), then the remaining sectors.
pub fn allocate_sectors(config: &ScenarioConfig) -> BuildoutResult<SectorAllocations> {
    let demand = accelerator_demand(&config.demand)?;
    let inputs = AllocationInputs::from(&demand);

    let gpu = allocate_gpu(&inputs, &config.gpu);
    let pool = gpu.service_revenue_pool;

    Ok(SectorAllocations {
        lithography: allocate_lithography(&inputs, &config.lithography)?,
        memory: allocate_memory(&inputs, &config.memory),
        energy: allocate_energy(&inputs, &config.energy),
        platform: allocate_platform(pool, &config.platform),
        tesla_base: allocate_tesla(&inputs, &config.tesla.base, pool),
        tesla_downside: allocate_tesla(&inputs, &config.tesla.downside, pool),
        demand,
        gpu,
    })
}

/// Annual capex burden in billions: the ticker's service-pool share of total
/// stack capex. Companies outside the service pool carry none.
pub fn capex_burden(ticker: &str, platform: &PlatformAssumptions, stack_capex_total: Money) -> Money {
    platform.share_for(ticker) * stack_capex_total / USD_PER_BILLION
}

/// Pair each allocated ticker with its baseline and rerated multiple.
pub fn company_scenarios(
    config: &ScenarioConfig,
    registry: &BaselineRegistry,
    sectors: &SectorAllocations,
) -> BuildoutResult<Vec<(CompanyScenario, &'static str)>> {
    let mut incremental: BTreeMap<Ticker, (Money, &'static str)> = BTreeMap::new();
    let mut record = |ticker: &str, amount: Money, sector: &'static str| -> BuildoutResult<()> {
        if let Some((_, previous)) = incremental.insert(ticker.to_string(), (amount, sector)) {
            return Err(BuildoutError::Configuration {
                key: ticker.to_string(),
                reason: format!("Allocated by both the {previous} and {sector} sectors"),
            });
        }
        Ok(())
    };

    for (ticker, amount) in &sectors.gpu.net_income {
        record(ticker, *amount, "gpu")?;
    }
    for (ticker, amount) in &sectors.platform.net_income {
        record(ticker, *amount, "platform")?;
    }
    record(
        &sectors.lithography.ticker,
        sectors.lithography.net_income,
        "lithography",
    )?;
    for (ticker, amount) in &sectors.memory.net_income {
        record(ticker, *amount, "memory")?;
    }
    for (ticker, amount) in &sectors.energy.net_income {
        record(ticker, *amount, "energy")?;
    }
    record(&config.tesla.ticker, sectors.tesla_base.net_income, "tesla")?;

    incremental
        .into_iter()
        .map(|(ticker, (amount, sector))| {
            let baseline = registry.get(&ticker)?.clone();
            let rerated = config.rerated_multiple(&ticker);
            Ok((CompanyScenario::new(baseline, amount, rerated), sector))
        })
        .collect()
}

/// Run the full scenario: allocation, valuation, discounting and capex burden.
pub fn run_scenario(config: &ScenarioConfig) -> BuildoutResult<ComputationOutput<ScenarioOutput>> {
    let start = Instant::now();
    let span = info_span!("scenario_run", gw_per_week = %config.demand.target_gw_per_week);
    let _guard = span.enter();

    let mut warnings = config.validate()?;
    for w in &warnings {
        warn!("{w}");
    }

    let registry = config.registry()?;
    let sectors = allocate_sectors(config)?;
    debug!(
        accelerators_per_year = %sectors.demand.accelerators_per_year,
        total_gpu_revenue = %sectors.gpu.total_gpu_revenue,
        service_revenue_pool = %sectors.gpu.service_revenue_pool,
        "sector allocation complete"
    );

    let stack_capex_total = sectors.gpu.stack_capex_total;
    let companies = company_scenarios(config, &registry, &sectors)?;

    let mut summary = Vec::with_capacity(companies.len());
    let mut cashflows = BTreeMap::new();
    let mut capex = Vec::with_capacity(companies.len());

    for (company, sector) in &companies {
        let ticker = company.baseline.ticker.clone();
        let projection = project_cashflows(company.incremental_net_income, &config.ramp)?;
        let burden = capex_burden(&ticker, &config.platform, stack_capex_total);

        debug!(
            ticker = %ticker,
            sector = *sector,
            incremental = %company.incremental_net_income,
            valuation = %company.valuation(),
            "company re-valued"
        );

        summary.push(SummaryRow {
            ticker: ticker.clone(),
            sector: sector.to_string(),
            baseline_market_cap: company.baseline.market_cap,
            baseline_net_income: company.baseline.net_income,
            incremental_net_income: company.incremental_net_income,
            scenario_valuation: company.valuation(),
            applied_multiple: company.applied_multiple(),
            pv_incremental_net_income: projection.pv_total,
            capex_burden: burden,
            ni_to_capex: CoverageRatio::compute(company.incremental_net_income, burden),
        });
        capex.push(CapexRow {
            ticker: ticker.clone(),
            service_share: config.platform.share_for(&ticker),
            capex_burden: burden,
        });
        cashflows.insert(ticker, projection);
    }

    summary.sort_by(|a, b| {
        b.scenario_valuation
            .cmp(&a.scenario_valuation)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
    capex.sort_by(|a, b| a.ticker.cmp(&b.ticker));

    let tesla = tesla_valuations(config, &registry, &sectors)?;
    if tesla.downside.valuation > tesla.base.valuation {
        warnings.push("Tesla downside valuation exceeds the base case".into());
    }

    let headline = ScenarioHeadline {
        accelerators_per_year: sectors.demand.accelerators_per_year,
        total_gpu_revenue: sectors.gpu.total_gpu_revenue / USD_PER_BILLION,
        hbm_revenue_pool: sectors.memory.stack_revenue / USD_PER_BILLION,
        annual_nameplate_gw: sectors.demand.annual_nameplate_gw,
        annual_energy_twh: sectors.energy.annual_energy_twh,
        service_revenue_pool: sectors.gpu.service_revenue_pool / USD_PER_BILLION,
        stack_capex_total: stack_capex_total / USD_PER_BILLION,
    };

    info!(companies = summary.len(), "scenario run complete");

    let output = ScenarioOutput {
        headline,
        summary,
        cashflows,
        capex,
        tesla,
        sectors,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Sector allocation of AI build-out revenue with P/E re-rating and ramped DCF",
        &serde_json::json!({
            "target_gw_per_week": config.demand.target_gw_per_week.to_string(),
            "discount_rate": config.ramp.discount_rate.to_string(),
            "terminal_growth": config.ramp.terminal_growth.to_string(),
            "base_year": config.ramp.base_year,
            "stack_multiplier": config.gpu.stack_multiplier.to_string(),
            "service_conversion": config.gpu.service_conversion.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn tesla_valuations(
    config: &ScenarioConfig,
    registry: &BaselineRegistry,
    sectors: &SectorAllocations,
) -> BuildoutResult<TeslaValuations> {
    let baseline = registry.get(&config.tesla.ticker)?;

    let case = |allocation: &TeslaAllocation, multiple: Option<Multiple>| {
        let company = CompanyScenario::new(baseline.clone(), allocation.net_income, multiple);
        TeslaCase {
            incremental_net_income: allocation.net_income,
            applied_multiple: company.applied_multiple(),
            valuation: company.valuation(),
            allocation: allocation.clone(),
        }
    };

    Ok(TeslaValuations {
        base: case(
            &sectors.tesla_base,
            config.rerated_multiple(&config.tesla.ticker),
        ),
        downside: case(&sectors.tesla_downside, Some(config.tesla.downside_multiple)),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn nvda() -> CompanyBaseline {
        CompanyBaseline::new("NVDA", dec!(4.470), dec!(44.0), dec!(37.5))
    }

    #[test]
    fn test_company_scenario_uses_rerated_multiple() {
        let company = CompanyScenario::new(nvda(), dec!(154.128), Some(dec!(32)));
        assert_eq!(company.total_net_income(), dec!(198.128));
        assert_eq!(company.applied_multiple(), dec!(32));
        assert_eq!(company.valuation(), dec!(6.340096));
    }

    #[test]
    fn test_company_scenario_falls_back_to_baseline_multiple() {
        let company = CompanyScenario::new(nvda(), dec!(0), None);
        assert_eq!(company.applied_multiple(), dec!(37.5));
        assert_eq!(company.valuation(), dec!(1.65));
    }

    #[test]
    fn test_zero_rerated_multiple_is_present() {
        let company = CompanyScenario::new(nvda(), dec!(10), Some(Decimal::ZERO));
        assert_eq!(company.applied_multiple(), Decimal::ZERO);
        assert_eq!(company.valuation(), Decimal::ZERO);
    }

    #[test]
    fn test_coverage_ratio() {
        assert_eq!(
            CoverageRatio::compute(dec!(10), Decimal::ZERO),
            CoverageRatio::NotApplicable
        );
        assert_eq!(
            CoverageRatio::compute(dec!(10), dec!(4)),
            CoverageRatio::Value(dec!(2.5))
        );
        assert_eq!(CoverageRatio::NotApplicable.to_string(), "n/a");
        assert_eq!(CoverageRatio::NotApplicable.value(), None);
    }

    #[test]
    fn test_coverage_ratio_serde() {
        let json = serde_json::to_string(&CoverageRatio::NotApplicable).unwrap();
        assert_eq!(json, "\"n/a\"");
        let back: CoverageRatio = serde_json::from_str("\"0.25\"").unwrap();
        assert_eq!(back, CoverageRatio::Value(dec!(0.25)));
    }

    #[test]
    fn test_capex_burden_only_for_service_participants() {
        let platform = PlatformAssumptions::default();
        let stack = dec!(1_630_720_000_000);
        // 0.20 * 1630.72B
        assert_eq!(capex_burden("MSFT", &platform, stack), dec!(326.144));
        assert_eq!(capex_burden("NVDA", &platform, stack), Decimal::ZERO);
        assert_eq!(capex_burden("UNKNOWN", &platform, stack), Decimal::ZERO);
    }

    #[test]
    fn test_allocation_order_feeds_service_pool() {
        let sectors = allocate_sectors(&ScenarioConfig::default()).unwrap();
        assert_eq!(
            sectors.tesla_base.robotics_net_income,
            sectors.gpu.service_revenue_pool * dec!(0.03) * dec!(0.40) / USD_PER_BILLION
        );
    }

    #[test]
    fn test_every_baseline_ticker_gets_one_scenario() {
        let config = ScenarioConfig::default();
        let registry = config.registry().unwrap();
        let sectors = allocate_sectors(&config).unwrap();
        let companies = company_scenarios(&config, &registry, &sectors).unwrap();
        assert_eq!(companies.len(), 14);
    }
}
