use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::baseline::{default_baselines, BaselineRegistry, CompanyBaseline};
use crate::demand::accelerator_demand;
use crate::error::BuildoutError;
use crate::types::{Money, Multiple, Rate, Ticker};
use crate::BuildoutResult;

/// Upper bound on the weekly build rate (GW/week).
const MAX_GW_PER_WEEK: Decimal = dec!(1_000);

/// Upper bound on implied accelerator volume per year.
const MAX_ACCELERATORS_PER_YEAR: Decimal = dec!(1_000_000_000_000);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Every constant the scenario depends on. Built once per run and passed by
/// reference to each component; nothing mutates it afterwards.
///
/// All sections carry `#[serde(default)]` so an override file only needs the
/// fields it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub baselines: Vec<CompanyBaseline>,
    pub demand: DemandAssumptions,
    pub gpu: GpuAssumptions,
    pub lithography: LithographyAssumptions,
    pub memory: MemoryAssumptions,
    pub energy: EnergyAssumptions,
    pub platform: PlatformAssumptions,
    pub tesla: TeslaAssumptions,
    /// Earnings multiple applied under the scenario, per ticker. Tickers
    /// without an entry keep their baseline multiple.
    pub rerated_multiples: BTreeMap<Ticker, Multiple>,
    pub ramp: RampAssumptions,
    pub sensitivity: SensitivityAssumptions,
}

/// Macro driver: new compute capacity brought online each week.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandAssumptions {
    pub target_gw_per_week: Decimal,
    pub weeks_per_year: Decimal,
    /// Fraction of facility power drawn by accelerators
    pub gpu_power_share: Rate,
    /// Power draw per accelerator in kW
    pub gpu_power_kw: Decimal,
}

/// One accelerator supplier. `net_margin` is absent for residual share that
/// does not accrue to a modelled public company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceleratorVendor {
    pub name: String,
    pub share: Rate,
    /// Average selling price per accelerator in USD
    pub asp: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_margin: Option<Rate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuAssumptions {
    pub vendors: Vec<AcceleratorVendor>,
    /// Total stack spend as a multiple of accelerator spend
    pub stack_multiplier: Multiple,
    /// Fraction of stack spend that converts into platform service revenue
    pub service_conversion: Rate,
}

/// A supplier holding a share of a sector revenue pool. `net_margin` is absent
/// for the unmodelled remainder of the market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketParticipant {
    pub name: String,
    pub share: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_margin: Option<Rate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LithographyAssumptions {
    pub ticker: Ticker,
    pub dies_per_wafer: Decimal,
    pub wafer_multiplier: Decimal,
    pub euv_layers_per_device: Decimal,
    /// Layer exposures one EUV tool completes per year
    pub euv_tool_annual_throughput: Decimal,
    pub installed_high_end_tools: Decimal,
    /// Price per EUV system in billions of USD
    pub unit_price: Money,
    pub systems_margin: Rate,
    /// Service revenue as a fraction of system revenue
    pub service_revenue_ratio: Rate,
    pub service_margin: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryAssumptions {
    pub stacks_per_accelerator: Decimal,
    /// Price per HBM stack in USD
    pub stack_asp: Money,
    pub vendors: Vec<MarketParticipant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyAssumptions {
    pub capacity_factor: Rate,
    pub price_per_kwh: Money,
    pub producers: Vec<MarketParticipant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformCompany {
    pub ticker: Ticker,
    /// Share of the service revenue pool
    pub share: Rate,
    pub net_margin: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformAssumptions {
    pub companies: Vec<PlatformCompany>,
}

/// Storage, FSD and robotics assumptions for the Tesla allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeslaParameterSet {
    /// Fraction of new compute capacity paired with four-hour storage
    pub storage_penetration: Rate,
    pub storage_price_per_kwh: Money,
    pub storage_margin: Rate,
    pub storage_share: Rate,
    /// FSD subscribers in millions
    pub fsd_subscribers: Decimal,
    /// Annual revenue per FSD subscriber in USD
    pub fsd_arpu: Money,
    pub fsd_margin: Rate,
    /// Share of the service revenue pool captured by robotics
    pub robotics_share: Rate,
    pub robotics_margin: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeslaAssumptions {
    pub ticker: Ticker,
    pub base: TeslaParameterSet,
    pub downside: TeslaParameterSet,
    /// Multiple applied to the downside case
    pub downside_multiple: Multiple,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampYear {
    pub year: i32,
    pub utilisation: Rate,
}

/// Utilisation ramp and discounting assumptions shared by every company.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RampAssumptions {
    pub base_year: i32,
    pub schedule: Vec<RampYear>,
    pub discount_rate: Rate,
    pub terminal_growth: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityAssumptions {
    /// Accelerator vendor whose share, ASP and margin are swept
    pub vendor: String,
    pub share_values: Vec<Rate>,
    pub asp_multipliers: Vec<Decimal>,
    pub margin_multipliers: Vec<Decimal>,
    /// Fixed multiple used to re-value grid cells
    pub rerated_multiple: Multiple,
    pub stack_multipliers: Vec<Multiple>,
    pub service_conversions: Vec<Rate>,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for ScenarioConfig {
    fn default() -> Self {
        let rerated_multiples = [
            ("NVDA", dec!(32.0)),
            ("AMD", dec!(34.0)),
            ("AAPL", dec!(34.0)),
            ("MSFT", dec!(36.0)),
            ("GOOGL", dec!(32.0)),
            ("AMZN", dec!(38.0)),
            ("META", dec!(29.0)),
            ("ORCL", dec!(26.0)),
            ("ASML", dec!(37.0)),
            ("SKH", dec!(24.0)),
            ("MU", dec!(30.0)),
            ("NEE", dec!(22.0)),
            ("CEG", dec!(24.0)),
            ("TSLA", dec!(65.0)),
        ]
        .into_iter()
        .map(|(t, m)| (t.to_string(), m))
        .collect();

        Self {
            baselines: default_baselines(),
            demand: DemandAssumptions::default(),
            gpu: GpuAssumptions::default(),
            lithography: LithographyAssumptions::default(),
            memory: MemoryAssumptions::default(),
            energy: EnergyAssumptions::default(),
            platform: PlatformAssumptions::default(),
            tesla: TeslaAssumptions::default(),
            rerated_multiples,
            ramp: RampAssumptions::default(),
            sensitivity: SensitivityAssumptions::default(),
        }
    }
}

impl Default for DemandAssumptions {
    fn default() -> Self {
        Self {
            target_gw_per_week: dec!(1.0),
            weeks_per_year: dec!(52),
            gpu_power_share: dec!(0.7),
            gpu_power_kw: dec!(0.7),
        }
    }
}

impl Default for GpuAssumptions {
    fn default() -> Self {
        Self {
            vendors: vec![
                AcceleratorVendor {
                    name: "NVDA".into(),
                    share: dec!(0.65),
                    asp: dec!(12_000),
                    net_margin: Some(dec!(0.38)),
                },
                AcceleratorVendor {
                    name: "AMD".into(),
                    share: dec!(0.25),
                    asp: dec!(10_000),
                    net_margin: Some(dec!(0.28)),
                },
                AcceleratorVendor {
                    name: "CUSTOM".into(),
                    share: dec!(0.10),
                    asp: dec!(9_000),
                    net_margin: None,
                },
            ],
            stack_multiplier: dec!(2.8),
            service_conversion: dec!(0.8),
        }
    }
}

impl Default for LithographyAssumptions {
    fn default() -> Self {
        Self {
            ticker: "ASML".into(),
            dies_per_wafer: dec!(70),
            wafer_multiplier: dec!(4),
            euv_layers_per_device: dec!(22),
            euv_tool_annual_throughput: dec!(1_100_000),
            installed_high_end_tools: dec!(20),
            unit_price: dec!(0.32),
            systems_margin: dec!(0.28),
            service_revenue_ratio: dec!(0.25),
            service_margin: dec!(0.20),
        }
    }
}

impl Default for MemoryAssumptions {
    fn default() -> Self {
        Self {
            stacks_per_accelerator: dec!(8),
            stack_asp: dec!(690),
            vendors: vec![
                participant("SKH", dec!(0.60), Some(dec!(0.22))),
                participant("MU", dec!(0.30), Some(dec!(0.20))),
                participant("OTHER", dec!(0.10), None),
            ],
        }
    }
}

impl Default for EnergyAssumptions {
    fn default() -> Self {
        Self {
            capacity_factor: dec!(0.90),
            price_per_kwh: dec!(0.065),
            producers: vec![
                participant("NEE", dec!(0.40), Some(dec!(0.18))),
                participant("CEG", dec!(0.30), Some(dec!(0.22))),
                participant("OTHER", dec!(0.30), None),
            ],
        }
    }
}

impl Default for PlatformAssumptions {
    fn default() -> Self {
        let companies = [
            ("AAPL", dec!(0.15), dec!(0.32)),
            ("MSFT", dec!(0.20), dec!(0.35)),
            ("GOOGL", dec!(0.15), dec!(0.30)),
            ("AMZN", dec!(0.12), dec!(0.32)),
            ("META", dec!(0.10), dec!(0.35)),
            ("ORCL", dec!(0.05), dec!(0.30)),
        ]
        .into_iter()
        .map(|(ticker, share, net_margin)| PlatformCompany {
            ticker: ticker.into(),
            share,
            net_margin,
        })
        .collect();
        Self { companies }
    }
}

impl TeslaParameterSet {
    pub fn base_case() -> Self {
        Self {
            storage_penetration: dec!(0.35),
            storage_price_per_kwh: dec!(300),
            storage_margin: dec!(0.28),
            storage_share: dec!(0.45),
            fsd_subscribers: dec!(20),
            fsd_arpu: dec!(1_440),
            fsd_margin: dec!(0.55),
            robotics_share: dec!(0.03),
            robotics_margin: dec!(0.40),
        }
    }

    /// 12M FSD subscribers at $80/month, 20% storage attach at $220/kWh,
    /// robotics margin 25%.
    pub fn downside_case() -> Self {
        Self {
            storage_penetration: dec!(0.20),
            storage_price_per_kwh: dec!(220),
            storage_margin: dec!(0.22),
            storage_share: dec!(0.35),
            fsd_subscribers: dec!(12),
            fsd_arpu: dec!(960),
            fsd_margin: dec!(0.45),
            robotics_share: dec!(0.03),
            robotics_margin: dec!(0.25),
        }
    }
}

impl Default for TeslaParameterSet {
    fn default() -> Self {
        Self::base_case()
    }
}

impl Default for TeslaAssumptions {
    fn default() -> Self {
        Self {
            ticker: "TSLA".into(),
            base: TeslaParameterSet::base_case(),
            downside: TeslaParameterSet::downside_case(),
            downside_multiple: dec!(55.0),
        }
    }
}

impl Default for RampAssumptions {
    fn default() -> Self {
        let utilisation = [
            dec!(0.10),
            dec!(0.20),
            dec!(0.40),
            dec!(0.70),
            dec!(1.00),
            dec!(1.10),
            dec!(1.20),
            dec!(1.20),
            dec!(1.20),
        ];
        let schedule = (2026..)
            .zip(utilisation)
            .map(|(year, utilisation)| RampYear { year, utilisation })
            .collect();
        Self {
            base_year: 2025,
            schedule,
            discount_rate: dec!(0.10),
            terminal_growth: dec!(0.03),
        }
    }
}

impl Default for SensitivityAssumptions {
    fn default() -> Self {
        let multipliers = vec![dec!(0.8), dec!(0.9), dec!(1.0), dec!(1.1), dec!(1.2)];
        Self {
            vendor: "NVDA".into(),
            share_values: vec![dec!(0.55), dec!(0.60), dec!(0.65), dec!(0.70), dec!(0.75)],
            asp_multipliers: multipliers.clone(),
            margin_multipliers: multipliers,
            rerated_multiple: dec!(32.0),
            stack_multipliers: vec![dec!(2.0), dec!(2.4), dec!(2.8), dec!(3.2), dec!(3.6)],
            service_conversions: vec![dec!(0.6), dec!(0.7), dec!(0.8), dec!(0.9)],
        }
    }
}

fn participant(name: &str, share: Rate, net_margin: Option<Rate>) -> MarketParticipant {
    MarketParticipant {
        name: name.into(),
        share,
        net_margin,
    }
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

impl PlatformAssumptions {
    /// Service-pool share for a ticker; zero for companies outside the pool.
    pub fn share_for(&self, ticker: &str) -> Rate {
        self.companies
            .iter()
            .find(|c| c.ticker == ticker)
            .map(|c| c.share)
            .unwrap_or(Decimal::ZERO)
    }
}

impl GpuAssumptions {
    pub fn vendor(&self, name: &str) -> BuildoutResult<&AcceleratorVendor> {
        self.vendors
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| BuildoutError::Configuration {
                key: name.to_string(),
                reason: "Accelerator vendor not present in the GPU share table".into(),
            })
    }
}

impl ScenarioConfig {
    pub fn registry(&self) -> BuildoutResult<BaselineRegistry> {
        BaselineRegistry::from_entries(&self.baselines)
    }

    /// The multiple a ticker is re-valued at under the scenario, if any.
    pub fn rerated_multiple(&self, ticker: &str) -> Option<Multiple> {
        self.rerated_multiples.get(ticker).copied()
    }

    /// Every ticker that receives incremental income, with the sector that
    /// allocates it, in allocation order.
    pub fn allocated_tickers(&self) -> Vec<(&str, &'static str)> {
        let mut tickers = Vec::new();
        for v in self.gpu.vendors.iter().filter(|v| v.net_margin.is_some()) {
            tickers.push((v.name.as_str(), "gpu"));
        }
        for c in &self.platform.companies {
            tickers.push((c.ticker.as_str(), "platform"));
        }
        tickers.push((self.lithography.ticker.as_str(), "lithography"));
        for v in self.memory.vendors.iter().filter(|v| v.net_margin.is_some()) {
            tickers.push((v.name.as_str(), "memory"));
        }
        for p in self.energy.producers.iter().filter(|p| p.net_margin.is_some()) {
            tickers.push((p.name.as_str(), "energy"));
        }
        tickers.push((self.tesla.ticker.as_str(), "tesla"));
        tickers
    }

    /// Check every assumption before any computation runs.
    ///
    /// Returns non-fatal warnings; impossible configurations are errors.
    pub fn validate(&self) -> BuildoutResult<Vec<String>> {
        let mut warnings = Vec::new();
        let registry = self.registry()?;

        // --- Demand ---
        check_positive("demand.target_gw_per_week", self.demand.target_gw_per_week)?;
        check_positive("demand.weeks_per_year", self.demand.weeks_per_year)?;
        check_positive("demand.gpu_power_kw", self.demand.gpu_power_kw)?;
        check_unit_interval("demand.gpu_power_share", self.demand.gpu_power_share)?;
        check_at_most(
            "demand.target_gw_per_week",
            self.demand.target_gw_per_week,
            MAX_GW_PER_WEEK,
        )?;
        let demand = accelerator_demand(&self.demand)?;
        if demand.accelerators_per_year > MAX_ACCELERATORS_PER_YEAR {
            return Err(BuildoutError::InvalidInput {
                field: "demand".into(),
                reason: format!(
                    "Implied volume of {} accelerators per year exceeds {MAX_ACCELERATORS_PER_YEAR}",
                    demand.accelerators_per_year
                ),
            });
        }

        // --- Sector share tables ---
        for v in &self.gpu.vendors {
            check_unit_interval(&format!("gpu.vendors:{} share", v.name), v.share)?;
            check_non_negative(&format!("gpu.vendors:{} asp", v.name), v.asp)?;
            if let Some(m) = v.net_margin {
                check_unit_interval(&format!("gpu.vendors:{} net_margin", v.name), m)?;
            }
        }
        check_share_total("gpu.vendors", self.gpu.vendors.iter().map(|v| v.share))?;
        check_non_negative("gpu.stack_multiplier", self.gpu.stack_multiplier)?;
        check_unit_interval("gpu.service_conversion", self.gpu.service_conversion)?;

        let litho = &self.lithography;
        check_positive("lithography.dies_per_wafer", litho.dies_per_wafer)?;
        check_positive(
            "lithography.euv_tool_annual_throughput",
            litho.euv_tool_annual_throughput,
        )?;
        check_non_negative(
            "lithography.installed_high_end_tools",
            litho.installed_high_end_tools,
        )?;
        check_unit_interval("lithography.systems_margin", litho.systems_margin)?;
        check_unit_interval("lithography.service_margin", litho.service_margin)?;

        check_participants("memory.vendors", &self.memory.vendors)?;
        check_participants("energy.producers", &self.energy.producers)?;
        check_unit_interval("energy.capacity_factor", self.energy.capacity_factor)?;

        for c in &self.platform.companies {
            check_unit_interval(&format!("platform.companies:{} share", c.ticker), c.share)?;
            check_unit_interval(
                &format!("platform.companies:{} net_margin", c.ticker),
                c.net_margin,
            )?;
        }
        let platform_total: Rate = self.platform.companies.iter().map(|c| c.share).sum();
        for (label, params) in [("base", &self.tesla.base), ("downside", &self.tesla.downside)] {
            check_tesla_parameters(label, params)?;
            check_share_total(
                &format!("platform.companies + tesla.{label}.robotics_share"),
                [platform_total, params.robotics_share].into_iter(),
            )?;
        }
        if self.tesla.base.robotics_share != self.tesla.downside.robotics_share {
            warnings.push(
                "Tesla base and downside cases use different robotics shares of the service pool"
                    .into(),
            );
        }

        // --- Tickers ---
        let mut seen = BTreeSet::new();
        for (ticker, sector) in self.allocated_tickers() {
            if !registry.contains(ticker) {
                return Err(BuildoutError::Configuration {
                    key: ticker.to_string(),
                    reason: format!("{sector} sector allocates to a ticker with no baseline"),
                });
            }
            if !seen.insert(ticker) {
                return Err(BuildoutError::Configuration {
                    key: ticker.to_string(),
                    reason: "Ticker is allocated incremental income by more than one sector"
                        .into(),
                });
            }
        }
        for ticker in registry.tickers() {
            if !seen.contains(ticker) {
                warnings.push(format!(
                    "{ticker} has a baseline but no sector allocates to it; it is left out of the summary"
                ));
            }
        }
        for (ticker, multiple) in &self.rerated_multiples {
            check_non_negative(&format!("rerated_multiples:{ticker}"), *multiple)?;
            if !registry.contains(ticker) {
                warnings.push(format!("Rerated multiple given for unknown ticker {ticker}"));
            }
        }
        check_non_negative("tesla.downside_multiple", self.tesla.downside_multiple)?;

        // --- Ramp ---
        self.ramp.validate(&mut warnings)?;

        // --- Sensitivity ---
        let s = &self.sensitivity;
        let vendor = self.gpu.vendor(&s.vendor)?;
        if vendor.net_margin.is_none() {
            return Err(BuildoutError::Configuration {
                key: s.vendor.clone(),
                reason: "Sensitivity vendor has no net margin to sweep".into(),
            });
        }
        registry.get(&s.vendor)?;
        for (field, values) in [
            ("sensitivity.share_values", &s.share_values),
            ("sensitivity.asp_multipliers", &s.asp_multipliers),
            ("sensitivity.margin_multipliers", &s.margin_multipliers),
        ] {
            if values.is_empty() {
                return Err(BuildoutError::InvalidInput {
                    field: field.into(),
                    reason: "Sensitivity axis must have at least one value".into(),
                });
            }
        }

        Ok(warnings)
    }
}

impl RampAssumptions {
    /// Check the discounting precondition and the shape of the schedule.
    pub fn validate(&self, warnings: &mut Vec<String>) -> BuildoutResult<()> {
        if self.discount_rate <= dec!(-1) {
            return Err(BuildoutError::InvalidInput {
                field: "ramp.discount_rate".into(),
                reason: "Discount rate must be greater than -100%".into(),
            });
        }
        if self.discount_rate <= self.terminal_growth {
            return Err(BuildoutError::FinancialImpossibility(format!(
                "Terminal growth rate ({}) must be less than the discount rate ({}) for the Gordon growth model",
                self.terminal_growth, self.discount_rate
            )));
        }
        if self.schedule.is_empty() {
            return Err(BuildoutError::InvalidInput {
                field: "ramp.schedule".into(),
                reason: "Ramp schedule must contain at least one year".into(),
            });
        }

        let mut prev: Option<&RampYear> = None;
        for step in &self.schedule {
            if step.year <= self.base_year {
                return Err(BuildoutError::InvalidInput {
                    field: format!("ramp.schedule:{}", step.year),
                    reason: format!("Ramp years must fall after the base year {}", self.base_year),
                });
            }
            check_non_negative(&format!("ramp.schedule:{} utilisation", step.year), step.utilisation)?;
            if let Some(p) = prev {
                if step.year <= p.year {
                    return Err(BuildoutError::InvalidInput {
                        field: format!("ramp.schedule:{}", step.year),
                        reason: "Ramp years must be strictly increasing".into(),
                    });
                }
                if step.utilisation < p.utilisation {
                    warnings.push(format!(
                        "Utilisation falls from {} to {} in {}",
                        p.utilisation, step.utilisation, step.year
                    ));
                }
            }
            prev = Some(step);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn check_positive(field: &str, value: Decimal) -> BuildoutResult<()> {
    if value <= Decimal::ZERO {
        return Err(BuildoutError::InvalidInput {
            field: field.into(),
            reason: format!("Must be positive (got {value})"),
        });
    }
    Ok(())
}

fn check_at_most(field: &str, value: Decimal, limit: Decimal) -> BuildoutResult<()> {
    if value > limit {
        return Err(BuildoutError::InvalidInput {
            field: field.into(),
            reason: format!("Must not exceed {limit} (got {value})"),
        });
    }
    Ok(())
}

fn check_non_negative(field: &str, value: Decimal) -> BuildoutResult<()> {
    if value < Decimal::ZERO {
        return Err(BuildoutError::InvalidInput {
            field: field.into(),
            reason: format!("Must not be negative (got {value})"),
        });
    }
    Ok(())
}

fn check_unit_interval(field: &str, value: Rate) -> BuildoutResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(BuildoutError::InvalidInput {
            field: field.into(),
            reason: format!("Must be between 0 and 1 (got {value})"),
        });
    }
    Ok(())
}

fn check_share_total(field: &str, shares: impl Iterator<Item = Rate>) -> BuildoutResult<()> {
    let total: Rate = shares.sum();
    if total > Decimal::ONE {
        return Err(BuildoutError::InvalidInput {
            field: field.into(),
            reason: format!("Shares must sum to at most 1.0 (got {total})"),
        });
    }
    Ok(())
}

fn check_participants(field: &str, participants: &[MarketParticipant]) -> BuildoutResult<()> {
    for p in participants {
        check_unit_interval(&format!("{field}:{} share", p.name), p.share)?;
        if let Some(m) = p.net_margin {
            check_unit_interval(&format!("{field}:{} net_margin", p.name), m)?;
        }
    }
    check_share_total(field, participants.iter().map(|p| p.share))
}

fn check_tesla_parameters(label: &str, p: &TeslaParameterSet) -> BuildoutResult<()> {
    for (name, value) in [
        ("storage_penetration", p.storage_penetration),
        ("storage_margin", p.storage_margin),
        ("storage_share", p.storage_share),
        ("fsd_margin", p.fsd_margin),
        ("robotics_share", p.robotics_share),
        ("robotics_margin", p.robotics_margin),
    ] {
        check_unit_interval(&format!("tesla.{label}.{name}"), value)?;
    }
    check_non_negative(&format!("tesla.{label}.fsd_subscribers"), p.fsd_subscribers)?;
    check_non_negative(&format!("tesla.{label}.fsd_arpu"), p.fsd_arpu)?;
    check_non_negative(
        &format!("tesla.{label}.storage_price_per_kwh"),
        p.storage_price_per_kwh,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let warnings = ScenarioConfig::default().validate().unwrap();
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn test_default_ramp_runs_2026_to_2034() {
        let ramp = RampAssumptions::default();
        assert_eq!(ramp.schedule.len(), 9);
        assert_eq!(ramp.schedule[0].year, 2026);
        assert_eq!(ramp.schedule[8].year, 2034);
        assert_eq!(ramp.schedule[8].utilisation, dec!(1.20));
    }

    #[test]
    fn test_every_allocated_ticker_has_a_baseline() {
        let config = ScenarioConfig::default();
        let allocated = config.allocated_tickers();
        assert_eq!(allocated.len(), 14);
        let registry = config.registry().unwrap();
        assert!(allocated.iter().all(|(t, _)| registry.contains(t)));
    }

    #[test]
    fn test_terminal_growth_at_discount_rate_rejected() {
        let mut config = ScenarioConfig::default();
        config.ramp.terminal_growth = config.ramp.discount_rate;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, BuildoutError::FinancialImpossibility(_)));
    }

    #[test]
    fn test_build_rate_above_limit_rejected() {
        let mut config = ScenarioConfig::default();
        config.demand.target_gw_per_week = dec!(100_000_000_000_000_000_000);
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            BuildoutError::InvalidInput { ref field, .. } if field == "demand.target_gw_per_week"
        ));

        config.demand.target_gw_per_week = MAX_GW_PER_WEEK;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tiny_power_draw_rejected() {
        let mut config = ScenarioConfig::default();
        config.demand.gpu_power_kw = dec!(0.000000000001);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gpu_shares_above_one_rejected() {
        let mut config = ScenarioConfig::default();
        config.gpu.vendors[0].share = dec!(0.70);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_allocated_ticker_rejected() {
        let mut config = ScenarioConfig::default();
        config.lithography.ticker = "TSM".into();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, BuildoutError::Configuration { .. }));
    }

    #[test]
    fn test_ticker_allocated_twice_rejected() {
        let mut config = ScenarioConfig::default();
        config.memory.vendors[1].name = "SKH".into();
        config.memory.vendors[1].share = dec!(0.30);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, BuildoutError::Configuration { .. }));
    }

    #[test]
    fn test_falling_utilisation_warns() {
        let mut config = ScenarioConfig::default();
        config.ramp.schedule[8].utilisation = dec!(1.0);
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("2034"));
    }

    #[test]
    fn test_unsorted_ramp_rejected() {
        let mut config = ScenarioConfig::default();
        config.ramp.schedule.swap(2, 3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_platform_share_lookup_defaults_to_zero() {
        let platform = PlatformAssumptions::default();
        assert_eq!(platform.share_for("MSFT"), dec!(0.20));
        assert_eq!(platform.share_for("NVDA"), Decimal::ZERO);
        assert_eq!(platform.share_for("TSLA"), Decimal::ZERO);
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config: ScenarioConfig =
            serde_json::from_str(r#"{"demand": {"target_gw_per_week": "2.0"}}"#).unwrap();
        assert_eq!(config.demand.target_gw_per_week, dec!(2.0));
        assert_eq!(config.demand.weeks_per_year, dec!(52));
        assert_eq!(config.baselines.len(), 14);
        assert_eq!(config.rerated_multiple("NVDA"), Some(dec!(32.0)));
    }
}
