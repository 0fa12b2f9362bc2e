use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::config::ScenarioConfig;
use crate::demand::{accelerator_demand, DemandOutput};
use crate::error::BuildoutError;
use crate::sectors::gpu::{allocate_gpu, service_revenue_pool, vendor_net_income};
use crate::sectors::AllocationInputs;
use crate::types::*;
use crate::BuildoutResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A 2-way table: `cells[i][j]` is the metric at `row_values[i]`,
/// `column_values[j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub metric: String,
    pub row_variable: String,
    pub column_variable: String,
    pub row_values: Vec<Decimal>,
    pub column_values: Vec<Decimal>,
    pub cells: Vec<Vec<Decimal>>,
    /// Cell closest to the un-perturbed assumptions (row, col)
    pub base_case_position: (usize, usize),
}

/// The vendor share sweeps, both as incremental income and re-valued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityGrids {
    pub vendor: String,
    pub rerated_multiple: Multiple,
    /// Incremental net income (billions) by share × ASP multiplier
    pub asp: SensitivityGrid,
    /// Incremental net income (billions) by share × margin multiplier
    pub margin: SensitivityGrid,
    /// Valuation (trillions) by share × ASP multiplier
    pub asp_valuation: SensitivityGrid,
    /// Valuation (trillions) by share × margin multiplier
    pub margin_valuation: SensitivityGrid,
    /// Service revenue pool (billions) by stack multiplier × service conversion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_pool: Option<SensitivityGrid>,
}

// ---------------------------------------------------------------------------
// Grid helpers
// ---------------------------------------------------------------------------

/// Generate the sweep values for a sensitivity variable from min to max with step.
pub fn sweep_values(var: &SensitivityVariable) -> BuildoutResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(BuildoutError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Step must be positive".into(),
        });
    }
    if var.min > var.max {
        return Err(BuildoutError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Min must be <= max".into(),
        });
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        current += var.step;
    }
    // Ensure max is included if step doesn't land exactly on it
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }

    Ok(values)
}

/// Find the closest index to a target value in a sorted list.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn evaluate_grid<F>(
    metric: &str,
    row_variable: &str,
    column_variable: &str,
    row_values: &[Decimal],
    column_values: &[Decimal],
    base_case: (Decimal, Decimal),
    eval_fn: F,
) -> BuildoutResult<SensitivityGrid>
where
    F: Fn(Decimal, Decimal) -> Decimal,
{
    for (name, values) in [(row_variable, row_values), (column_variable, column_values)] {
        if values.is_empty() {
            return Err(BuildoutError::InvalidInput {
                field: format!("variable:{name}"),
                reason: "Sensitivity axis must have at least one value".into(),
            });
        }
    }

    let cells = row_values
        .iter()
        .map(|r| column_values.iter().map(|c| eval_fn(*r, *c)).collect())
        .collect();

    Ok(SensitivityGrid {
        metric: metric.to_string(),
        row_variable: row_variable.to_string(),
        column_variable: column_variable.to_string(),
        row_values: row_values.to_vec(),
        column_values: column_values.to_vec(),
        cells,
        base_case_position: (
            closest_index(row_values, base_case.0),
            closest_index(column_values, base_case.1),
        ),
    })
}

impl SensitivityGrid {
    /// Cell at exact axis values, if both are on the grid.
    pub fn cell(&self, row_value: Decimal, column_value: Decimal) -> Option<Decimal> {
        let i = self.row_values.iter().position(|v| *v == row_value)?;
        let j = self.column_values.iter().position(|v| *v == column_value)?;
        Some(self.cells[i][j])
    }

    pub fn base_case_value(&self) -> Decimal {
        let (i, j) = self.base_case_position;
        self.cells[i][j]
    }

    /// Turn an incremental-income grid into valuations (trillions):
    /// `(baseline_net_income + cell) * multiple / 1000`.
    pub fn revalue(&self, baseline_net_income: Money, multiple: Multiple) -> SensitivityGrid {
        SensitivityGrid {
            metric: "valuation".into(),
            cells: self
                .cells
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| (baseline_net_income + cell) * multiple / BILLIONS_PER_TRILLION)
                        .collect()
                })
                .collect(),
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Vendor incremental income by share × ASP multiplier, margin at baseline.
pub fn asp_share_grid(
    demand: &DemandOutput,
    config: &ScenarioConfig,
) -> BuildoutResult<SensitivityGrid> {
    let s = &config.sensitivity;
    let vendor = config.gpu.vendor(&s.vendor)?;
    let margin = vendor_margin(&s.vendor, vendor.net_margin)?;
    let units = demand.accelerators_per_year;

    evaluate_grid(
        "incremental_net_income",
        "share",
        "asp_multiplier",
        &s.share_values,
        &s.asp_multipliers,
        (vendor.share, Decimal::ONE),
        |share, mult| vendor_net_income(units, share, vendor.asp * mult, margin),
    )
}

/// Vendor incremental income by share × margin multiplier, ASP at baseline.
pub fn margin_share_grid(
    demand: &DemandOutput,
    config: &ScenarioConfig,
) -> BuildoutResult<SensitivityGrid> {
    let s = &config.sensitivity;
    let vendor = config.gpu.vendor(&s.vendor)?;
    let margin = vendor_margin(&s.vendor, vendor.net_margin)?;
    let units = demand.accelerators_per_year;

    evaluate_grid(
        "incremental_net_income",
        "share",
        "margin_multiplier",
        &s.share_values,
        &s.margin_multipliers,
        (vendor.share, Decimal::ONE),
        |share, mult| vendor_net_income(units, share, vendor.asp, margin * mult),
    )
}

/// Service revenue pool (billions) by stack multiplier × service conversion.
pub fn service_pool_grid(
    demand: &DemandOutput,
    config: &ScenarioConfig,
) -> BuildoutResult<SensitivityGrid> {
    let s = &config.sensitivity;
    let gpu = allocate_gpu(&AllocationInputs::from(demand), &config.gpu);
    let total = gpu.total_gpu_revenue;

    evaluate_grid(
        "service_revenue_pool",
        "stack_multiplier",
        "service_conversion",
        &s.stack_multipliers,
        &s.service_conversions,
        (config.gpu.stack_multiplier, config.gpu.service_conversion),
        |mult, conversion| service_revenue_pool(total, mult, conversion) / USD_PER_BILLION,
    )
}

/// Build every grid. Needs only the demand model and the config; the main
/// scenario run is not required.
pub fn build_sensitivity_grids(
    config: &ScenarioConfig,
) -> BuildoutResult<ComputationOutput<SensitivityGrids>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let s = &config.sensitivity;
    let demand = accelerator_demand(&config.demand)?;
    let baseline = config.registry()?.get(&s.vendor)?.net_income;

    let asp = asp_share_grid(&demand, config)?;
    let margin = margin_share_grid(&demand, config)?;
    let service_pool = if s.stack_multipliers.is_empty() || s.service_conversions.is_empty() {
        None
    } else {
        Some(service_pool_grid(&demand, config)?)
    };

    let base_share = config.gpu.vendor(&s.vendor)?.share;
    for grid in [&asp, &margin] {
        let (i, j) = grid.base_case_position;
        if grid.row_values[i] != base_share || grid.column_values[j] != Decimal::ONE {
            warnings.push(format!(
                "{} grid does not contain the un-perturbed base case; nearest cell used",
                grid.column_variable
            ));
        }
    }

    debug!(
        vendor = %s.vendor,
        rows = asp.row_values.len(),
        base_case = %asp.base_case_value(),
        "sensitivity grids built"
    );

    let output = SensitivityGrids {
        vendor: s.vendor.clone(),
        rerated_multiple: s.rerated_multiple,
        asp_valuation: asp.revalue(baseline, s.rerated_multiple),
        margin_valuation: margin.revalue(baseline, s.rerated_multiple),
        asp,
        margin,
        service_pool,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way Sensitivity Analysis (vendor share × ASP / margin)",
        &serde_json::json!({
            "vendor": s.vendor,
            "rerated_multiple": s.rerated_multiple.to_string(),
            "accelerators_per_year": demand.accelerators_per_year.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn vendor_margin(vendor: &str, net_margin: Option<Rate>) -> BuildoutResult<Rate> {
    net_margin.ok_or_else(|| BuildoutError::Configuration {
        key: vendor.to_string(),
        reason: "Sensitivity vendor has no net margin".into(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn default_demand() -> DemandOutput {
        accelerator_demand(&ScenarioConfig::default().demand).unwrap()
    }

    #[test]
    fn test_sweep_values() {
        let values = sweep_values(&SensitivityVariable {
            name: "share".into(),
            min: dec!(0.55),
            max: dec!(0.75),
            step: dec!(0.05),
        })
        .unwrap();
        assert_eq!(
            values,
            vec![dec!(0.55), dec!(0.60), dec!(0.65), dec!(0.70), dec!(0.75)]
        );
    }

    #[test]
    fn test_sweep_values_includes_max_off_step() {
        let values = sweep_values(&SensitivityVariable {
            name: "mult".into(),
            min: dec!(0.8),
            max: dec!(1.25),
            step: dec!(0.2),
        })
        .unwrap();
        assert_eq!(values, vec![dec!(0.8), dec!(1.0), dec!(1.2), dec!(1.25)]);
    }

    #[test]
    fn test_sweep_values_rejects_bad_step() {
        let var = SensitivityVariable {
            name: "x".into(),
            min: dec!(1),
            max: dec!(2),
            step: Decimal::ZERO,
        };
        assert!(sweep_values(&var).is_err());
    }

    #[test]
    fn test_base_cell_matches_gpu_allocator() {
        let config = ScenarioConfig::default();
        let demand = default_demand();
        let grid = asp_share_grid(&demand, &config).unwrap();
        let allocation = allocate_gpu(&AllocationInputs::from(&demand), &config.gpu);

        assert_eq!(
            grid.cell(dec!(0.65), dec!(1.0)).unwrap(),
            allocation.net_income["NVDA"]
        );
        assert_eq!(grid.base_case_position, (2, 2));
        assert_eq!(grid.base_case_value(), allocation.net_income["NVDA"]);
    }

    #[test]
    fn test_margin_grid_base_cell_matches_asp_grid() {
        let config = ScenarioConfig::default();
        let demand = default_demand();
        let asp = asp_share_grid(&demand, &config).unwrap();
        let margin = margin_share_grid(&demand, &config).unwrap();
        assert_eq!(asp.base_case_value(), margin.base_case_value());
        assert_eq!(asp.row_values, margin.row_values);
    }

    #[test]
    fn test_grid_is_monotone_in_both_axes() {
        let grid = asp_share_grid(&default_demand(), &ScenarioConfig::default()).unwrap();
        for i in 0..grid.row_values.len() {
            for j in 1..grid.column_values.len() {
                assert!(grid.cells[i][j] > grid.cells[i][j - 1]);
            }
        }
        for j in 0..grid.column_values.len() {
            for i in 1..grid.row_values.len() {
                assert!(grid.cells[i][j] > grid.cells[i - 1][j]);
            }
        }
    }

    #[test]
    fn test_revalue() {
        let grid = margin_share_grid(&default_demand(), &ScenarioConfig::default()).unwrap();
        let valued = grid.revalue(dec!(44.0), dec!(32.0));
        assert_eq!(valued.metric, "valuation");
        let base = grid.base_case_value();
        assert_eq!(valued.base_case_value(), (dec!(44.0) + base) * dec!(32.0) / dec!(1000));
        // (44 + 154.128) * 32 / 1000
        assert_eq!(valued.base_case_value(), dec!(6.340096));
    }

    #[test]
    fn test_service_pool_grid_base_cell() {
        let grid = service_pool_grid(&default_demand(), &ScenarioConfig::default()).unwrap();
        assert_eq!(grid.cell(dec!(2.8), dec!(0.8)).unwrap(), dec!(1304.576));
    }

    #[test]
    fn test_empty_axis_rejected() {
        let mut config = ScenarioConfig::default();
        config.sensitivity.asp_multipliers.clear();
        assert!(asp_share_grid(&default_demand(), &config).is_err());
    }

    #[test]
    fn test_build_grids_without_scenario_run() {
        let result = build_sensitivity_grids(&ScenarioConfig::default()).unwrap();
        let out = &result.result;
        assert!(result.warnings.is_empty());
        assert_eq!(out.asp.cells.len(), 5);
        assert_eq!(out.asp.cells[0].len(), 5);
        assert!(out.service_pool.is_some());
        assert_eq!(out.asp_valuation.base_case_value(), dec!(6.340096));
    }

    #[test]
    fn test_off_grid_base_case_warns() {
        let mut config = ScenarioConfig::default();
        config.sensitivity.share_values = vec![dec!(0.5), dec!(0.6)];
        let result = build_sensitivity_grids(&config).unwrap();
        assert_eq!(result.warnings.len(), 2);
    }
}
