use clap::Args;
use serde_json::{json, Value};
use std::time::Instant;

use buildout_core::config::ScenarioConfig;
use buildout_core::demand::accelerator_demand;
use buildout_core::scenario::{self, TeslaCase};
use buildout_core::with_metadata;

use super::{envelope, CommandResult};

/// Arguments for the scenario summary
#[derive(Args)]
pub struct ScenarioArgs {
    /// Print the complete output (cashflows, capex, Tesla cases and raw sector
    /// allocations) instead of the summary table
    #[arg(long)]
    pub full: bool,
}

/// Arguments for the cashflow report
#[derive(Args)]
pub struct CashflowsArgs {
    /// Show the year-by-year ramp for one ticker
    #[arg(long)]
    pub ticker: Option<String>,
}

pub fn run_scenario(config: &ScenarioConfig, args: ScenarioArgs) -> CommandResult {
    let output = scenario::run_scenario(config)?;
    if args.full {
        return Ok(serde_json::to_value(&output)?);
    }
    Ok(envelope(
        &output,
        serde_json::to_value(&output.result.headline)?,
        serde_json::to_value(&output.result.summary)?,
    ))
}

pub fn run_cashflows(config: &ScenarioConfig, args: CashflowsArgs) -> CommandResult {
    let output = scenario::run_scenario(config)?;
    let out = &output.result;

    if let Some(ticker) = args.ticker {
        let projection = out
            .cashflows
            .get(&ticker)
            .ok_or_else(|| format!("No cashflows for ticker '{}'", ticker))?;
        let result = json!({
            "ticker": ticker,
            "pv_of_cashflows": projection.pv_of_cashflows,
            "terminal_value": projection.terminal_value,
            "pv_of_terminal": projection.pv_of_terminal,
            "pv_total": projection.pv_total,
            "terminal_value_pct": projection.terminal_value_pct,
        });
        return Ok(envelope(
            &output,
            result,
            serde_json::to_value(&projection.cashflows)?,
        ));
    }

    // Follow the summary's valuation order
    let rows: Vec<Value> = out
        .summary
        .iter()
        .filter_map(|row| out.cashflows.get(&row.ticker).map(|p| (row, p)))
        .map(|(row, p)| {
            json!({
                "ticker": row.ticker,
                "incremental_net_income": row.incremental_net_income,
                "pv_of_cashflows": p.pv_of_cashflows,
                "pv_of_terminal": p.pv_of_terminal,
                "pv_total": p.pv_total,
                "terminal_value_pct": p.terminal_value_pct,
            })
        })
        .collect();

    let result = json!({
        "base_year": config.ramp.base_year,
        "discount_rate": config.ramp.discount_rate,
        "terminal_growth": config.ramp.terminal_growth,
        "ramp_years": config.ramp.schedule.len(),
    });
    Ok(envelope(&output, result, Value::Array(rows)))
}

pub fn run_capex(config: &ScenarioConfig) -> CommandResult {
    let output = scenario::run_scenario(config)?;
    let out = &output.result;

    let rows: Vec<Value> = out
        .capex
        .iter()
        .filter_map(|c| {
            out.summary.iter().find(|r| r.ticker == c.ticker).map(|r| {
                json!({
                    "ticker": c.ticker,
                    "service_share": c.service_share,
                    "capex_burden": c.capex_burden,
                    "incremental_net_income": r.incremental_net_income,
                    "ni_to_capex": r.ni_to_capex,
                })
            })
        })
        .collect();

    let result = json!({
        "stack_capex_total": out.headline.stack_capex_total,
        "service_revenue_pool": out.headline.service_revenue_pool,
    });
    Ok(envelope(&output, result, Value::Array(rows)))
}

pub fn run_tesla(config: &ScenarioConfig) -> CommandResult {
    let output = scenario::run_scenario(config)?;
    let tesla = &output.result.tesla;

    let row = |label: &str, case: &TeslaCase| {
        json!({
            "case": label,
            "storage_gwh": case.allocation.storage_gwh,
            "storage_net_income": case.allocation.storage_net_income,
            "fsd_net_income": case.allocation.fsd_net_income,
            "robotics_net_income": case.allocation.robotics_net_income,
            "incremental_net_income": case.incremental_net_income,
            "applied_multiple": case.applied_multiple,
            "valuation": case.valuation,
        })
    };

    let result = json!({
        "ticker": config.tesla.ticker,
        "base_valuation": tesla.base.valuation,
        "downside_valuation": tesla.downside.valuation,
    });
    let rows = json!([row("base", &tesla.base), row("downside", &tesla.downside)]);
    Ok(envelope(&output, result, rows))
}

pub fn run_demand(config: &ScenarioConfig) -> CommandResult {
    let start = Instant::now();
    let warnings = config.validate()?;
    let demand = accelerator_demand(&config.demand)?;
    let output = with_metadata(
        "Accelerator demand from weekly compute build rate",
        &config.demand,
        warnings,
        start.elapsed().as_micros() as u64,
        demand,
    );
    Ok(serde_json::to_value(&output)?)
}
