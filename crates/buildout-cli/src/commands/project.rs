use clap::Args;
use rust_decimal::Decimal;
use serde_json::json;

use buildout_core::config::ScenarioConfig;
use buildout_core::dcf::{calculate_dcf, DcfInput};

use super::{envelope, CommandResult};

/// Arguments for a standalone ramp projection
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ProjectArgs {
    /// Steady-state incremental net income in billions (e.g. 154.128)
    #[arg(long)]
    pub incremental_net_income: Decimal,
}

pub fn run_project(config: &ScenarioConfig, args: ProjectArgs) -> CommandResult {
    let input = DcfInput {
        incremental_net_income: args.incremental_net_income,
        ramp: config.ramp.clone(),
    };
    let output = calculate_dcf(&input)?;
    let p = &output.result;

    let result = json!({
        "incremental_net_income": input.incremental_net_income,
        "pv_of_cashflows": p.pv_of_cashflows,
        "terminal_value": p.terminal_value,
        "pv_of_terminal": p.pv_of_terminal,
        "pv_total": p.pv_total,
        "terminal_value_pct": p.terminal_value_pct,
    });
    Ok(envelope(&output, result, serde_json::to_value(&p.cashflows)?))
}

pub fn run_config(config: &ScenarioConfig) -> CommandResult {
    let warnings = config.validate()?;
    Ok(json!({
        "result": config,
        "warnings": warnings,
    }))
}
