use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::json;

use buildout_core::config::ScenarioConfig;
use buildout_core::sensitivity::{build_sensitivity_grids, sweep_values, SensitivityGrid};
use buildout_core::SensitivityVariable;

use super::CommandResult;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GridAxis {
    /// Vendor share × ASP multiplier
    Asp,
    /// Vendor share × net margin multiplier
    Margin,
    /// Stack multiplier × service conversion (service revenue pool)
    Stack,
}

/// Arguments for sensitivity analysis
#[derive(Args)]
pub struct SensitivityArgs {
    /// Grid to print
    #[arg(long, value_enum, default_value = "asp")]
    pub axis: GridAxis,

    /// Print valuations (trillions) at the rerated multiple instead of
    /// incremental net income
    #[arg(long)]
    pub revalue: bool,

    /// Vendor share axis in format min:max:step (e.g. "0.50:0.80:0.05")
    #[arg(long)]
    pub shares: Option<String>,

    /// Column axis in format min:max:step; ASP or margin multipliers, or
    /// service conversions for the stack grid
    #[arg(long)]
    pub multipliers: Option<String>,
}

fn parse_axis(name: &str, spec: &str) -> Result<Vec<Decimal>, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("--{} must be min:max:step, got '{}'", name, spec).into());
    }
    let var = SensitivityVariable {
        name: name.to_string(),
        min: parts[0].trim().parse()?,
        max: parts[1].trim().parse()?,
        step: parts[2].trim().parse()?,
    };
    Ok(sweep_values(&var)?)
}

pub fn run_sensitivity(mut config: ScenarioConfig, args: SensitivityArgs) -> CommandResult {
    if let GridAxis::Stack = args.axis {
        if args.shares.is_some() || args.revalue {
            return Err("--shares and --revalue apply to the asp and margin grids only".into());
        }
    }

    if let Some(ref spec) = args.shares {
        config.sensitivity.share_values = parse_axis("shares", spec)?;
    }
    if let Some(ref spec) = args.multipliers {
        let values = parse_axis("multipliers", spec)?;
        match args.axis {
            GridAxis::Asp => config.sensitivity.asp_multipliers = values,
            GridAxis::Margin => config.sensitivity.margin_multipliers = values,
            GridAxis::Stack => config.sensitivity.service_conversions = values,
        }
    }

    let mut warnings = config.validate()?;
    let output = build_sensitivity_grids(&config)?;
    warnings.extend(output.warnings.iter().cloned());
    let grids = &output.result;

    let grid: &SensitivityGrid = match (args.axis, args.revalue) {
        (GridAxis::Asp, false) => &grids.asp,
        (GridAxis::Asp, true) => &grids.asp_valuation,
        (GridAxis::Margin, false) => &grids.margin,
        (GridAxis::Margin, true) => &grids.margin_valuation,
        (GridAxis::Stack, _) => grids
            .service_pool
            .as_ref()
            .ok_or("The stack grid needs stack multipliers and service conversions")?,
    };

    let result = json!({
        "vendor": grids.vendor,
        "metric": grid.metric,
        "rows": grid.row_variable,
        "columns": grid.column_variable,
        "base_case": grid.base_case_value(),
        "rerated_multiple": grids.rerated_multiple,
    });

    Ok(json!({
        "result": result,
        "grid": grid,
        "methodology": output.methodology,
        "warnings": warnings,
        "metadata": output.metadata,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_axis() {
        let values = parse_axis("shares", "0.5:0.7:0.1").unwrap();
        assert_eq!(
            values,
            vec![
                Decimal::new(5, 1),
                Decimal::new(6, 1),
                Decimal::new(7, 1)
            ]
        );
    }

    #[test]
    fn test_parse_axis_rejects_malformed_spec() {
        assert!(parse_axis("shares", "0.5:0.7").is_err());
        assert!(parse_axis("shares", "0.7:0.5:0.1").is_err());
        assert!(parse_axis("shares", "a:b:c").is_err());
    }

    #[test]
    fn test_stack_grid_rejects_share_override() {
        let args = SensitivityArgs {
            axis: GridAxis::Stack,
            revalue: false,
            shares: Some("0.5:0.7:0.1".into()),
            multipliers: None,
        };
        assert!(run_sensitivity(ScenarioConfig::default(), args).is_err());
    }

    #[test]
    fn test_revalued_asp_grid_base_case() {
        let args = SensitivityArgs {
            axis: GridAxis::Asp,
            revalue: true,
            shares: None,
            multipliers: None,
        };
        let value = run_sensitivity(ScenarioConfig::default(), args).unwrap();
        assert_eq!(value["result"]["metric"], "valuation");
        let base: Decimal = value["result"]["base_case"].as_str().unwrap().parse().unwrap();
        assert_eq!(base, Decimal::new(6_340_096, 6));
    }
}
