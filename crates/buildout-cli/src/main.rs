mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::CommandResult;
use commands::project::ProjectArgs;
use commands::scenario::{CashflowsArgs, ScenarioArgs};
use commands::sensitivity::SensitivityArgs;

/// Multi-sector valuation scenario for an AI accelerator build-out
#[derive(Parser)]
#[command(
    name = "buildout",
    version,
    about = "Multi-sector valuation scenario for an AI accelerator build-out",
    long_about = "Allocates the revenue of a sustained AI accelerator build-out across GPU, \
                  lithography, memory, energy, platform and Tesla sectors, re-values each \
                  company at its rerated multiple and discounts the ramp. All figures use \
                  decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Path to a JSON or YAML config file; omitted fields keep their defaults.
    /// JSON piped on stdin is used when no file is given.
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log engine detail to stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full scenario and print the valuation summary
    Scenario(ScenarioArgs),
    /// Discounted ramp cashflows per company
    Cashflows(CashflowsArgs),
    /// Stack capex burden and income coverage per company
    Capex,
    /// Tesla base and downside valuations
    Tesla,
    /// Accelerator demand implied by the build rate
    Demand,
    /// Vendor share sensitivity grids
    Sensitivity(SensitivityArgs),
    /// Ramp and discount an arbitrary incremental net income figure
    Project(ProjectArgs),
    /// Print the effective configuration and its validation warnings
    Config,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let directives = format!("buildout={level},buildout_core={level}");
    let filter = if verbose > 0 {
        EnvFilter::new(directives)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn dispatch(command: Commands, config_path: Option<&str>) -> CommandResult {
    let config = || input::load_config(config_path);
    match command {
        Commands::Scenario(args) => commands::scenario::run_scenario(&config()?, args),
        Commands::Cashflows(args) => commands::scenario::run_cashflows(&config()?, args),
        Commands::Capex => commands::scenario::run_capex(&config()?),
        Commands::Tesla => commands::scenario::run_tesla(&config()?),
        Commands::Demand => commands::scenario::run_demand(&config()?),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(config()?, args),
        Commands::Project(args) => commands::project::run_project(&config()?, args),
        Commands::Config => commands::project::run_config(&config()?),
        Commands::Version => Ok(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") })),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match dispatch(cli.command, cli.config.as_deref()) {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_skips_config_loading() {
        let value = dispatch(Commands::Version, Some("does-not-exist.yaml")).unwrap();
        assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        assert!(dispatch(Commands::Capex, Some("does-not-exist.yaml")).is_err());
    }
}
