use buildout_core::config::ScenarioConfig;
use napi::Result as NapiResult;
use napi_derive::napi;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse an optional JSON override; omitted fields keep their defaults.
fn parse_config(config_json: Option<String>) -> NapiResult<ScenarioConfig> {
    match config_json {
        Some(json) if !json.trim().is_empty() => serde_json::from_str(&json).map_err(to_napi_error),
        _ => Ok(ScenarioConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

#[napi]
pub fn run_scenario(config_json: Option<String>) -> NapiResult<String> {
    let config = parse_config(config_json)?;
    let output = buildout_core::scenario::run_scenario(&config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn default_config() -> NapiResult<String> {
    serde_json::to_string(&ScenarioConfig::default()).map_err(to_napi_error)
}

#[napi]
pub fn validate_config(config_json: String) -> NapiResult<String> {
    let config = parse_config(Some(config_json))?;
    let warnings = config.validate().map_err(to_napi_error)?;
    serde_json::to_string(&warnings).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Projection and sensitivity
// ---------------------------------------------------------------------------

#[napi]
pub fn project_cashflows(input_json: String) -> NapiResult<String> {
    let input: buildout_core::dcf::DcfInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = buildout_core::dcf::calculate_dcf(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn sensitivity_grids(config_json: Option<String>) -> NapiResult<String> {
    let config = parse_config(config_json)?;
    config.validate().map_err(to_napi_error)?;
    let output =
        buildout_core::sensitivity::build_sensitivity_grids(&config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
