pub mod file;
pub mod stdin;

use buildout_core::config::ScenarioConfig;
use tracing::debug;

/// Resolve the effective config: a file given with `--config`, else JSON
/// piped on stdin, else the built-in defaults.
pub fn load_config(path: Option<&str>) -> Result<ScenarioConfig, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        debug!(path, "loading config file");
        return file::read_config(path);
    }
    if let Some(config) = stdin::read_piped_config()? {
        debug!("loaded config from stdin");
        return Ok(config);
    }
    Ok(ScenarioConfig::default())
}
