use buildout_core::config::ScenarioConfig;
use std::io::{self, Read};

/// Parse a config piped on stdin. Interactive or empty stdin yields `None` so
/// the defaults apply.
pub fn read_piped_config() -> Result<Option<ScenarioConfig>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;

    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let config = serde_json::from_str(trimmed)
        .map_err(|e| format!("Failed to parse config from stdin: {}", e))?;
    Ok(Some(config))
}
