use anyhow::Result;
use std::path::Path;

use ads_config::SchedulerConfig;
use ads_core::OutputFormat;

pub(crate) fn handle_config_show(config: &SchedulerConfig, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json_str = serde_json::to_string_pretty(config)?;
            println!("{}", json_str);
        }
        OutputFormat::Text => {
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}

pub(crate) fn handle_config_path(explicit: Option<&Path>) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => SchedulerConfig::config_path()?,
    };
    let state = if path.exists() { "" } else { " (not found, using defaults)" };
    println!("{}{}", path.display(), state);
    Ok(())
}
