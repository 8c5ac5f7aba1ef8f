//! Init and Config commands.

use std::path::Path;

use anyhow::anyhow;

use crate::config::Settings;

/// Run init command - create configuration file.
pub fn run_init(config_path: &Path, force: bool) -> anyhow::Result<()> {
    let existed = config_path.exists();

    let path = Settings::init_config_file(config_path, force).map_err(|e| anyhow!("{e}"))?;

    if existed {
        println!("Overwrote configuration at: {}", path.display());
    } else {
        println!("Created configuration file at: {}", path.display());
    }
    println!("Add your projects under [[projects]] and run `tagger`.");
    Ok(())
}

/// Run config command - display current configuration.
pub fn run_config(config: &Settings) -> anyhow::Result<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
