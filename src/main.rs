use std::path::Path;

use anyhow::anyhow;
use clap::Parser;

use tagger::Settings;
use tagger::cli::{Cli, Commands, commands};
use tagger::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Settings::default_path);

    match cli.command.unwrap_or_default() {
        Commands::Init { force } => commands::init::run_init(&config_path, force),
        Commands::Config => commands::init::run_config(&load_settings(&config_path, cli.debug)?),
        Commands::Run { bind, no_server } => {
            let settings = load_settings(&config_path, cli.debug)?;
            logging::init_with_config(&settings.logging);
            commands::run::run(settings, bind, no_server).await
        }
    }
}

fn load_settings(path: &Path, debug: bool) -> anyhow::Result<Settings> {
    let mut settings = Settings::load_from(path)
        .map_err(|e| anyhow!("Configuration error in {}: {e}", path.display()))?;
    if debug {
        settings.logging.default = "debug".to_string();
    }
    Ok(settings)
}
