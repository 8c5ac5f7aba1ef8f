//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Keep tag files fresh while you edit
#[derive(Parser, Debug)]
#[command(
    name = "tagger",
    version = env!("CARGO_PKG_VERSION"),
    about = "Keep tag files fresh while you edit",
    long_about = "Watches project trees and regenerates their tag files shortly after they change.",
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to the configuration file [default: ~/.tagger.toml]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Watch the configured projects (default)
    Run {
        /// Listen address for the management server (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Do not start the management server
        #[arg(long)]
        no_server: bool,
    },

    /// Write a default configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Display active settings
    Config,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Run {
            bind: None,
            no_server: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_is_default() {
        let cli = Cli::try_parse_from(["tagger"]).unwrap();
        assert_eq!(cli.command.unwrap_or_default(), Commands::default());
        assert!(!cli.debug);
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["tagger", "run", "-d", "--config", "/tmp/t.toml"]).unwrap();
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/t.toml")));
    }

    #[test]
    fn test_run_overrides() {
        let cli =
            Cli::try_parse_from(["tagger", "run", "--bind", "0.0.0.0:9000", "--no-server"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Run {
                bind: Some("0.0.0.0:9000".to_string()),
                no_server: true,
            })
        );
    }

    #[test]
    fn test_init_force() {
        let cli = Cli::try_parse_from(["tagger", "init", "--force"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Init { force: true }));
    }
}
