//! Configuration for the tag daemon.
//!
//! Layered sources, later ones winning:
//! - Built-in defaults
//! - TOML configuration file (`~/.tagger.toml` unless `--config` is given)
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `TAGGER_` and use double
//! underscores to separate nested levels:
//! - `TAGGER_INDEXER__PROGRAM=uctags` sets `indexer.program`
//! - `TAGGER_SERVER__BIND=0.0.0.0:9000` sets `server.bind`
//! - `TAGGER_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = ".tagger.toml";

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Settings {
    /// How tag files are produced
    #[serde(default)]
    pub indexer: IndexerConfig,

    /// Projects registered at startup
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,

    /// Management HTTP server
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Indexer variant.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexerKind {
    /// Single tag file for the project tree.
    #[default]
    Generic,
    /// Project tags plus the tags of the project's rvm gemset.
    Rvm,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct IndexerConfig {
    #[serde(rename = "type", default)]
    pub kind: IndexerKind,

    /// Tag generator executable
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments passed before exclusions and output options
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Output file name, relative to the project root. Also the prefix of
    /// every file ignored by the watcher.
    #[serde(default = "default_tag_file")]
    pub tag_file: String,

    /// Directory names never watched nor indexed
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Debounce window in milliseconds
    #[serde(default = "default_max_period_ms")]
    pub max_period_ms: u64,

    /// File whose change forces the dependency tier to be rebuilt
    #[serde(default = "default_special_file")]
    pub special_file: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ProjectEntry {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_program() -> String {
    "ctags".to_string()
}
fn default_args() -> Vec<String> {
    vec!["-R".to_string(), "-e".to_string()]
}
fn default_tag_file() -> String {
    "TAGS".to_string()
}
fn default_exclude() -> Vec<String> {
    vec![".git".to_string()]
}
fn default_max_period_ms() -> u64 {
    2000
}
fn default_special_file() -> String {
    "Gemfile.lock".to_string()
}
fn default_true() -> bool {
    true
}
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            kind: IndexerKind::default(),
            program: default_program(),
            args: default_args(),
            tag_file: default_tag_file(),
            exclude: default_exclude(),
            max_period_ms: default_max_period_ms(),
            special_file: default_special_file(),
        }
    }
}

impl IndexerConfig {
    pub fn max_period(&self) -> Duration {
        Duration::from_millis(self.max_period_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            bind: default_bind(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Location of the per-user configuration file.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    }

    /// Load configuration from a specific file. A missing file leaves the
    /// defaults in place.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nesting; single ones stay in names
            .merge(Env::prefixed("TAGGER_").split("__"))
            .extract()
            .map_err(Box::new)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Write a default settings file at `path`.
    pub fn init_config_file(
        path: impl AsRef<Path>,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = path.as_ref().to_path_buf();

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;

        Ok(config_path)
    }
}
