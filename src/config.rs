use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use eyre::Context;
use serde::Deserialize;

use crate::{
    level::LogLevel,
    logging::{FileSink, FormatterRegistry, LogSink, Logger, StderrSink, DEFAULT_BACKLOG_DEPTH},
};

pub trait ConfigManager: Sized + Clone + Send + Sync {
    fn get_config_path(&self) -> eyre::Result<PathBuf>;
}

#[derive(Default, Clone, Debug)]
pub struct LocalConfigManager {}

impl LocalConfigManager {
    pub fn new() -> Self {
        Self {}
    }
}

#[cfg(not(target_os = "windows"))]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(target_os = "windows")]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE").map(PathBuf::from)
}

pub fn config_dir() -> Option<PathBuf> {
    let config_dir = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| home_dir().map(|home| home.join(".config")))?;

    Some(config_dir.join("backlog"))
}

impl ConfigManager for LocalConfigManager {
    fn get_config_path(&self) -> eyre::Result<PathBuf> {
        config_dir()
            .map(|dir| dir.join("config.toml"))
            .ok_or_else(|| eyre::eyre!("Can't construct config path, neither XDG_CONFIG_HOME nor HOME is set"))
    }
}

fn default_level() -> String {
    LogLevel::Error.to_string()
}

fn default_trigger_level() -> String {
    LogLevel::Fatal.to_string()
}

fn default_backlog() -> i64 {
    DEFAULT_BACKLOG_DEPTH as i64
}

fn default_compact_duplicates() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_trigger_level")]
    pub trigger_level: String,
    #[serde(default = "default_backlog")]
    pub backlog: i64,
    #[serde(default = "default_compact_duplicates")]
    pub compact_duplicates: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            level: default_level(),
            trigger_level: default_trigger_level(),
            backlog: default_backlog(),
            compact_duplicates: default_compact_duplicates(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputEntry {
    pub id: String,
    /// Written to stderr when absent.
    pub filename: Option<PathBuf>,
    pub timestamp_format: Option<String>,
    pub max_file_size: Option<u64>,
    /// ANSI styling for formatters that support it, off by default.
    pub color: Option<bool>,
}

/// Logging configuration read from TOML.
///
/// Each `[[outputs]]` table takes the place of an item in the old YAML
/// `formatters:` list and uses the same `id` and `filename` keys.
///
/// ```toml
/// [settings]
/// level = "warning"
/// trigger_level = "error"
/// backlog = 500
///
/// [[outputs]]
/// id = "json"
/// filename = "/var/log/app.json"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub outputs: Vec<OutputEntry>,
}

// Unknown names fall back to `error` instead of failing the whole load.
fn level_from_setting(name: &str, setting: &str) -> LogLevel {
    name.parse().unwrap_or_else(|err| {
        tracing::warn!(target: "backlog", "{} for {}, falling back to error", err, setting);
        LogLevel::Error
    })
}

impl FromStr for Configuration {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s).wrap_err("Failed parsing logging configuration")
    }
}

impl Configuration {
    pub fn from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed reading configuration file {}", path.display()))?;

        contents.parse()
    }

    pub fn level(&self) -> LogLevel {
        level_from_setting(&self.settings.level, "level")
    }

    pub fn trigger_level(&self) -> LogLevel {
        level_from_setting(&self.settings.trigger_level, "trigger_level")
    }

    /// Creates a logger from these settings.
    ///
    /// Outputs naming an unknown formatter or a file that can't be opened are
    /// skipped; broken level or backlog settings fail the load.
    pub fn load(&self, registry: &FormatterRegistry) -> eyre::Result<Logger> {
        let logger = Logger::new();

        logger
            .set_level(self.level())
            .wrap_err("Invalid level setting")?;
        logger
            .set_trigger_level(self.trigger_level())
            .wrap_err("Invalid trigger_level setting")?;
        logger
            .set_backlog_depth(self.settings.backlog)
            .wrap_err("Invalid backlog setting")?;
        logger.set_compact_duplicates(self.settings.compact_duplicates);

        for output in &self.outputs {
            let mut formatter = match registry.create(&output.id) {
                Ok(formatter) => formatter,
                Err(err) => {
                    tracing::warn!(target: "backlog", "skipping output: {}", err);
                    continue;
                }
            };

            if let Some(pattern) = &output.timestamp_format {
                formatter.set_timestamp_format(pattern);
            }
            if let Some(color) = output.color {
                formatter.set_color(color);
            }

            let sink: Arc<dyn LogSink> = match &output.filename {
                Some(filename) => match FileSink::new(filename) {
                    Ok(sink) => match output.max_file_size {
                        Some(max_file_size) => Arc::new(sink.with_max_file_size(max_file_size)),
                        None => Arc::new(sink),
                    },
                    Err(err) => {
                        tracing::warn!(target: "backlog", "skipping output: {:#}", err);
                        continue;
                    }
                },
                None => Arc::new(StderrSink::new()),
            };

            let index = logger.add_output_target_and_formatter(sink, formatter);
            tracing::debug!(target: "backlog", "added output {} using formatter {}", index, output.id);
        }

        Ok(logger)
    }
}
