use std::{
    io::BufRead,
    path::{Path, PathBuf},
    sync::Arc,
};

use backlog::{
    config::{ConfigManager, LocalConfigManager},
    Configuration, FileSink, FormatterRegistry, LogLevel, LogSink, Logger, StdoutSink,
};
use clap::Args;
use eyre::Context;

#[derive(Args, Debug)]
#[command(about = "Read log lines from stdin and write them out through the backlog.")]
pub struct Cmd {
    #[arg(
        short,
        long,
        help = "Configuration file. Defaults to $XDG_CONFIG_HOME/backlog/config.toml when it exists."
    )]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Lowest level written out as it happens.")]
    pub level: Option<LogLevel>,

    #[arg(short, long, help = "Level that writes out the whole backlog.")]
    pub trigger_level: Option<LogLevel>,

    #[arg(
        short,
        long,
        allow_negative_numbers = true,
        help = "Number of entries kept in the backlog."
    )]
    pub backlog: Option<i64>,

    #[arg(long, help = "Keep repeated lines instead of counting them.")]
    pub no_compact: bool,

    #[arg(
        long,
        default_value_t = LogLevel::Information,
        help = "Level of lines that don't start with a level name."
    )]
    pub default_level: LogLevel,

    #[arg(short, long, default_value = "text", help = "Formatter id, see `backlog formatters`.")]
    pub format: String,

    #[arg(long, help = "strftime pattern for timestamps, e.g. \"%F %T\".")]
    pub timestamp_format: Option<String>,

    #[arg(long, help = "Color the level and timestamp of text output.")]
    pub color: bool,

    #[arg(short, long, help = "Append to this file instead of writing to stdout.")]
    pub output: Option<PathBuf>,
}

/// Splits `"ERROR: disk full"` or `"warn retrying"` into level and message.
/// Lines without a leading level name keep `default` and the whole line.
fn split_level(line: &str, default: LogLevel) -> (LogLevel, &str) {
    let trimmed = line.trim_start();
    let end = trimmed
        .find(|c: char| c == ':' || c.is_whitespace())
        .unwrap_or(trimmed.len());
    let (head, rest) = trimmed.split_at(end);

    match head.parse::<LogLevel>() {
        Ok(level) if !head.is_empty() => {
            let message = rest.strip_prefix(':').unwrap_or(rest).trim_start();
            (level, message)
        }
        _ => (default, line),
    }
}

impl Cmd {
    fn load_configuration(&self) -> eyre::Result<Option<Configuration>> {
        if let Some(path) = &self.config {
            return Configuration::from_file(path).map(Some);
        }

        let Ok(path) = LocalConfigManager::new().get_config_path() else {
            return Ok(None);
        };

        if !path.exists() {
            return Ok(None);
        }

        tracing::debug!(target: "backlog", "using configuration {}", path.display());
        Configuration::from_file(&path).map(Some)
    }

    fn apply_levels(&self, logger: &Logger) -> eyre::Result<()> {
        match (self.level, self.trigger_level) {
            (Some(level), Some(trigger_level)) => {
                if level > trigger_level {
                    eyre::bail!("--level {} is above --trigger-level {}", level, trigger_level);
                }

                // order the updates so the pair never crosses on the way
                if trigger_level >= logger.level() {
                    logger.set_trigger_level(trigger_level)?;
                    logger.set_level(level)?;
                } else {
                    logger.set_level(level)?;
                    logger.set_trigger_level(trigger_level)?;
                }
            }
            (Some(level), None) => logger.set_level(level)?,
            (None, Some(trigger_level)) => logger.set_trigger_level(trigger_level)?,
            (None, None) => {}
        }
        Ok(())
    }

    fn output_sink(&self, path: Option<&Path>) -> eyre::Result<Arc<dyn LogSink>> {
        match path {
            Some(path) => Ok(Arc::new(FileSink::new(path)?)),
            None => Ok(Arc::new(StdoutSink::new())),
        }
    }

    fn build_logger(&self) -> eyre::Result<Logger> {
        let registry = FormatterRegistry::with_builtins();

        let logger = match self.load_configuration()? {
            Some(configuration) => configuration.load(&registry)?,
            None => Logger::new(),
        };

        self.apply_levels(&logger)?;

        if let Some(depth) = self.backlog {
            logger.set_backlog_depth(depth)?;
        }
        if self.no_compact {
            logger.set_compact_duplicates(false);
        }

        if self.output.is_some() || logger.output_count() == 0 {
            let mut formatter = registry.create(&self.format)?;
            if let Some(pattern) = &self.timestamp_format {
                formatter.set_timestamp_format(pattern);
            }
            formatter.set_color(self.color);

            let sink = self.output_sink(self.output.as_deref())?;
            logger.add_output_target_and_formatter(sink, formatter);
        }

        Ok(logger)
    }

    pub fn run(&self) -> eyre::Result<()> {
        let logger = self.build_logger()?;

        tracing::info!(
            target: "backlog",
            "relaying stdin, level={} trigger_level={} backlog={}",
            logger.level(),
            logger.trigger_level(),
            logger.backlog_depth()
        );

        let stdin = std::io::stdin();
        let mut count: usize = 0;

        for line in stdin.lock().lines() {
            let line = line.context("Failed reading from stdin")?;
            let (level, message) = split_level(&line, self.default_level);

            logger.log(level, message);
            count += 1;
        }

        logger.flush();
        tracing::info!(target: "backlog", "relayed {} line(s)", count);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_level() {
        assert_eq!(
            split_level("ERROR: disk full", LogLevel::Information),
            (LogLevel::Error, "disk full")
        );
        assert_eq!(
            split_level("warn retrying in 5s", LogLevel::Information),
            (LogLevel::Warning, "retrying in 5s")
        );
        assert_eq!(
            split_level("  Debug:x", LogLevel::Information),
            (LogLevel::Debug, "x")
        );
        assert_eq!(
            split_level("fatal", LogLevel::Information),
            (LogLevel::Fatal, "")
        );
    }

    #[test]
    fn test_split_level_without_level() {
        assert_eq!(
            split_level("request served in 3ms", LogLevel::Debug),
            (LogLevel::Debug, "request served in 3ms")
        );
        assert_eq!(
            split_level(": nothing", LogLevel::Trace),
            (LogLevel::Trace, ": nothing")
        );
        assert_eq!(split_level("", LogLevel::Trace), (LogLevel::Trace, ""));
    }

    fn cmd(dir: &Path, color: bool) -> Cmd {
        let config = dir.join("config.toml");
        std::fs::write(&config, "").unwrap();

        Cmd {
            config: Some(config),
            level: None,
            trigger_level: None,
            backlog: None,
            no_compact: false,
            default_level: LogLevel::Information,
            format: "text".to_string(),
            timestamp_format: None,
            color,
            output: Some(dir.join("relay.log")),
        }
    }

    #[test]
    fn test_color_flag() {
        let dir = tempfile::tempdir().unwrap();

        let logger = cmd(dir.path(), false).build_logger().unwrap();
        logger.error("plain");
        logger.flush();
        let plain = std::fs::read_to_string(dir.path().join("relay.log")).unwrap();
        assert_eq!(plain, "[ERROR] plain\n");

        let logger = cmd(dir.path(), true).build_logger().unwrap();
        logger.error("colored");
        logger.flush();
        let output = std::fs::read_to_string(dir.path().join("relay.log")).unwrap();
        let colored = output.strip_prefix(&plain).unwrap();
        assert!(colored.contains("\x1b["));
        assert!(colored.contains("colored"));
    }
}
