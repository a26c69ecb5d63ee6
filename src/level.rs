use std::{fmt, str::FromStr};

use crate::error::Error;

/// Severity of a log entry, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Information = 2,
    Warning = 3,
    Error = 4,
    Fatal = 5,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Information,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    /// Lower case name, or upper case when `capitalize` is set.
    pub fn name(self, capitalize: bool) -> &'static str {
        match (self, capitalize) {
            (LogLevel::Trace, false) => "trace",
            (LogLevel::Debug, false) => "debug",
            (LogLevel::Information, false) => "information",
            (LogLevel::Warning, false) => "warning",
            (LogLevel::Error, false) => "error",
            (LogLevel::Fatal, false) => "fatal",
            (LogLevel::Trace, true) => "TRACE",
            (LogLevel::Debug, true) => "DEBUG",
            (LogLevel::Information, true) => "INFORMATION",
            (LogLevel::Warning, true) => "WARNING",
            (LogLevel::Error, true) => "ERROR",
            (LogLevel::Fatal, true) => "FATAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name(false))
    }
}

impl TryFrom<u8> for LogLevel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        LogLevel::ALL
            .get(usize::from(value))
            .copied()
            .ok_or_else(|| Error::UnsupportedLevel(value.to_string()))
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "information" | "info" => Ok(LogLevel::Information),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "fatal" => Ok(LogLevel::Fatal),
            _ => Err(Error::UnsupportedLevel(s.to_string())),
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warning,
            log::Level::Info => LogLevel::Information,
            log::Level::Debug => LogLevel::Debug,
            log::Level::Trace => LogLevel::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Information);
        assert!(LogLevel::Information < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Fatal);
    }

    #[test]
    fn test_name() {
        assert_eq!(LogLevel::Trace.name(true), "TRACE");
        assert_eq!(LogLevel::Error.name(false), "error");
        assert_eq!(LogLevel::Information.to_string(), "information");
    }

    #[test]
    fn test_try_from_u8() {
        assert_eq!(LogLevel::try_from(3).unwrap(), LogLevel::Warning);
        assert!(matches!(
            LogLevel::try_from(42),
            Err(Error::UnsupportedLevel(_))
        ));
    }

    #[test]
    fn test_parse() {
        assert_eq!("Information".parse::<LogLevel>().unwrap(), LogLevel::Information);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!(" fatal ".parse::<LogLevel>().unwrap(), LogLevel::Fatal);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_from_log_level() {
        assert_eq!(LogLevel::from(log::Level::Warn), LogLevel::Warning);
        assert_eq!(LogLevel::from(log::Level::Info), LogLevel::Information);
    }
}
