use crate::level::LogLevel;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid level {level}: level must not exceed trigger level ({level} > {trigger})")]
    InvalidLevel { level: LogLevel, trigger: LogLevel },

    #[error("bad backlog depth selected: {0}")]
    InvalidDepth(i64),

    #[error("bad output formatter index {index}, {count} output(s) registered")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("failed to write to output {index}: {cause:#}")]
    SinkWriteFailure { index: usize, cause: eyre::Report },

    #[error("unable to convert level: {0}")]
    UnsupportedLevel(String),

    #[error("formatter {0} already exists")]
    DuplicateId(String),

    #[error("unable to create formatter: {0}")]
    UnknownId(String),
}

pub type Result<T> = std::result::Result<T, Error>;
