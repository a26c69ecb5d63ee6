//! Leveled logging with a rolling in-memory backlog.
//!
//! A [`Logger`] writes entries at or above its level to every registered
//! output, and keeps the most recent entries of every level in a backlog.
//! When an entry reaches the trigger level the whole backlog is written out,
//! so the lead up to a failure is available without emitting low level noise
//! all the time.
//!
//! ```
//! use std::sync::Arc;
//! use backlog::{Logger, MemorySink};
//!
//! let logger = Logger::new();
//! let sink = MemorySink::new();
//! logger.add_output_target(Arc::new(sink.clone()));
//!
//! logger.debug("opening connection");
//! assert!(sink.contents().is_empty());
//!
//! logger.fatal("connection lost");
//! assert_eq!(
//!     sink.contents_string(),
//!     "[DEBUG] opening connection\n[FATAL] connection lost\n"
//! );
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod level;
pub mod logging;
pub mod tag;

pub use config::Configuration;
pub use entry::Entry;
pub use error::{Error, Result};
pub use level::LogLevel;
pub use logging::{
    Backlog, Builder, FileSink, FormatterRegistry, JsonFormatter, LogFormatter, LogSink, Logger,
    MemorySink, NullSink, StderrSink, StdoutSink, TextFormatter, WriterSink, YamlFormatter,
};
pub use tag::Tag;
