mod backlog;
mod formatters;
mod logger;
mod registry;
mod sinks;

use crate::entry::Entry;

pub use backlog::Backlog;
pub use formatters::{JsonFormatter, TextFormatter, YamlFormatter};
pub use logger::{Builder, Logger, DEFAULT_BACKLOG_DEPTH};
pub use registry::{FormatterFactory, FormatterRegistry};
pub use sinks::{FileSink, MemorySink, NullSink, StderrSink, StdoutSink, WriterSink};

/// Renders an entry into the bytes written to a sink.
///
/// `format` must never fail: problems are rendered into the output instead.
pub trait LogFormatter: Sync + Send {
    fn id(&self) -> &str;
    fn set_timestamp_format(&mut self, pattern: &str);
    /// Formatters without styling ignore this.
    fn set_color(&mut self, _enabled: bool) {}
    fn format(&self, entry: &Entry) -> Vec<u8>;
    fn box_clone(&self) -> Box<dyn LogFormatter>;
}

impl Clone for Box<dyn LogFormatter> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

pub trait LogSink: Sync + Send {
    fn write_bytes(&self, bytes: &[u8]) -> eyre::Result<()>;
    fn flush(&self);
}
