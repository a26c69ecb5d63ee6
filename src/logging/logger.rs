use std::{
    cell::Cell,
    fmt,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use eyre::Context;
use log::LevelFilter;
use serde_json::Value;

use crate::{
    entry::Entry,
    error::{Error, Result},
    level::LogLevel,
    tag::Tag,
};

use super::{
    backlog::Backlog,
    formatters::TextFormatter,
    sinks::{FileSink, StderrSink, StdoutSink},
    LogFormatter, LogSink,
};

pub const DEFAULT_BACKLOG_DEPTH: usize = 500;

#[derive(Clone)]
struct Output {
    sink: Arc<dyn LogSink>,
    formatter: Box<dyn LogFormatter>,
}

struct State {
    level: LogLevel,
    trigger_level: LogLevel,
    backlog: Backlog,
    outputs: Vec<Output>,
    tags: Vec<Tag>,
    // shared by every entry created until the next add_tag
    tag_snapshot: Arc<[Tag]>,
}

thread_local! {
    static REPORTING_FAILURES: Cell<bool> = const { Cell::new(false) };
}

// Must run without the state lock held: a tracing subscriber (or tracing's
// `log` fallback) may route the warning straight back into this logger.
fn report_sink_failures(failures: Vec<Error>) {
    if failures.is_empty() {
        return;
    }

    REPORTING_FAILURES.with(|reporting| reporting.set(true));
    for err in failures {
        tracing::warn!(target: "backlog", "{}", err);
    }
    REPORTING_FAILURES.with(|reporting| reporting.set(false));
}

impl State {
    fn fan_out(&self, entry: &Entry, failures: &mut Vec<Error>) {
        for (index, output) in self.outputs.iter().enumerate() {
            let bytes = output.formatter.format(entry);
            if let Err(cause) = output.sink.write_bytes(&bytes) {
                failures.push(Error::SinkWriteFailure { index, cause });
            }
        }
    }

    fn drain(&mut self, failures: &mut Vec<Error>) {
        for entry in self.backlog.drain() {
            self.fan_out(&entry, failures);
        }
    }

    fn output_index(&self, index: usize) -> Result<usize> {
        if index < self.outputs.len() {
            Ok(index)
        } else {
            Err(Error::IndexOutOfRange {
                index,
                count: self.outputs.len(),
            })
        }
    }
}

/// Leveled logger that keeps a backlog of recent entries in memory.
///
/// Entries at or above `level` are written to every output as they happen.
/// Every entry, whatever its level, is also kept in the backlog; an entry at
/// or above `trigger_level` writes out the whole backlog, oldest first, and
/// empties it. `level <= trigger_level` always holds.
///
/// All operations take the same lock, including the sink writes, so a slow
/// sink holds up every other caller of the same logger.
pub struct Logger {
    state: Mutex<State>,
}

impl Logger {
    /// Level `Error`, trigger `Fatal`, a 500 entry backlog with duplicate
    /// compaction, no outputs and no tags.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                level: LogLevel::Error,
                trigger_level: LogLevel::Fatal,
                backlog: Backlog::new(DEFAULT_BACKLOG_DEPTH, true),
                outputs: Vec::new(),
                tags: Vec::new(),
                tag_snapshot: Arc::from(Vec::new()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn level(&self) -> LogLevel {
        self.state().level
    }

    pub fn trigger_level(&self) -> LogLevel {
        self.state().trigger_level
    }

    pub fn set_level(&self, level: LogLevel) -> Result<()> {
        let mut state = self.state();

        if level > state.trigger_level {
            return Err(Error::InvalidLevel {
                level,
                trigger: state.trigger_level,
            });
        }
        state.level = level;
        Ok(())
    }

    pub fn set_trigger_level(&self, trigger_level: LogLevel) -> Result<()> {
        let mut state = self.state();

        if trigger_level < state.level {
            return Err(Error::InvalidLevel {
                level: state.level,
                trigger: trigger_level,
            });
        }
        state.trigger_level = trigger_level;
        Ok(())
    }

    pub fn backlog_depth(&self) -> usize {
        self.state().backlog.depth()
    }

    /// Replaces the backlog with an empty one of `depth` entries. Anything
    /// buffered so far is lost.
    pub fn set_backlog_depth(&self, depth: i64) -> Result<()> {
        let depth_slots = usize::try_from(depth).map_err(|_| Error::InvalidDepth(depth))?;

        self.state().backlog.resize(depth_slots);
        Ok(())
    }

    pub fn compact_duplicates(&self) -> bool {
        self.state().backlog.compact_duplicates()
    }

    pub fn set_compact_duplicates(&self, compact: bool) {
        self.state().backlog.set_compact_duplicates(compact);
    }

    /// Adds an output rendered with the plain text formatter and returns its
    /// index.
    pub fn add_output_target(&self, sink: Arc<dyn LogSink>) -> usize {
        self.add_output_target_and_formatter(sink, Box::new(TextFormatter::new()))
    }

    pub fn add_output_target_and_formatter(
        &self,
        sink: Arc<dyn LogSink>,
        formatter: Box<dyn LogFormatter>,
    ) -> usize {
        let mut state = self.state();
        state.outputs.push(Output { sink, formatter });

        state.outputs.len() - 1
    }

    pub fn output_count(&self) -> usize {
        self.state().outputs.len()
    }

    pub fn set_output_formatter(&self, index: usize, formatter: Box<dyn LogFormatter>) -> Result<()> {
        let mut state = self.state();
        let index = state.output_index(index)?;

        state.outputs[index].formatter = formatter;
        Ok(())
    }

    /// Copy of the formatter used by output `index`.
    pub fn output_formatter(&self, index: usize) -> Result<Box<dyn LogFormatter>> {
        let state = self.state();
        let index = state.output_index(index)?;

        Ok(state.outputs[index].formatter.clone())
    }

    /// Runs `f` on the formatter of output `index` while holding the lock.
    pub fn with_output_formatter<R>(
        &self,
        index: usize,
        f: impl FnOnce(&mut dyn LogFormatter) -> R,
    ) -> Result<R> {
        let mut state = self.state();
        let index = state.output_index(index)?;

        Ok(f(state.outputs[index].formatter.as_mut()))
    }

    /// Adds a tag to every entry created from now on.
    pub fn add_tag(&self, name: impl Into<String>, value: impl Into<Value>) {
        let mut state = self.state();
        state.tags.push(Tag::new(name, value));
        state.tag_snapshot = Arc::from(state.tags.clone());
    }

    pub fn tags(&self) -> Vec<Tag> {
        self.state().tags.clone()
    }

    /// Entries currently held in the backlog, oldest first.
    pub fn buffered_entries(&self) -> Vec<Entry> {
        self.state().backlog.entries().cloned().collect()
    }

    /// `(first, next)` cursors of the backlog ring.
    pub fn backlog_cursors(&self) -> (usize, usize) {
        self.state().backlog.cursors()
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let mut state = self.state();

        let entry = Entry::new(
            level,
            Utc::now(),
            message,
            Arc::clone(&state.tag_snapshot),
        );

        state.backlog.push(entry.clone());

        if level < state.level {
            return;
        }

        let mut failures = Vec::new();
        if level >= state.trigger_level {
            // the drain ends with this entry, unless nothing can be buffered
            state.drain(&mut failures);
            if state.backlog.depth() == 0 {
                state.fan_out(&entry, &mut failures);
            }
        } else {
            state.fan_out(&entry, &mut failures);
        }
        drop(state);

        report_sink_failures(failures);
    }

    pub fn logf(&self, level: LogLevel, args: fmt::Arguments<'_>) {
        self.log(level, args.to_string());
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message);
    }

    pub fn tracef(&self, args: fmt::Arguments<'_>) {
        self.logf(LogLevel::Trace, args);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.logf(LogLevel::Debug, args);
    }

    pub fn information(&self, message: impl Into<String>) {
        self.log(LogLevel::Information, message);
    }

    pub fn informationf(&self, args: fmt::Arguments<'_>) {
        self.logf(LogLevel::Information, args);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn warningf(&self, args: fmt::Arguments<'_>) {
        self.logf(LogLevel::Warning, args);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.logf(LogLevel::Error, args);
    }

    pub fn fatal(&self, message: impl Into<String>) {
        self.log(LogLevel::Fatal, message);
    }

    pub fn fatalf(&self, args: fmt::Arguments<'_>) {
        self.logf(LogLevel::Fatal, args);
    }

    pub fn flush(&self) {
        for output in &self.state().outputs {
            output.sink.flush();
        }
    }

    /// Installs this logger as the backend of the `log` crate macros.
    pub fn init(self) -> eyre::Result<()> {
        // everything is buffered, so the facade must pass every level through
        log::set_max_level(LevelFilter::Trace);
        log::set_boxed_logger(Box::new(self)).context("Failed registering boxed logger")?;

        Ok(())
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies the settings, outputs and tags. The clone starts with an empty
/// backlog; sinks are shared with the original.
impl Clone for Logger {
    fn clone(&self) -> Self {
        let state = self.state();

        Self {
            state: Mutex::new(State {
                level: state.level,
                trigger_level: state.trigger_level,
                backlog: Backlog::new(state.backlog.depth(), state.backlog.compact_duplicates()),
                outputs: state.outputs.clone(),
                tags: state.tags.clone(),
                tag_snapshot: Arc::clone(&state.tag_snapshot),
            }),
        }
    }
}

impl log::Log for Logger {
    // records raised while reporting a failed write are dropped, otherwise a
    // sink that keeps failing would feed its own warnings back in forever
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        !REPORTING_FAILURES.with(Cell::get)
    }

    fn log(&self, record: &log::Record) {
        if !log::Log::enabled(self, record.metadata()) {
            return;
        }
        Logger::log(self, record.level().into(), record.args().to_string());
    }

    fn flush(&self) {
        Logger::flush(self)
    }
}

type SinkConstructor = Box<dyn Fn() -> eyre::Result<Arc<dyn LogSink>>>;

pub struct Builder {
    level: LogLevel,
    trigger_level: LogLevel,
    backlog_depth: i64,
    compact_duplicates: bool,
    tags: Vec<Tag>,
    outputs: Vec<(SinkConstructor, Box<dyn LogFormatter>)>,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            level: LogLevel::Error,
            trigger_level: LogLevel::Fatal,
            backlog_depth: DEFAULT_BACKLOG_DEPTH as i64,
            compact_duplicates: true,
            tags: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_level(self, level: LogLevel) -> Self {
        Self { level, ..self }
    }

    pub fn with_trigger_level(self, trigger_level: LogLevel) -> Self {
        Self {
            trigger_level,
            ..self
        }
    }

    pub fn with_backlog_depth(self, backlog_depth: i64) -> Self {
        Self {
            backlog_depth,
            ..self
        }
    }

    pub fn with_compact_duplicates(self, compact_duplicates: bool) -> Self {
        Self {
            compact_duplicates,
            ..self
        }
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.tags.push(Tag::new(name, value));
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn LogSink>, formatter: Box<dyn LogFormatter>) -> Self {
        self.outputs.push((
            Box::new(move || -> eyre::Result<Arc<dyn LogSink>> { Ok(Arc::clone(&sink)) }),
            formatter,
        ));
        self
    }

    pub fn with_stderr_sink(mut self, formatter: Box<dyn LogFormatter>) -> Self {
        self.outputs.push((
            Box::new(|| -> eyre::Result<Arc<dyn LogSink>> { Ok(Arc::new(StderrSink::new())) }),
            formatter,
        ));
        self
    }

    pub fn with_stdout_sink(mut self, formatter: Box<dyn LogFormatter>) -> Self {
        self.outputs.push((
            Box::new(|| -> eyre::Result<Arc<dyn LogSink>> { Ok(Arc::new(StdoutSink::new())) }),
            formatter,
        ));
        self
    }

    pub fn with_file_sink(
        mut self,
        path: impl Into<PathBuf>,
        max_file_size: Option<u64>,
        formatter: Box<dyn LogFormatter>,
    ) -> Self {
        let path: PathBuf = path.into();
        self.outputs.push((
            Box::new(move || -> eyre::Result<Arc<dyn LogSink>> {
                let mut sink = FileSink::new(path.clone())?;
                if let Some(max_file_size) = max_file_size {
                    sink = sink.with_max_file_size(max_file_size);
                }
                Ok(Arc::new(sink))
            }),
            formatter,
        ));
        self
    }

    pub fn build(&self) -> eyre::Result<Logger> {
        let logger = Logger::new();

        // level first: any valid pair passes against the default trigger
        logger
            .set_level(self.level)
            .wrap_err("Failed setting log level")?;
        logger
            .set_trigger_level(self.trigger_level)
            .wrap_err("Failed setting trigger level")?;
        logger
            .set_backlog_depth(self.backlog_depth)
            .wrap_err("Failed setting backlog depth")?;
        logger.set_compact_duplicates(self.compact_duplicates);

        for tag in &self.tags {
            logger.add_tag(tag.name(), tag.value().clone());
        }

        for (constructor, formatter) in &self.outputs {
            let sink = constructor()?;
            logger.add_output_target_and_formatter(sink, formatter.clone());
        }

        Ok(logger)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
