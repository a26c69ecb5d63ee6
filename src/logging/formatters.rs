use std::fmt::Write;

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use yansi::Paint;

use crate::{entry::Entry, level::LogLevel};

use super::LogFormatter;

pub const TEXT_FORMATTER_ID: &str = "text";
pub const JSON_FORMATTER_ID: &str = "json";
pub const YAML_FORMATTER_ID: &str = "yaml";

fn render_timestamp(timestamp: DateTime<Utc>, pattern: Option<&str>) -> String {
    let local = timestamp.with_timezone(&Local);
    let Some(pattern) = pattern else {
        return local.to_rfc3339_opts(SecondsFormat::Millis, true);
    };

    // chrono reports a bad pattern as a fmt error rather than up front
    let mut out = String::new();
    if write!(out, "{}", local.format(pattern)).is_err() {
        return format!("invalid timestamp format: {}", pattern);
    }
    out
}

fn tag_map(entry: &Entry) -> Map<String, Value> {
    entry
        .tags()
        .iter()
        .map(|tag| (tag.name().to_string(), tag.value().clone()))
        .collect()
}

/// Human readable single line output, `[LEVEL] name: value message`.
#[derive(Debug, Clone, Default)]
pub struct TextFormatter {
    timestamp_format: Option<String>,
    use_ansi: bool,
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ansi(self, use_ansi: bool) -> Self {
        Self { use_ansi, ..self }
    }

    fn format_level(&self, level: LogLevel) -> String {
        let name = level.name(true);
        if !self.use_ansi {
            return name.to_string();
        }

        match level {
            LogLevel::Trace => name.white().to_string(),
            LogLevel::Debug => name.blue().to_string(),
            LogLevel::Information => name.green().to_string(),
            LogLevel::Warning => name.yellow().to_string(),
            LogLevel::Error => name.red().to_string(),
            LogLevel::Fatal => name.red().bold().to_string(),
        }
    }

    fn format_timestamp(&self, timestamp: DateTime<Utc>) -> Option<String> {
        let pattern = self.timestamp_format.as_deref()?;
        let rendered = render_timestamp(timestamp, Some(pattern));

        if self.use_ansi {
            Some(rendered.bright_black().to_string())
        } else {
            Some(rendered)
        }
    }
}

impl LogFormatter for TextFormatter {
    fn id(&self) -> &str {
        TEXT_FORMATTER_ID
    }

    fn set_timestamp_format(&mut self, pattern: &str) {
        self.timestamp_format = Some(pattern.to_string());
    }

    fn set_color(&mut self, enabled: bool) {
        self.use_ansi = enabled;
    }

    fn format(&self, entry: &Entry) -> Vec<u8> {
        let mut line = String::new();

        if let Some(timestamp) = self.format_timestamp(entry.timestamp()) {
            line.push_str(&timestamp);
            line.push(' ');
        }

        line.push('[');
        line.push_str(&self.format_level(entry.level()));
        line.push_str("] ");

        for tag in entry.tags() {
            let _ = write!(line, "{} ", tag);
        }

        line.push_str(entry.message());
        line.push('\n');

        line.into_bytes()
    }

    fn box_clone(&self) -> Box<dyn LogFormatter> {
        Box::new(self.clone())
    }
}

#[derive(Serialize)]
struct StructuredOutput<'a> {
    timestamp: String,
    level: &'static str,
    message: &'a str,
    tags: Map<String, Value>,
}

impl<'a> StructuredOutput<'a> {
    fn new(entry: &'a Entry, timestamp_format: Option<&str>) -> Self {
        Self {
            timestamp: render_timestamp(entry.timestamp(), timestamp_format),
            level: entry.level().name(true),
            message: entry.message(),
            tags: tag_map(entry),
        }
    }
}

/// One JSON object per entry, newline terminated.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    timestamp_format: Option<String>,
    pretty_print: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pretty_print(&mut self, pretty_print: bool) {
        self.pretty_print = pretty_print;
    }
}

impl LogFormatter for JsonFormatter {
    fn id(&self) -> &str {
        JSON_FORMATTER_ID
    }

    fn set_timestamp_format(&mut self, pattern: &str) {
        self.timestamp_format = Some(pattern.to_string());
    }

    fn format(&self, entry: &Entry) -> Vec<u8> {
        let output = StructuredOutput::new(entry, self.timestamp_format.as_deref());

        let rendered = if self.pretty_print {
            serde_json::to_vec_pretty(&output)
        } else {
            serde_json::to_vec(&output)
        };

        let mut bytes = rendered.unwrap_or_else(|err| err.to_string().into_bytes());
        bytes.push(b'\n');
        bytes
    }

    fn box_clone(&self) -> Box<dyn LogFormatter> {
        Box::new(self.clone())
    }
}

/// One YAML document per entry.
///
/// Scalars are written as JSON strings/values, which YAML reads as flow
/// scalars, so no escaping rules of our own are needed.
#[derive(Debug, Clone, Default)]
pub struct YamlFormatter {
    timestamp_format: Option<String>,
}

impl YamlFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    fn scalar<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string(value).unwrap_or_else(|err| format!("{:?}", err.to_string()))
    }
}

impl LogFormatter for YamlFormatter {
    fn id(&self) -> &str {
        YAML_FORMATTER_ID
    }

    fn set_timestamp_format(&mut self, pattern: &str) {
        self.timestamp_format = Some(pattern.to_string());
    }

    fn format(&self, entry: &Entry) -> Vec<u8> {
        let output = StructuredOutput::new(entry, self.timestamp_format.as_deref());

        let mut doc = String::from("---\n");
        let _ = writeln!(doc, "timestamp: {}", Self::scalar(&output.timestamp));
        let _ = writeln!(doc, "level: {}", output.level);
        let _ = writeln!(doc, "message: {}", Self::scalar(output.message));

        if output.tags.is_empty() {
            doc.push_str("tags: {}\n");
        } else {
            doc.push_str("tags:\n");
            for (name, value) in &output.tags {
                let _ = writeln!(doc, "  {}: {}", Self::scalar(name), Self::scalar(value));
            }
        }

        doc.into_bytes()
    }

    fn box_clone(&self) -> Box<dyn LogFormatter> {
        Box::new(self.clone())
    }
}
