use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{level::LogLevel, tag::Tag};

/// One recorded log event.
///
/// The tag set is a snapshot taken when the entry was created; tags added
/// to the logger afterwards never show up on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    level: LogLevel,
    timestamp: DateTime<Utc>,
    message: String,
    tags: Arc<[Tag]>,
}

impl Entry {
    pub fn new(
        level: LogLevel,
        timestamp: DateTime<Utc>,
        message: impl Into<String>,
        tags: Arc<[Tag]>,
    ) -> Self {
        Self {
            level,
            timestamp,
            message: message.into(),
            tags,
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Copy of this entry with `" (count)"` appended to the message.
    pub(crate) fn compacted(&self, count: usize) -> Self {
        Self {
            level: self.level,
            timestamp: self.timestamp,
            message: format!("{} ({})", self.message, count),
            tags: Arc::clone(&self.tags),
        }
    }
}
