use std::fmt;

use serde_json::Value;

/// A name/value pair attached to every entry a logger records.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    name: String,
    value: Value,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

// Strings print bare, everything else in JSON notation.
impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::String(s) => write!(f, "{}: {}", self.name, s),
            other => write!(f, "{}: {}", self.name, other),
        }
    }
}
