use std::collections::HashMap;

use crate::error::{Error, Result};

use super::{
    formatters::{JSON_FORMATTER_ID, TEXT_FORMATTER_ID, YAML_FORMATTER_ID},
    JsonFormatter, LogFormatter, TextFormatter, YamlFormatter,
};

pub type FormatterFactory = Box<dyn Fn() -> Box<dyn LogFormatter> + Send + Sync>;

/// Maps formatter ids, as found in configuration files, to constructors.
///
/// Every `create` hands out a fresh formatter, so settings such as the
/// timestamp format never leak between outputs.
#[derive(Default)]
pub struct FormatterRegistry {
    factories: HashMap<String, FormatterFactory>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `text`, `json` and `yaml` formatters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.factories.insert(
            TEXT_FORMATTER_ID.to_string(),
            Box::new(|| -> Box<dyn LogFormatter> { Box::new(TextFormatter::new()) }),
        );
        registry.factories.insert(
            JSON_FORMATTER_ID.to_string(),
            Box::new(|| -> Box<dyn LogFormatter> { Box::new(JsonFormatter::new()) }),
        );
        registry.factories.insert(
            YAML_FORMATTER_ID.to_string(),
            Box::new(|| -> Box<dyn LogFormatter> { Box::new(YamlFormatter::new()) }),
        );
        registry
    }

    pub fn register(&mut self, id: impl Into<String>, factory: FormatterFactory) -> Result<()> {
        let id = id.into();
        if self.factories.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }

        self.factories.insert(id, factory);
        Ok(())
    }

    pub fn create(&self, id: &str) -> Result<Box<dyn LogFormatter>> {
        self.factories
            .get(id)
            .map(|factory| factory())
            .ok_or_else(|| Error::UnknownId(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        let registry = FormatterRegistry::with_builtins();
        assert_eq!(registry.ids(), vec!["json", "text", "yaml"]);

        for id in registry.ids() {
            assert_eq!(registry.create(id).unwrap().id(), id);
        }
    }

    #[test]
    fn test_register_duplicate() {
        let mut registry = FormatterRegistry::with_builtins();
        let result = registry.register(
            "json",
            Box::new(|| -> Box<dyn LogFormatter> { Box::new(JsonFormatter::new()) }),
        );

        assert!(matches!(result, Err(Error::DuplicateId(id)) if id == "json"));
    }

    #[test]
    fn test_register_and_create_custom() {
        let mut registry = FormatterRegistry::new();
        registry
            .register(
                "pretty",
                Box::new(|| -> Box<dyn LogFormatter> {
                    let mut formatter = JsonFormatter::new();
                    formatter.set_pretty_print(true);
                    Box::new(formatter)
                }),
            )
            .unwrap();

        assert!(registry.contains("pretty"));
        assert_eq!(registry.create("pretty").unwrap().id(), "json");
    }

    #[test]
    fn test_create_unknown() {
        let registry = FormatterRegistry::new();
        assert!(matches!(registry.create("xml"), Err(Error::UnknownId(id)) if id == "xml"));
    }

    #[test]
    fn test_instances_are_independent() {
        let registry = FormatterRegistry::with_builtins();

        let mut first = registry.create("text").unwrap();
        first.set_timestamp_format("%Y");
        let second = registry.create("text").unwrap();

        let entry = crate::entry::Entry::new(
            crate::level::LogLevel::Error,
            chrono::Utc::now(),
            "boom",
            std::sync::Arc::from(vec![]),
        );
        assert_eq!(second.format(&entry), b"[ERROR] boom\n");
    }
}
