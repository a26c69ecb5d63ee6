use std::sync::Arc;

use backlog::{
    Builder, FormatterRegistry, JsonFormatter, LogLevel, Logger, MemorySink, TextFormatter,
    YamlFormatter,
};

fn messages(logger: &Logger) -> Vec<String> {
    logger
        .buffered_entries()
        .iter()
        .map(|entry| entry.message().to_string())
        .collect()
}

#[test]
fn test_duplicate_runs_compact_to_one_entry() {
    for n in 2..=6 {
        let logger = Logger::new();
        for _ in 0..n {
            logger.information("disk full");
        }
        logger.information("disk ok");

        let compacted = format!("disk full ({})", n);
        let buffered = messages(&logger);
        assert_eq!(buffered, vec!["disk full", compacted.as_str(), "disk ok"]);
        assert_eq!(
            buffered.iter().filter(|m| m.ends_with(&format!("({})", n))).count(),
            1
        );
    }
}

#[test]
fn test_trigger_materializes_duplicate_run() {
    let logger = Logger::new();
    let sink = MemorySink::new();
    logger.add_output_target(Arc::new(sink.clone()));

    logger.warning("retrying");
    logger.warning("retrying");
    logger.warning("retrying");
    logger.fatal("gave up");

    assert_eq!(
        sink.contents_string(),
        "[WARNING] retrying\n[WARNING] retrying (3)\n[FATAL] gave up\n"
    );
}

#[test]
fn test_wraparound_keeps_last_entries() {
    let depth = 7;
    for k in 1..=10 {
        let logger = Logger::new();
        logger.set_backlog_depth(depth).unwrap();

        for i in 0..(depth + k) {
            logger.debug(format!("message {}", i));
        }

        let expected: Vec<String> = (k..depth + k).map(|i| format!("message {}", i)).collect();
        assert_eq!(messages(&logger), expected, "k = {}", k);
    }
}

#[test]
fn test_trigger_drains_through_every_output() {
    let text = MemorySink::new();
    let json = MemorySink::new();
    let logger = Builder::new()
        .with_level(LogLevel::Warning)
        .with_trigger_level(LogLevel::Error)
        .with_sink(Arc::new(text.clone()), Box::new(TextFormatter::new()))
        .with_sink(Arc::new(json.clone()), Box::new(JsonFormatter::new()))
        .build()
        .unwrap();

    logger.trace("step 1");
    logger.debug("step 2");
    logger.information("step 3");
    assert!(text.contents().is_empty());
    assert!(json.contents().is_empty());

    logger.error("step 4 failed");
    assert_eq!(logger.backlog_cursors(), (0, 0));
    assert!(logger.buffered_entries().is_empty());

    assert_eq!(
        text.contents_string(),
        "[TRACE] step 1\n[DEBUG] step 2\n[INFORMATION] step 3\n[ERROR] step 4 failed\n"
    );

    let json_messages: Vec<String> = json
        .contents_string()
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["message"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        json_messages,
        vec!["step 1", "step 2", "step 3", "step 4 failed"]
    );
}

#[test]
fn test_builtin_formatters_render_level_message_and_tags() {
    let registry = FormatterRegistry::with_builtins();

    for id in registry.ids() {
        let sink = MemorySink::new();
        let logger = Logger::new();
        logger.add_tag("region", "eu-west-1");
        logger.add_tag("attempt", 3);
        logger.add_output_target_and_formatter(Arc::new(sink.clone()), registry.create(id).unwrap());

        logger.warningf(format_args!("{} queue is {}% full", "ingest", 95));
        logger.error("queue overflow");

        let output = sink.contents_string();
        assert!(output.contains("ERROR"), "{}: {}", id, output);
        assert!(output.contains("queue overflow"), "{}: {}", id, output);
        assert!(output.contains("region"), "{}: {}", id, output);
        assert!(output.contains("eu-west-1"), "{}: {}", id, output);
        assert!(output.contains("attempt"), "{}: {}", id, output);
        assert!(output.contains('3'), "{}: {}", id, output);
    }
}

#[test]
fn test_yaml_documents_per_entry() {
    let sink = MemorySink::new();
    let logger = Logger::new();
    logger.add_output_target_and_formatter(Arc::new(sink.clone()), Box::new(YamlFormatter::new()));

    logger.trace("one");
    logger.fatal("two");

    let output = sink.contents_string();
    assert_eq!(output.matches("---\n").count(), 2);
    assert!(output.contains("level: TRACE\n"));
    assert!(output.contains("level: FATAL\n"));
}

#[test]
fn test_clone_scenario() {
    let logger = Logger::new();
    logger.set_backlog_depth(10).unwrap();
    logger.add_tag("one", 1);
    logger.add_tag("two", 2);
    logger.add_tag("three", 3);
    logger.information("kept by the original");

    let clone = logger.clone();

    assert_eq!(clone.level(), logger.level());
    assert_eq!(clone.trigger_level(), logger.trigger_level());
    assert_eq!(clone.backlog_depth(), 10);
    assert_eq!(clone.compact_duplicates(), logger.compact_duplicates());
    assert_eq!(clone.tags(), logger.tags());
    assert!(clone.buffered_entries().is_empty());
    assert_eq!(logger.buffered_entries().len(), 1);
}

#[test]
fn test_entries_keep_their_tags() {
    let logger = Logger::new();
    logger.add_tag("phase", "startup");
    logger.trace("booting");
    logger.add_tag("phase", "running");

    let entries = logger.buffered_entries();
    assert_eq!(entries[0].tags().len(), 1);
    assert_eq!(entries[0].tags()[0].value(), "startup");
}
