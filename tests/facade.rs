use std::{sync::mpsc, sync::Arc, thread, time::Duration};

use backlog::{LogLevel, LogSink, Logger, MemorySink};

struct FailingSink;

impl LogSink for FailingSink {
    fn write_bytes(&self, _bytes: &[u8]) -> eyre::Result<()> {
        Err(eyre::eyre!("disk gone"))
    }

    fn flush(&self) {}
}

// Without a tracing subscriber, tracing's `log` feature forwards the sink
// failure warning to the `log` facade, which is this same logger.
#[test]
fn test_failed_write_warning_does_not_reenter_global_logger() {
    let sink = MemorySink::new();
    let logger = Logger::new();
    logger.set_level(LogLevel::Warning).unwrap();
    logger.add_output_target(Arc::new(FailingSink));
    logger.add_output_target(Arc::new(sink.clone()));
    logger.init().unwrap();

    let (done, finished) = mpsc::channel();
    thread::spawn(move || {
        log::error!("boom");
        log::warn!("still here");
        done.send(()).unwrap();
    });

    finished
        .recv_timeout(Duration::from_secs(5))
        .expect("logging through a failing sink did not return");

    assert_eq!(
        sink.contents_string(),
        "[ERROR] boom\n[WARNING] still here\n"
    );
}
