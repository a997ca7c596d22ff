//! The one `log::Log` implementation in the workspace (spec.md §1.1):
//! every library crate logs through `log`'s macros, and this binary
//! owns the sink. Formats `"LEVEL: [secs-since-first-log]: message\n"`
//! (spec.md §6) and appends to the boot volume's `lsvmlog` file.
//!
//! Grounded on `original_source/lsvmload/log.c`'s format string and on
//! spec.md §5's reentrancy hazard: a log call made from inside a BIO
//! shim must not recurse back into the same shim, so writes made while
//! already inside a log write are dropped rather than queued.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Instant;

pub struct FileLogger {
    sink: Mutex<Option<std::fs::File>>,
    start: Instant,
    writing: AtomicBool,
}

impl FileLogger {
    pub fn new(sink: Option<std::fs::File>) -> Self {
        Self {
            sink: Mutex::new(sink),
            start: Instant::now(),
            writing: AtomicBool::new(false),
        }
    }

    fn format(&self, record: &log::Record) -> String {
        std::format!(
            "{}: [{}]: {}\n",
            record.level(),
            self.start.elapsed().as_secs(),
            record.args()
        )
    }
}

impl log::Log for FileLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // Reentrancy guard: a log call made while formatting/writing a
        // previous one (e.g. triggered by the disk I/O this write itself
        // performs) is dropped, not queued.
        if self.writing.swap(true, Ordering::SeqCst) {
            return;
        }
        let line = self.format(record);
        if let Ok(mut sink) = self.sink.lock() {
            if let Some(file) = sink.as_mut() {
                let _ = file.write_all(line.as_bytes());
            }
        }
        self.writing.store(false, Ordering::SeqCst);
    }

    fn flush(&self) {
        if let Ok(mut sink) = self.sink.lock() {
            if let Some(file) = sink.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    fn record<'a>(level: log::Level, args: std::fmt::Arguments<'a>) -> log::Record<'a> {
        log::Record::builder().level(level).args(args).build()
    }

    #[test]
    fn formats_level_elapsed_and_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lsvmlog");
        let file = std::fs::File::create(&path).unwrap();
        let logger = FileLogger::new(Some(file));

        logger.log(&record(log::Level::Info, format_args!("hello")));
        logger.flush();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("INFO: ["));
        assert!(contents.contains("]: hello\n"));
    }

    #[test]
    fn reentrant_log_calls_are_dropped() {
        let logger = FileLogger::new(None);
        logger.writing.store(true, Ordering::SeqCst);
        // Should not panic or deadlock; the write is silently dropped.
        logger.log(&record(log::Level::Warn, format_args!("nested")));
        assert!(logger.writing.load(Ordering::SeqCst));
    }

    #[test]
    fn logger_without_a_sink_does_not_error() {
        let logger = FileLogger::new(None);
        logger.log(&record(log::Level::Error, format_args!("no sink")));
        logger.flush();
    }
}
