use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::env;

/// Adapted from `SimpleLogger` in crate `log`. Hosts embedding the
/// scheduler usually install their own logger; this one exists for tests
/// and standalone harnesses.
struct SchedulerLogger;

impl Log for SchedulerLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        // Capped at compile time through the `log` feature flags; tweak at
        // runtime with RUST_LOG.
        true
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("[{}] {} {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: SchedulerLogger = SchedulerLogger;

pub fn init() -> Result<(), SetLoggerError> {
    let level = match env::var("RUST_LOG") {
        Ok(level) => match level.to_uppercase().as_str() {
            "OFF" => LevelFilter::Off,
            "ERROR" => LevelFilter::Error,
            "WARN" => LevelFilter::Warn,
            "DEBUG" => LevelFilter::Debug,
            "TRACE" => LevelFilter::Trace,
            _ => LevelFilter::Info,
        },
        Err(_) => LevelFilter::Info,
    };
    log::set_max_level(level);
    log::set_logger(&LOGGER)
}
