//! Explicitly passed logging sink.
//!
//! The engine never installs a global logger. A host either hands an
//! `Arc<dyn log::Log>` to [`crate::Engine::with_logger`], or records are
//! forwarded to whatever backend the `log` facade is set up with.

use alloc::sync::Arc;
use core::fmt;
use log::{Level, Log, Metadata, Record};

/// Target attached to every record emitted by the engine.
pub const LOG_TARGET: &str = "beatline";

/// Destination for engine diagnostics. Cheap to clone.
#[derive(Clone, Default)]
pub struct Logger {
    sink: Option<Arc<dyn Log>>,
}

impl Logger {
    /// Send records to `sink`.
    pub fn new(sink: Arc<dyn Log>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Send records to the `log` facade.
    pub fn facade() -> Self {
        Self { sink: None }
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder().level(level).target(LOG_TARGET).build();
        match &self.sink {
            Some(sink) => {
                if sink.enabled(&metadata) {
                    sink.log(&Record::builder().metadata(metadata).args(args).build());
                }
            }
            None => {
                let facade = log::logger();
                if level <= log::max_level() && facade.enabled(&metadata) {
                    facade.log(&Record::builder().metadata(metadata).args(args).build());
                }
            }
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("sink", &if self.sink.is_some() { "custom" } else { "facade" })
            .finish()
    }
}

macro_rules! log_warn {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log(log::Level::Warn, format_args!($($arg)+))
    };
}

macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log(log::Level::Info, format_args!($($arg)+))
    };
}

macro_rules! log_debug {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log(log::Level::Debug, format_args!($($arg)+))
    };
}

macro_rules! log_trace {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log(log::Level::Trace, format_args!($($arg)+))
    };
}

pub(crate) use {log_debug, log_info, log_trace, log_warn};

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloc::string::{String, ToString};
    use alloc::vec::Vec;
    use std::sync::Mutex;

    /// Sink that keeps every record for inspection.
    #[derive(Default)]
    pub(crate) struct CaptureSink {
        pub records: Mutex<Vec<(Level, String)>>,
    }

    impl Log for CaptureSink {
        fn enabled(&self, _metadata: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            self.records
                .lock()
                .unwrap()
                .push((record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }

    #[test]
    fn custom_sink_receives_records() {
        let sink = Arc::new(CaptureSink::default());
        let logger = Logger::new(sink.clone());
        log_debug!(logger, "created {} tasks", 3);
        log_warn!(logger, "backlog");

        let records = sink.records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], (Level::Debug, "created 3 tasks".to_string()));
        assert_eq!(records[1].0, Level::Warn);
    }

    #[test]
    fn facade_logger_without_backend_is_silent() {
        let logger = Logger::facade();
        log_info!(logger, "nobody listens");
        log_trace!(logger, "still nobody");
    }
}
