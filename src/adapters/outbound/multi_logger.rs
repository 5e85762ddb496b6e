use crate::domains::logger::{DomainLogger, DynLogger};
use std::sync::Arc;

/// Tees bridge narration: every line goes to the console narrator first, then
/// to each extra sink in the order they were added.
pub struct MultiLogger {
    sinks: Vec<DynLogger>,
}

impl MultiLogger {
    pub fn new(console: DynLogger) -> Self {
        Self {
            sinks: vec![console],
        }
    }

    pub fn with_sink(mut self, sink: DynLogger) -> Self {
        self.sinks.push(sink);
        self
    }

    fn each(&self, line: impl Fn(&dyn DomainLogger)) {
        for sink in &self.sinks {
            line(sink.as_ref());
        }
    }
}

impl DomainLogger for MultiLogger {
    fn info(&self, msg: &str) {
        self.each(|sink| sink.info(msg));
    }

    fn warn(&self, msg: &str) {
        self.each(|sink| sink.warn(msg));
    }

    fn error(&self, msg: &str) {
        self.each(|sink| sink.error(msg));
    }
}

/// Console narration plus a copy in `path`. Falls back to console only when the
/// file sink cannot be initialised.
pub fn init_combined_logger(path: &str, level: log::LevelFilter) -> DynLogger {
    let console = super::init_console_logger();
    match super::init_file_logger(path, level) {
        Ok(file_logger) => Arc::new(MultiLogger::new(console).with_sink(file_logger)) as DynLogger,
        Err(e) => {
            tracing::warn!("{}; narrating to console only", e);
            console
        }
    }
}
