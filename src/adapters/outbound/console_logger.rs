use crate::domains::logger::{DomainLogger, DynLogger};
use std::io::Write;
use std::sync::Arc;

/// Prints narration as plain lines on stdout. Warnings get a prefix, and
/// errors go to stderr so a redirected run still surfaces them.
struct ConsoleNarrator;

impl ConsoleNarrator {
    fn line(mut out: impl Write, prefix: &str, msg: &str) {
        // A closed pipe only loses narration.
        let _ = writeln!(out, "{}{}", prefix, msg);
    }
}

impl DomainLogger for ConsoleNarrator {
    fn info(&self, msg: &str) {
        Self::line(std::io::stdout().lock(), "", msg);
    }

    fn warn(&self, msg: &str) {
        Self::line(std::io::stdout().lock(), "WARN: ", msg);
    }

    fn error(&self, msg: &str) {
        Self::line(std::io::stderr().lock(), "ERROR: ", msg);
    }
}

pub fn init_console_logger() -> DynLogger {
    Arc::new(ConsoleNarrator)
}
