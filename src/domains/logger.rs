use std::sync::Arc;

/// Domain-level narration port. Agents and the bridge event actor report what
/// happens on the bridge through it; callers never see a failure.
pub trait DomainLogger: Send + Sync + 'static {
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
}

pub type DynLogger = Arc<dyn DomainLogger>;

/// File sink built on `fast_log`; the `log` macros write into it once initialised.
pub struct FileLogger;

impl FileLogger {
    /// Initialise `fast_log` with a file appender at `path`.
    /// Only one `log` backend can exist per process, so this succeeds at most once.
    pub fn init(path: &str, level: log::LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
        fast_log::init(fast_log::config::Config::new().file(path).level(level))?;
        Ok(())
    }
}

impl DomainLogger for FileLogger {
    fn info(&self, msg: &str) {
        log::info!("{}", msg);
    }

    fn warn(&self, msg: &str) {
        log::warn!("{}", msg);
    }

    fn error(&self, msg: &str) {
        log::error!("{}", msg);
    }
}
