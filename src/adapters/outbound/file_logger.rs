use crate::domains::logger::{DomainLogger, FileLogger};
use std::sync::Arc;

/// Initialise the `fast_log` file sink and return a narrator writing into it.
pub fn init_file_logger(path: &str, level: log::LevelFilter) -> Result<Arc<dyn DomainLogger>, String> {
    FileLogger::init(path, level).map_err(|e| format!("Failed to initialize fast_log at {}: {}", path, e))?;
    Ok(Arc::new(FileLogger))
}
