//! Minimal `log` backend writing to standard error.

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Writes each enabled record to stderr as one line.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match (record.file(), record.line()) {
            (Some(file), Some(line)) => eprintln!(
                "{}: {} {} at {file}:{line}",
                record.level(),
                record.target(),
                record.args()
            ),
            _ => eprintln!("{}: {} {}", record.level(), record.target(), record.args()),
        }
    }

    fn flush(&self) {}
}

/// Installs [`StderrLogger`] as the global logger at `level`.
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a logger was already installed.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
