use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::sync::OnceLock;

/// Writes `[LEVEL] target: message` lines to stderr.
pub struct StderrLogger {
    max_level: LevelFilter,
}

impl StderrLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Call this once at startup.
    pub fn init(self) -> Result<(), SetLoggerError> {
        static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

        let max_level = self.max_level;
        let logger = LOGGER.get_or_init(|| self);
        log::set_logger(logger)?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let _ = writeln!(
            std::io::stderr().lock(),
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Level for a `PAGEWALK_LOG` value, `warn` when unset. Unknown names give `None`.
pub fn level_from_env(value: Option<&str>) -> Option<LevelFilter> {
    match value.map(str::trim) {
        None | Some("") => Some(LevelFilter::Warn),
        Some(v) => v.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_levels() {
        assert_eq!(level_from_env(None), Some(LevelFilter::Warn));
        assert_eq!(level_from_env(Some("trace")), Some(LevelFilter::Trace));
        assert_eq!(level_from_env(Some("OFF")), Some(LevelFilter::Off));
        assert_eq!(level_from_env(Some("loud")), None);
    }

    #[test]
    fn filters_by_level() {
        let logger = StderrLogger::new(LevelFilter::Info);
        let debug = Metadata::builder().level(log::Level::Debug).build();
        let warn = Metadata::builder().level(log::Level::Warn).build();
        assert!(!logger.enabled(&debug));
        assert!(logger.enabled(&warn));
    }
}
