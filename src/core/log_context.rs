use log::{Level, LevelFilter};
use std::fmt;

/// Explicit logging context handed to the renderer and the resources it creates.
///
/// Every library diagnostic goes through one of these instead of an
/// ambient global configuration; the context only decides the target and
/// the maximum level, the records themselves still go to the `log` facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogContext {
    target: &'static str,
    max_level: LevelFilter,
}

impl Default for LogContext {
    fn default() -> Self {
        Self::new("softrender", LevelFilter::Info)
    }
}

impl LogContext {
    pub fn new(target: &'static str, max_level: LevelFilter) -> Self {
        Self { target, max_level }
    }

    /// A context that drops everything, handy for tests and benchmarks
    pub fn silent() -> Self {
        Self::new("softrender", LevelFilter::Off)
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn max_level(&self) -> LevelFilter {
        self.max_level
    }

    pub fn with_level(mut self, max_level: LevelFilter) -> Self {
        self.max_level = max_level;
        self
    }

    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.max_level
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if self.enabled(level) {
            log::log!(target: self.target, level, "{}", args);
        }
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    pub fn trace(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Trace, args);
    }
}
