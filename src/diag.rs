//! The daemon's own diagnostic logging.
//!
//! This is deliberately separate from [`crate::registry`]'s client-facing
//! loggers: it is how an operator observes *this process*, not a channel
//! clients can open, write to, or configure from `/etc/logs.conf`.
//!
//! `log::set_logger` can only succeed once per process, so the
//! provisional-then-switched pattern can't just call it twice with two
//! different backends. Instead [`GLOBAL_LOGGER`] is installed exactly
//! once, in [`init`], and wraps an inner [`OnceLock<Logger>`] that
//! starts empty; until [`switch`] fills it in, every record is written
//! straight to stderr, so nothing is lost before the CLI is parsed.

use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

/// Installs the global logger. Safe to call multiple times; only the
/// first call has an effect.
pub fn init() {
    log::set_max_level(LevelFilter::Warn);
    // A second `set_logger` call always fails since a logger is already
    // installed; that's the steady state we want, so the error is not
    // worth reporting.
    let _ = log::set_logger(&GLOBAL_LOGGER);
}

/// Installs the operator-configured backend: either stderr (default) or
/// a file, at the requested verbosity. Called once, after CLI parsing.
pub fn switch(level: LevelFilter, log_file: Option<&Path>) -> Result<(), String> {
    let target = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| format!("failed to open log file '{}': {}", path.display(), err))?;
            Backend::File(file)
        }
        None => Backend::Stderr,
    };
    GLOBAL_LOGGER.switch(Logger { target: Mutex::new(target), level });
    log::set_max_level(level);
    Ok(())
}

/// Maps a `-v` repetition count to a diagnostic-log verbosity level,
/// mirroring the teacher's counted-verbosity convention: 0 = warn,
/// 1 = info, 2 = debug, 3+ = trace.
pub fn level_from_verbosity(count: u64) -> LevelFilter {
    match count {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

enum Backend {
    Stderr,
    File(File),
}

/// The real logger, installed once the CLI has been parsed.
struct Logger {
    target: Mutex<Backend>,
    level: LevelFilter,
}

impl Logger {
    fn write_record(&self, record: &Record) {
        if record.level() > self.level {
            return;
        }
        let line = format!("[{}] {}: {}\n", record.level(), record.target(), record.args());
        let mut target = self.target.lock().expect("diagnostic log target lock poisoned");
        let _ = match &mut *target {
            Backend::Stderr => io::stderr().write_all(line.as_bytes()),
            Backend::File(file) => file.write_all(line.as_bytes()),
        };
    }
}

/// The global logger. A value of this type can go into a static. Until
/// a proper logger is installed, it just writes all log output to
/// stderr.
struct GlobalLogger {
    inner: OnceLock<Logger>,
}

static GLOBAL_LOGGER: GlobalLogger = GlobalLogger::new();

impl GlobalLogger {
    const fn new() -> Self {
        GlobalLogger { inner: OnceLock::new() }
    }

    /// Switches to the proper logger. Can only be called once; a second
    /// call indicates a bug in startup sequencing, not a condition to
    /// recover from.
    fn switch(&self, logger: Logger) {
        if self.inner.set(logger).is_err() {
            panic!("tried to switch the diagnostic logger more than once");
        }
    }
}

impl Log for GlobalLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        match self.inner.get() {
            Some(logger) => logger.write_record(record),
            None => {
                let _ = writeln!(io::stderr(), "[{}] {}", record.level(), record.args());
            }
        }
    }

    fn flush(&self) {
        if let Some(Logger { target, .. }) = self.inner.get() {
            let mut target = target.lock().expect("diagnostic log target lock poisoned");
            let _ = match &mut *target {
                Backend::Stderr => io::stderr().flush(),
                Backend::File(file) => file.flush(),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_mapping() {
        assert_eq!(level_from_verbosity(0), LevelFilter::Warn);
        assert_eq!(level_from_verbosity(1), LevelFilter::Info);
        assert_eq!(level_from_verbosity(2), LevelFilter::Debug);
        assert_eq!(level_from_verbosity(5), LevelFilter::Trace);
    }
}
