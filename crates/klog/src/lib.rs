//! Kernel logging backend.
//!
//! Installs a `log::Log` implementation that writes one coloured,
//! level-tagged line per record to COM1. `mplock`'s default fatal handler
//! reports through `log::error!`, so install this before other cores come up.
#![cfg_attr(not(test), no_std)]

use core::fmt;

use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

fn tag(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRACE",
        Level::Debug => "DEBUG",
        Level::Info => " INFO",
        Level::Warn => " WARN",
        Level::Error => "ERROR",
    }
}

fn color(level: Level) -> &'static str {
    match level {
        Level::Trace => "\x1b[90m", // Gray
        Level::Debug => "\x1b[36m", // Cyan
        Level::Info => "\x1b[32m",  // Green
        Level::Warn => "\x1b[33m",  // Yellow
        Level::Error => "\x1b[31m", // Red
    }
}

/// One formatted log line, without the trailing newline.
struct Line<'a> {
    level: Level,
    target: &'a str,
    args: &'a fmt::Arguments<'a>,
}

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]\x1b[0m {}: {}",
            color(self.level),
            tag(self.level),
            self.target,
            self.args
        )
    }
}

/// Writes records to the serial port.
pub struct KernelLogger;

static LOGGER: KernelLogger = KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = Line {
            level: record.level(),
            target: record.target(),
            args: record.args(),
        };
        khal::serial::write_fmt(format_args!("{}\n", line));
    }

    fn flush(&self) {}
}

/// Brings up the serial port and installs the kernel logger.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    khal::serial::init();
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
