//! # Console Logger
//!
//! A [`log::Log`] implementation that formats records as
//! `[LEVEL target] message` lines and pushes the bytes through a sink
//! function, usually the firmware console.

use core::fmt::{self, Write};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Byte sink used by the logger
pub type ByteSink = fn(u8);

/// Line-oriented logger over a byte sink
pub struct ConsoleLogger {
    sink: ByteSink,
    level: LevelFilter,
}

impl ConsoleLogger {
    /// Create a logger writing to `sink`
    pub const fn new(sink: ByteSink, level: LevelFilter) -> Self {
        Self { sink, level }
    }

    /// Maximum level this logger emits
    pub const fn level(&self) -> LevelFilter {
        self.level
    }

    /// Register as the global logger
    pub fn install(&'static self) -> Result<(), SetLoggerError> {
        log::set_logger(self)?;
        log::set_max_level(self.level);
        Ok(())
    }
}

impl fmt::Debug for ConsoleLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleLogger").field("level", &self.level).finish()
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut writer = SinkWriter(self.sink);
        let _ = writeln!(writer, "[{:<5} {}] {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}

/// `fmt::Write` over a byte sink, CR LF line endings
struct SinkWriter(ByteSink);

impl Write for SinkWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                (self.0)(b'\r');
            }
            (self.0)(byte);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use log::Level;
    use spin::Mutex;

    use super::*;

    static CAPTURED: Mutex<Vec<u8>> = Mutex::new(Vec::new());

    fn capture(byte: u8) {
        CAPTURED.lock().push(byte);
    }

    #[test]
    fn test_record_format_and_filtering() {
        let logger = ConsoleLogger::new(capture, LevelFilter::Info);

        logger.log(
            &Record::builder()
                .args(format_args!("paging enabled"))
                .level(Level::Info)
                .target("sable_early_boot::memory")
                .build(),
        );
        logger.log(
            &Record::builder()
                .args(format_args!("too chatty"))
                .level(Level::Debug)
                .target("sable_early_boot::memory")
                .build(),
        );

        let text = String::from_utf8(CAPTURED.lock().clone()).unwrap();
        assert_eq!(text, "[INFO  sable_early_boot::memory] paging enabled\r\n");
    }

    #[test]
    fn test_enabled_respects_level() {
        let logger = ConsoleLogger::new(capture, LevelFilter::Warn);
        assert!(logger.enabled(&Metadata::builder().level(Level::Error).build()));
        assert!(!logger.enabled(&Metadata::builder().level(Level::Info).build()));
        assert_eq!(logger.level(), LevelFilter::Warn);
    }
}
