//! Logging utilities: a small leveled logger driven by -v / -q flags.
//!
//! Everything goes to stderr. stdout is reserved for command output and,
//! in `serve`, for the MCP stdio transport.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod logging {
    use super::*;

    #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
    pub enum LogLevel {
        Error = 0,
        Info = 1,
        Debug = 2,
        Trace = 3,
    }

    impl LogLevel {
        pub fn as_str(&self) -> &'static str {
            match self {
                LogLevel::Error => "ERROR",
                LogLevel::Info => "INFO",
                LogLevel::Debug => "DEBUG",
                LogLevel::Trace => "TRACE",
            }
        }
    }

    static GLOBAL_LEVEL: OnceLock<AtomicU8> = OnceLock::new();

    fn inner_cell() -> &'static AtomicU8 {
        GLOBAL_LEVEL.get_or_init(|| AtomicU8::new(LogLevel::Info as u8))
    }

    pub fn init_logging(level: LogLevel) {
        set_log_level(level);
    }

    pub fn set_log_level(level: LogLevel) {
        inner_cell().store(level as u8, Ordering::Relaxed);
    }

    pub fn current_log_level() -> LogLevel {
        match inner_cell().load(Ordering::Relaxed) {
            0 => LogLevel::Error,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    pub fn derive_level(verbose: u8, quiet: bool) -> LogLevel {
        if quiet {
            return LogLevel::Error;
        }
        match verbose {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    fn timestamp() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0)
    }

    fn should_emit(level: LogLevel) -> bool {
        level <= current_log_level()
    }

    pub fn log(level: LogLevel, msg: impl AsRef<str>) {
        if should_emit(level) {
            eprintln!("[{}][{}] {}", level.as_str(), timestamp(), msg.as_ref());
        }
    }

    pub fn error(msg: impl AsRef<str>) {
        log(LogLevel::Error, msg);
    }
    pub fn info(msg: impl AsRef<str>) {
        log(LogLevel::Info, msg);
    }
    pub fn debug(msg: impl AsRef<str>) {
        log(LogLevel::Debug, msg);
    }
    pub fn trace(msg: impl AsRef<str>) {
        log(LogLevel::Trace, msg);
    }

    #[macro_export]
    macro_rules! log_error {
        ($($t:tt)*) => { $crate::utils::logging::error(format!($($t)*)) };
    }
    #[macro_export]
    macro_rules! log_info {
        ($($t:tt)*) => { $crate::utils::logging::info(format!($($t)*)) };
    }
    #[macro_export]
    macro_rules! log_debug {
        ($($t:tt)*) => { $crate::utils::logging::debug(format!($($t)*)) };
    }
    #[macro_export]
    macro_rules! log_trace {
        ($($t:tt)*) => { $crate::utils::logging::trace(format!($($t)*)) };
    }
}

pub use logging::{derive_level, init_logging};

#[cfg(test)]
mod tests {
    use super::logging::*;

    #[test]
    fn derive_level_flags() {
        assert_eq!(derive_level(0, false), LogLevel::Info);
        assert_eq!(derive_level(1, false), LogLevel::Debug);
        assert_eq!(derive_level(2, false), LogLevel::Trace);
        assert_eq!(derive_level(2, true), LogLevel::Error);
    }
}
