#[derive(PartialEq, PartialOrd, Debug, Default, Clone, Copy)]
pub enum LogLevel {
    #[default]
    NONE,
    INFO,
    DEBUG,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::NONE => "NONE",
            LogLevel::INFO => "INFO",
            LogLevel::DEBUG => "DEBUG",
        }
    }
}

pub fn to_loglevel(ulevel: u64) -> LogLevel {
    match ulevel {
        0 => LogLevel::NONE,
        1 => LogLevel::INFO,
        _ => LogLevel::DEBUG,
    }
}

/// Per-component tracing sink.  Verbosity comes from the component's own config (`verbose`),
/// independent of the `RUST_LOG` filter that governs the `log` facade.
pub struct Logger {
    level: LogLevel,
    name: String,
}

impl Logger {
    pub fn new(name: &str, ulevel: u64) -> Self {
        Logger {
            level: to_loglevel(ulevel),
            name: name.to_string(),
        }
    }

    pub fn silent() -> Self {
        Logger {
            level: LogLevel::NONE,
            name: String::new(),
        }
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::NONE && level <= self.level
    }

    pub fn log(&self, level: LogLevel, args: std::fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        println!("[{}] {}: {}", level.as_str(), self.name, args);
    }
}

#[macro_export]
macro_rules! log {
    // usage: log!(logger, level, "issued {} at {}", id, now)
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        $logger.log($level, format_args!($($arg)+));
    }};
}
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => ( $crate::log!($logger, $crate::sim::log::LogLevel::INFO, $($arg)+); )
}
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => ( $crate::log!($logger, $crate::sim::log::LogLevel::DEBUG, $($arg)+); )
}
