//! Leveled logging to stderr: each line is prefixed with the local
//! time, the level and the source location.

use std::{
    io::{stderr, StderrLock, Write},
    str::FromStr,
    sync::atomic::{AtomicU8, Ordering},
    time::SystemTime,
};

use anyhow::{bail, Result};

use crate::serde::date_and_time::system_time_to_rfc3339;

/// Environment variable consulted by `init_log_level` when no command
/// line option was given.
pub const LOG_LEVEL_ENV_VAR: &str = "LATENCY_STATS_LOG";

pub fn write_prefix(level: LogLevel, file: &str, line: u32) -> StderrLock<'static> {
    let t_str = system_time_to_rfc3339(SystemTime::now());
    let mut lock = stderr().lock();
    write!(&mut lock, "{t_str}\t{}\t{file}:{line}\t", level.tag()).expect("stderr must not fail");
    lock
}

#[macro_export]
macro_rules! log_at {
    { $level:expr, $($arg:tt)* } => {
        if $crate::utillib::logging::log_level() >= $level {
            use std::io::Write;
            let mut lock = $crate::utillib::logging::write_prefix($level, file!(), line!());
            writeln!(&mut lock, $($arg)*).expect("stderr must not fail");
        }
    }
}

#[macro_export]
macro_rules! warn {
    { $($arg:tt)* } => {
        $crate::log_at!($crate::utillib::logging::LogLevel::Warn, $($arg)*)
    }
}

#[macro_export]
macro_rules! info {
    { $($arg:tt)* } => {
        $crate::log_at!($crate::utillib::logging::LogLevel::Info, $($arg)*)
    }
}

#[macro_export]
macro_rules! debug {
    { $($arg:tt)* } => {
        $crate::log_at!($crate::utillib::logging::LogLevel::Debug, $($arg)*)
    }
}

// Fields private to force going through `TryFrom`
#[derive(Debug, clap::Args)]
pub struct LogLevelOpt {
    /// Show what is being done
    #[clap(short, long)]
    verbose: bool,

    /// Show information that helps debug this program (implies
    /// `--verbose`)
    #[clap(short, long)]
    debug: bool,

    /// Disable warnings, e.g. about slow computations. Conflicts with
    /// `--verbose` and `--debug`.
    #[clap(short, long)]
    quiet: bool,
}

impl LogLevelOpt {
    fn is_unset(&self) -> bool {
        !(self.verbose || self.debug || self.quiet)
    }
}

impl TryFrom<LogLevelOpt> for LogLevel {
    type Error = anyhow::Error;

    fn try_from(value: LogLevelOpt) -> Result<Self> {
        match value {
            LogLevelOpt {
                verbose,
                debug,
                quiet: true,
            } if verbose || debug => {
                bail!("option `--quiet` conflicts with the options `--verbose` and `--debug`")
            }
            LogLevelOpt { quiet: true, .. } => Ok(LogLevel::Quiet),
            LogLevelOpt { debug: true, .. } => Ok(LogLevel::Debug),
            LogLevelOpt { verbose: true, .. } => Ok(LogLevel::Info),
            _ => Ok(LogLevel::Warn),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    /// Do not log anything
    Quiet = 0,
    /// The default, only `warn!` statements output anything
    Warn = 1,
    /// Tell the user what is going on
    Info = 2,
    /// For debugging this program
    Debug = 3,
}

impl LogLevel {
    fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(LogLevel::Quiet),
            1 => Some(LogLevel::Warn),
            2 => Some(LogLevel::Info),
            3 => Some(LogLevel::Debug),
            _ => None,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            LogLevel::Quiet => "",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "quiet" | "none" | "0" => Ok(LogLevel::Quiet),
            "warn" | "1" => Ok(LogLevel::Warn),
            "info" | "2" => Ok(LogLevel::Info),
            "debug" | "3" => Ok(LogLevel::Debug),
            _ => bail!("invalid log level {s:?}, expecting one of quiet|warn|info|debug"),
        }
    }
}

static LOGLEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);

pub fn set_log_level(val: LogLevel) {
    LOGLEVEL.store(val as u8, Ordering::Relaxed);
}

#[inline]
pub fn log_level() -> LogLevel {
    let level = LOGLEVEL.load(Ordering::Relaxed);
    LogLevel::from_level(level).expect("no possibility to store invalid u8")
}

/// Command line options win over `LATENCY_STATS_LOG`, which wins
/// over the default (`Warn`).
pub fn init_log_level(opt: LogLevelOpt) -> Result<()> {
    let level = if opt.is_unset() {
        match std::env::var(LOG_LEVEL_ENV_VAR) {
            Ok(s) => s.parse()?,
            Err(std::env::VarError::NotPresent) => LogLevel::Warn,
            Err(e) => bail!("env var {LOG_LEVEL_ENV_VAR}: {e}"),
        }
    } else {
        opt.try_into()?
    };
    set_log_level(level);
    Ok(())
}
