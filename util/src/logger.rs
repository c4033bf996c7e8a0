//! Logging setup for the pick-and-place executables
//!
//! Two outputs are configured. The terminal gets a compact coloured record stamped with the
//! session time and never shows anything finer than debug, so per-waypoint traces don't swamp an
//! operator watching a run. The session log file gets every record down to `min_level`, without
//! colour codes, stamped with both wall clock and session time and always naming the target module.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::Local;
use colored::{ColoredString, Colorize};
use log::{info, Level};
use thiserror::Error;

use crate::session;

pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Most verbose level shown in the terminal.
const TERMINAL_MAX_LEVEL: LevelFilter = LevelFilter::Debug;

/// Wall clock stamp of records in the log file.
const FILE_TIME_FORMAT: &str = "%H:%M:%S%.3f";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level at least as verbose as `INFO`, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `min_level` must be at least as verbose as `Info`, so phase transitions and simulated object
/// cleanup are always recorded. Must only be called once.
pub fn logger_init(min_level: LevelFilter, session: &session::Session) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file = fern::log_file(session.log_file_path.clone())
        .map_err(LoggerInitError::LogFileInitError)?;

    let terminal = fern::Dispatch::new()
        .level(min_level.min(TERMINAL_MAX_LEVEL))
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{:9.3} {}] {}",
                session::get_elapsed_seconds(),
                level_tag(record.level()),
                message
            ))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{:10.6} {:<5}] {}: {}",
                Local::now().format(FILE_TIME_FORMAT),
                session::get_elapsed_seconds(),
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(log_file);

    fern::Dispatch::new()
        .level(min_level)
        .level_for("zmq", LevelFilter::Info)
        .chain(terminal)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised at {:?}", min_level);
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log file: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info => "INF".normal(),
        Level::Warn => "WRN".yellow(),
        Level::Error => "ERR".red().bold(),
    }
}
