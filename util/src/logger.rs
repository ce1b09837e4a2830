//! Logger setup
//!
//! All executables log through the `log` macros. Records are written to stdout and to the
//! session's log file, prefixed with the seconds elapsed since the session epoch:
//!
//! ```text
//! [  1.204518 INF] Arrived at target after 6 steps (0.0042 m away)
//! [  1.204733 DBG] arm_lib::dispatch: Sending Pose { .. }
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use colored::{ColoredString, Colorize};
use log::{info, Level};
use thiserror::Error;

use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("The minimum log level must be INFO or more verbose, found {0}")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Cannot open the session log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger has already been set: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise logging for this run.
///
/// `min_level` must be `Info` or more verbose so the startup header lands in every session log.
/// Must only be called once per process.
pub fn logger_init(
    min_level: LevelFilter,
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file =
        fern::log_file(&session.log_file_path).map_err(LoggerInitError::LogFileInitError)?;

    fern::Dispatch::new()
        .format(|out, message, record| {
            let stamp = format!(
                "[{:10.6} {}]",
                session::get_elapsed_seconds(),
                level_tag(record.level())
            );

            // Debug and trace records name the module they came from
            match record.level() {
                Level::Debug | Level::Trace => {
                    out.finish(format_args!("{} {}: {}", stamp, record.target(), message))
                }
                _ => out.finish(format_args!("{} {}", stamp, message)),
            }
        })
        .level(min_level)
        // zmq's own logging is noise at debug level
        .level_for("zmq", LevelFilter::Info)
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {:?}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

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
