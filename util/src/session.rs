//! Run sessions
//!
//! Every executable run gets its own directory under `$ARM_SW_ROOT/sessions`, holding the log
//! file and any records a module chooses to keep (for example the parameters the planner ran
//! with). The first session created fixes the epoch all log timestamps are measured from.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Directory name suffix, `20210314_153000` style.
const DIR_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Directory and log file of the current run.
#[derive(Clone, Debug)]
pub struct Session {
    /// `$ARM_SW_ROOT/<sessions_dir>/<exec_name>_<timestamp>`
    pub session_root: PathBuf,

    /// `<session_root>/<exec_name>.log`
    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (ARM_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error("A session has already been started in this process ({0})")]
    AlreadyStarted(conquer_once::TryInitError),

    #[error("The session epoch is not set")]
    NoEpoch,

    #[error("Cannot serialize the {0} record: {1}")]
    RecordSerializeError(String, serde_json::Error),

    #[error("Cannot write the {0} record: {1}")]
    RecordWriteError(String, std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start the session for `exec_name`, creating its directory inside
    /// `$ARM_SW_ROOT/<sessions_dir>`.
    ///
    /// Only one session may be started per process.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        SESSION_EPOCH
            .try_init_once(Utc::now)
            .map_err(SessionError::AlreadyStarted)?;

        let timestamp = SESSION_EPOCH
            .get()
            .ok_or(SessionError::NoEpoch)?
            .format(DIR_TIMESTAMP_FORMAT);

        let mut session_root =
            crate::host::get_arm_sw_root().map_err(|_| SessionError::SwRootNotSet)?;
        session_root.push(sessions_dir);
        session_root.push(format!("{}_{}", exec_name, timestamp));

        fs::create_dir_all(&session_root).map_err(SessionError::CannotCreateDir)?;

        let log_file_path = session_root.join(format!("{}.log", exec_name));

        Ok(Session {
            session_root,
            log_file_path,
        })
    }

    /// Keep a copy of `record` as pretty JSON in `<session_root>/<name>.json`.
    ///
    /// Returns the path written to.
    pub fn save_record<T: Serialize>(&self, name: &str, record: &T) -> Result<PathBuf, SessionError> {
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| SessionError::RecordSerializeError(name.into(), e))?;

        let path = self.session_root.join(format!("{}.json", name));
        fs::write(&path, json).map_err(|e| SessionError::RecordWriteError(name.into(), e))?;

        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Seconds since the session started, `NAN` before any session exists.
pub fn get_elapsed_seconds() -> f64 {
    SESSION_EPOCH
        .get()
        .and_then(|e| (Utc::now() - *e).num_microseconds())
        .map(|us| us as f64 * 1e-6)
        .unwrap_or(std::f64::NAN)
}

/// Return the session's epoch, or `None` if no session has been started.
pub fn get_epoch() -> Option<&'static DateTime<Utc>> {
    SESSION_EPOCH.get()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_save_record() {
        let dir = std::env::temp_dir().join(format!("arm_session_test_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let session = Session {
            session_root: dir.clone(),
            log_file_path: dir.join("test.log"),
        };

        let path = session.save_record("joints", &[90.0, 0.0, 0.0]).unwrap();
        let read: Vec<f64> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read, vec![90.0, 0.0, 0.0]);

        fs::remove_dir_all(&dir).unwrap();
    }
}
