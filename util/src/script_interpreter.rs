//! # Arm command script interpreter module
//!
//! This module provides an interpreter for arm command scripts, allowing requests to be issued at
//! fixed times without a remote command source.
//!
//! A script is a list of `<time_s>: <request JSON>;` entries, for example:
//!
//! ```text
//! 0.5: {"command": "wave"};
//! 2.0: {"command": "", "target": {"point": {"x": 0.0, "y": 2.0, "z": 25.0, "unit": "cm"}}};
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use comms_if::cmd::ArmRequest;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A request which is scripted to occur at a specific time.
#[derive(Debug)]
struct ScriptedRequest {
    /// The time the request is supposed to execute at
    exec_time_s: f64,

    /// The request to issue
    request: ArmRequest,
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.get_pending` to
/// acquire a list of requests that need executing.
#[derive(Debug)]
pub struct ScriptInterpreter {
    script_path: PathBuf,
    requests: VecDeque<ScriptedRequest>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)"
    )]
    InvalidTimestamp(String),

    #[error("Script contains an invalid request at {0} s: {1}")]
    InvalidRequest(f64, serde_json::Error),
}

#[derive(Debug)]
pub enum PendingRequests {
    None,
    Some(Vec<ArmRequest>),
    EndOfScript,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        // Get the path in a buffer
        let path = PathBuf::from(script_path.as_ref());

        // Check that the script file exists.
        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path.display().to_string()));
        }

        // Load the script into a string
        let script = fs::read_to_string(&path).map_err(ScriptError::ScriptLoadError)?;

        let requests = Self::parse(&script)?;

        Ok(ScriptInterpreter {
            script_path: path,
            requests,
        })
    }

    /// Return the requests due at `current_time_s`, removing them from the script.
    pub fn get_pending(&mut self, current_time_s: f64) -> PendingRequests {
        // If the queue is empty the script is over and we return the end of
        // script variant
        if self.requests.is_empty() {
            return PendingRequests::EndOfScript;
        }

        let mut pending = vec![];

        // Pop requests from the head of the queue for as long as their exec time has passed
        while let Some(r) = self.requests.front() {
            if r.exec_time_s > current_time_s {
                break;
            }
            if let Some(r) = self.requests.pop_front() {
                pending.push(r.request);
            }
        }

        if pending.is_empty() {
            PendingRequests::None
        } else {
            PendingRequests::Some(pending)
        }
    }

    /// Path the script was loaded from
    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Get the number of requests remaining in the script
    pub fn get_num_requests(&self) -> usize {
        self.requests.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.requests.back() {
            Some(c) => c.exec_time_s,
            None => 0f64,
        }
    }

    /// Parse the script text into a time-ordered queue of requests.
    fn parse(script: &str) -> Result<VecDeque<ScriptedRequest>, ScriptError> {
        let re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .map_err(|e| ScriptError::InvalidTimestamp(e.to_string()))?;

        let mut requests = vec![];

        for cap in re.captures_iter(script) {
            let time_str = cap.get(1).map(|m| m.as_str()).unwrap_or("");
            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{} ({})", time_str, e)))?;

            let payload = cap.get(3).map(|m| m.as_str()).unwrap_or("");
            let request = serde_json::from_str(payload)
                .map_err(|e| ScriptError::InvalidRequest(exec_time_s, e))?;

            requests.push(ScriptedRequest {
                exec_time_s,
                request,
            });
        }

        if requests.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        // Scripts are not required to be written in order
        requests.sort_by(|a, b| {
            a.exec_time_s
                .partial_cmp(&b.exec_time_s)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(requests.into())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::cmd::Unit;

    const SCRIPT: &str = r#"
        2.0: {"command": "", "target": {"point": {"x": 0.0, "y": 2.0, "z": 25.0, "unit": "cm"}}};
        0.5: {"command": "wave"};
        2.0: {"command": "grab"};
    "#;

    #[test]
    fn test_parse_and_pending() {
        let mut si = ScriptInterpreter {
            script_path: PathBuf::new(),
            requests: ScriptInterpreter::parse(SCRIPT).unwrap(),
        };

        assert_eq!(si.get_num_requests(), 3);
        assert_eq!(si.get_duration(), 2.0);

        assert!(matches!(si.get_pending(0.1), PendingRequests::None));

        match si.get_pending(0.5) {
            PendingRequests::Some(r) => assert_eq!(r, vec![ArmRequest::gesture("wave")]),
            p => panic!("Expected one pending request, got {:?}", p),
        }

        match si.get_pending(3.0) {
            PendingRequests::Some(r) => {
                assert_eq!(r.len(), 2);
                assert_eq!(r[0], ArmRequest::point("", 0.0, 2.0, 25.0, Unit::Cm));
            }
            p => panic!("Expected two pending requests, got {:?}", p),
        }

        assert!(matches!(si.get_pending(4.0), PendingRequests::EndOfScript));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("arm_script_test_{}.arm", std::process::id()));
        fs::write(&path, SCRIPT).unwrap();

        let si = ScriptInterpreter::new(&path).unwrap();
        assert_eq!(si.script_path(), path.as_path());
        assert_eq!(si.get_num_requests(), 3);

        fs::remove_file(&path).unwrap();

        assert!(matches!(
            ScriptInterpreter::new(&path),
            Err(ScriptError::ScriptNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_scripts() {
        assert!(matches!(
            ScriptInterpreter::parse("nothing to see here"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::parse("1.0: {\"command\": 5};"),
            Err(ScriptError::InvalidRequest(t, _)) if t == 1.0
        ));
        assert!(matches!(
            ScriptInterpreter::new("/definitely/not/a/script.arm"),
            Err(ScriptError::ScriptNotFound(_))
        ));
    }
}
