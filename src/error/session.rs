// Session lifecycle error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Session error code constants
///
/// These constants provide a single source of truth for error codes
/// shared between the library and its callers.
///
/// Error code range: 2001-2002
pub struct SessionErrorCodes {}

impl SessionErrorCodes {
    /// Session is already running
    pub const ALREADY_RUNNING: i32 = 2001;

    /// Session is not running
    pub const NOT_RUNNING: i32 = 2002;
}

/// Log a session error with structured context
///
/// Logs session errors with the numeric error code alongside the
/// component and call site for programmatic filtering.
pub fn log_session_error(err: &SessionError, context: &str) {
    error!(
        "Session error in {}: code={}, component=TrackSession, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Session lifecycle errors
///
/// These errors cover track session start/stop transitions. Reset is
/// deliberately infallible and never produces one of these.
///
/// Error code range: 2001-2002
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Session is already running
    AlreadyRunning,

    /// Session is not running
    NotRunning,
}

impl ErrorCode for SessionError {
    fn code(&self) -> i32 {
        match self {
            SessionError::AlreadyRunning => SessionErrorCodes::ALREADY_RUNNING,
            SessionError::NotRunning => SessionErrorCodes::NOT_RUNNING,
        }
    }

    fn message(&self) -> String {
        match self {
            SessionError::AlreadyRunning => {
                "Session already running. Call stop() first.".to_string()
            }
            SessionError::NotRunning => "Session not running. Call start() first.".to_string(),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SessionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SessionError {}
