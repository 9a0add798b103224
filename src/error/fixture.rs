// Fixture loading error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Fixture error code constants
///
/// Error code range: 2101-2103
pub struct FixtureErrorCodes {}

impl FixtureErrorCodes {
    /// Fixture file could not be read
    pub const FILE_UNREADABLE: i32 = 2101;

    /// Fixture file has an unsupported audio format
    pub const UNSUPPORTED_FORMAT: i32 = 2102;

    /// Fixture specification failed validation
    pub const INVALID_SPEC: i32 = 2103;
}

/// Log a fixture error with structured context
pub fn log_fixture_error(err: &FixtureError, context: &str) {
    error!(
        "Fixture error in {}: code={}, component=Fixtures, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Fixture loading and validation errors
///
/// These errors cover WAV file ingestion and fixture spec validation
/// used by the offline analysis tooling.
///
/// Error code range: 2101-2103
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureError {
    /// Fixture file could not be read from disk
    FileUnreadable { reason: String },

    /// Audio file uses a sample format the loader does not handle
    UnsupportedFormat { reason: String },

    /// Fixture specification contains invalid parameters
    InvalidSpec { reason: String },
}

impl ErrorCode for FixtureError {
    fn code(&self) -> i32 {
        match self {
            FixtureError::FileUnreadable { .. } => FixtureErrorCodes::FILE_UNREADABLE,
            FixtureError::UnsupportedFormat { .. } => FixtureErrorCodes::UNSUPPORTED_FORMAT,
            FixtureError::InvalidSpec { .. } => FixtureErrorCodes::INVALID_SPEC,
        }
    }

    fn message(&self) -> String {
        match self {
            FixtureError::FileUnreadable { reason } => {
                format!("Failed to read fixture file: {}", reason)
            }
            FixtureError::UnsupportedFormat { reason } => {
                format!("Unsupported audio format: {}", reason)
            }
            FixtureError::InvalidSpec { reason } => {
                format!("Invalid fixture spec: {}", reason)
            }
        }
    }
}

impl fmt::Display for FixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FixtureError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for FixtureError {}

impl From<std::io::Error> for FixtureError {
    fn from(err: std::io::Error) -> Self {
        FixtureError::FileUnreadable {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_error_codes() {
        assert_eq!(
            FixtureError::FileUnreadable {
                reason: "test".to_string()
            }
            .code(),
            FixtureErrorCodes::FILE_UNREADABLE
        );
        assert_eq!(
            FixtureError::UnsupportedFormat {
                reason: "test".to_string()
            }
            .code(),
            FixtureErrorCodes::UNSUPPORTED_FORMAT
        );
        assert_eq!(
            FixtureError::InvalidSpec {
                reason: "test".to_string()
            }
            .code(),
            FixtureErrorCodes::INVALID_SPEC
        );
    }

    #[test]
    fn test_fixture_error_messages() {
        let err = FixtureError::FileUnreadable {
            reason: "no such file".to_string(),
        };
        assert_eq!(err.message(), "Failed to read fixture file: no such file");

        let err = FixtureError::UnsupportedFormat {
            reason: "8-bit PCM".to_string(),
        };
        assert!(err.message().contains("8-bit PCM"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::other("test io error");
        let fixture_err: FixtureError = io_err.into();
        match fixture_err {
            FixtureError::FileUnreadable { reason } => {
                assert!(reason.contains("test io error"));
            }
            _ => panic!("Expected FileUnreadable"),
        }
    }
}
