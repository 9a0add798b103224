// Error types for the step tempo engine
//
// This module defines custom error types for session lifecycle and fixture
// loading, providing structured error handling with stable numeric codes.

mod fixture;
mod session;

pub use fixture::{log_fixture_error, FixtureError, FixtureErrorCodes};
pub use session::{log_session_error, SessionError, SessionErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// process boundaries and log output.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
