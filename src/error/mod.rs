// Error types for the cycle checker
//
// This module defines the typed error taxonomy used by the library. Each error
// carries a stable numeric code so the CLI can report failures consistently.

mod check;

pub use check::{log_check_error, CheckError, CheckErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
