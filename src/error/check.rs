// Check error types and constants

use crate::error::ErrorCode;
use std::fmt;
use std::path::PathBuf;
use tracing::error;

/// Check error code constants
///
/// Single source of truth for the numeric codes reported by the CLI.
///
/// Error code range: 3001-3007
pub struct CheckErrorCodes {}

impl CheckErrorCodes {
    /// Analysis stack failed the startup capability check
    pub const DEPENDENCY_UNAVAILABLE: i32 = 3001;

    /// Filename does not encode a `_<beat>_<decay>.wav` clip spec
    pub const MALFORMED_INPUT: i32 = 3002;

    /// WAV file could not be opened or decoded
    pub const AUDIO_LOAD: i32 = 3003;

    /// Decoded audio contains no samples
    pub const EMPTY_AUDIO: i32 = 3004;

    /// Configuration values are out of range
    pub const INVALID_CONFIG: i32 = 3005;

    /// Onset envelope could not be computed from the samples
    pub const ANALYSIS_FAILED: i32 = 3006;

    /// Clip directory could not be listed
    pub const DIRECTORY_READ: i32 = 3007;
}

/// Log a check error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_check_error(err: &CheckError, context: &str) {
    error!(
        "Check error in {}: code={}, component=CycleCheck, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while verifying clip onset timing
///
/// Tolerance violations are not errors: they are reported through a failing
/// `ToleranceVerdict` and never abort a run.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckError {
    /// Analysis stack is unusable; nothing can be checked
    DependencyUnavailable { details: String },

    /// Filename does not carry a valid clip spec
    MalformedInput { path: PathBuf },

    /// Audio file could not be read
    AudioLoad { path: PathBuf, reason: String },

    /// Audio file decoded to zero samples
    EmptyAudio { path: PathBuf },

    /// Configuration rejected by validation
    InvalidConfig { reason: String },

    /// Samples cannot be turned into an onset envelope
    AnalysisFailed { reason: String },

    /// Clip directory listing failed
    DirectoryRead { path: PathBuf, reason: String },
}

impl CheckError {
    /// Whether a batch may continue past this error under the skip policy
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, CheckError::MalformedInput { .. })
    }
}

impl ErrorCode for CheckError {
    fn code(&self) -> i32 {
        match self {
            CheckError::DependencyUnavailable { .. } => CheckErrorCodes::DEPENDENCY_UNAVAILABLE,
            CheckError::MalformedInput { .. } => CheckErrorCodes::MALFORMED_INPUT,
            CheckError::AudioLoad { .. } => CheckErrorCodes::AUDIO_LOAD,
            CheckError::EmptyAudio { .. } => CheckErrorCodes::EMPTY_AUDIO,
            CheckError::InvalidConfig { .. } => CheckErrorCodes::INVALID_CONFIG,
            CheckError::AnalysisFailed { .. } => CheckErrorCodes::ANALYSIS_FAILED,
            CheckError::DirectoryRead { .. } => CheckErrorCodes::DIRECTORY_READ,
        }
    }

    fn message(&self) -> String {
        match self {
            CheckError::DependencyUnavailable { details } => format!(
                "Audio analysis stack unavailable: {}. Rebuild with `cargo build --release` \
                 and check the analysis settings in the config file.",
                details
            ),
            CheckError::MalformedInput { path } => {
                format!("Unrecognized filename: {}", path.display())
            }
            CheckError::AudioLoad { path, reason } => {
                format!("Failed to load {}: {}", path.display(), reason)
            }
            CheckError::EmptyAudio { path } => {
                format!("No audio samples in {}", path.display())
            }
            CheckError::InvalidConfig { reason } => format!("Invalid configuration: {}", reason),
            CheckError::AnalysisFailed { reason } => format!("Onset analysis failed: {}", reason),
            CheckError::DirectoryRead { path, reason } => {
                format!("Failed to list {}: {}", path.display(), reason)
            }
        }
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CheckError::{} (code {}): {}",
            self.variant_name(),
            self.code(),
            self.message()
        )
    }
}

impl CheckError {
    fn variant_name(&self) -> &'static str {
        match self {
            CheckError::DependencyUnavailable { .. } => "DependencyUnavailable",
            CheckError::MalformedInput { .. } => "MalformedInput",
            CheckError::AudioLoad { .. } => "AudioLoad",
            CheckError::EmptyAudio { .. } => "EmptyAudio",
            CheckError::InvalidConfig { .. } => "InvalidConfig",
            CheckError::AnalysisFailed { .. } => "AnalysisFailed",
            CheckError::DirectoryRead { .. } => "DirectoryRead",
        }
    }
}

impl std::error::Error for CheckError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_error_codes() {
        assert_eq!(
            CheckError::DependencyUnavailable {
                details: "test".to_string()
            }
            .code(),
            3001
        );
        assert_eq!(
            CheckError::MalformedInput {
                path: PathBuf::from("clip.wav")
            }
            .code(),
            3002
        );
        assert_eq!(
            CheckError::AudioLoad {
                path: PathBuf::from("clip_1_2.wav"),
                reason: "test".to_string()
            }
            .code(),
            3003
        );
        assert_eq!(
            CheckError::EmptyAudio {
                path: PathBuf::from("clip_1_2.wav")
            }
            .code(),
            3004
        );
        assert_eq!(
            CheckError::InvalidConfig {
                reason: "test".to_string()
            }
            .code(),
            3005
        );
        assert_eq!(
            CheckError::AnalysisFailed {
                reason: "test".to_string()
            }
            .code(),
            3006
        );
        assert_eq!(
            CheckError::DirectoryRead {
                path: PathBuf::from("tones"),
                reason: "test".to_string()
            }
            .code(),
            3007
        );
    }

    #[test]
    fn test_malformed_message_names_file() {
        let err = CheckError::MalformedInput {
            path: PathBuf::from("tones/clip.wav"),
        };
        assert!(err.message().contains("Unrecognized filename"));
        assert!(err.message().contains("clip.wav"));
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_dependency_message_has_remediation() {
        let err = CheckError::DependencyUnavailable {
            details: "fft produced NaN".to_string(),
        };
        let text = err.to_string();
        assert!(text.starts_with("CheckError::DependencyUnavailable (code 3001)"));
        assert!(text.contains("cargo build"));
        assert!(!err.is_malformed_input());
    }

    #[test]
    fn test_error_code_trait() {
        let err: &dyn ErrorCode = &CheckError::EmptyAudio {
            path: PathBuf::from("x_1_1.wav"),
        };
        assert_eq!(err.code(), CheckErrorCodes::EMPTY_AUDIO);
    }
}
