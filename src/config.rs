//! Configuration management for the cycle checker
//!
//! Every tunable that the checker relies on lives here: the clip frame rate and
//! timing tolerance, the onset search windows, and the spectral analysis
//! parameters. Values can be overridden from a JSON file so tolerance regimes
//! can be tried without recompilation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CheckError;

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub timing: TimingConfig,
    pub analysis: AnalysisConfig,
    pub batch: BatchConfig,
}

/// Clip timing and onset search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Frame rate the clip filenames are expressed in (frames per second)
    pub frame_rate: f64,
    /// Maximum accepted absolute gap error in milliseconds (inclusive)
    pub tolerance_ms: f64,
    /// Half-width of the search window for the second and third onsets
    pub search_half_width_ms: f64,
    /// Half-width of the search window for the first onset
    pub first_search_half_width_ms: f64,
    /// Initial guess for the first onset (render lead-in)
    pub first_onset_center_ms: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            tolerance_ms: 6.0,
            search_half_width_ms: 150.0,
            first_search_half_width_ms: 250.0,
            first_onset_center_ms: 35.0,
        }
    }
}

/// Spectral analysis parameters for the onset envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Sample rate audio is resampled to before analysis
    pub sample_rate: u32,
    /// STFT window size in samples
    pub n_fft: usize,
    /// STFT hop size in samples (one envelope frame per hop)
    pub hop_length: usize,
    /// Number of mel bands aggregated into the onset strength
    pub n_mels: usize,
    /// Median filter length for harmonic/percussive separation
    pub hpss_kernel_size: usize,
    /// Soft mask exponent for harmonic/percussive separation
    pub hpss_power: f32,
    /// Harmonic weight in the percussive mask (>= 1.0)
    pub hpss_margin: f32,
    /// Dynamic range kept below the loudest mel cell, in dB
    pub top_db: f32,
    /// Moving-average length applied to the onset envelope
    pub smoothing_window: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            n_fft: 2048,
            // One frame (~5.8 ms at 44.1 kHz) stays below the 6 ms tolerance,
            // so frame quantization alone cannot fail a correct clip
            hop_length: 256,
            n_mels: 128,
            hpss_kernel_size: 31,
            hpss_power: 2.0,
            hpss_margin: 1.0,
            top_db: 80.0,
            smoothing_window: 3,
        }
    }
}

impl AnalysisConfig {
    /// Duration of one envelope frame in milliseconds
    pub fn frame_duration_ms(&self) -> f64 {
        self.hop_length as f64 / self.sample_rate as f64 * 1000.0
    }
}

/// What to do with a file whose name does not encode a clip spec
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Stop the whole run (reference behaviour)
    #[default]
    Abort,
    /// Warn and continue with the next file
    Skip,
}

/// Directory layout scanned by the batch driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Root directory holding one subdirectory per clip set
    pub root: PathBuf,
    /// Clip set subdirectory names, checked in this order
    pub sets: Vec<String>,
    pub malformed_policy: MalformedPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets/audio/cycles"),
            sets: vec![
                "piano".to_string(),
                "woodblock".to_string(),
                "tones".to_string(),
            ],
            malformed_policy: MalformedPolicy::Abort,
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    ///
    /// Missing keys take their default value. An unreadable file or invalid
    /// JSON is an error rather than a silent fallback, since the caller asked
    /// for this file explicitly.
    ///
    /// # Errors
    /// `CheckError::InvalidConfig` naming the file and the read or parse failure.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CheckError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| CheckError::InvalidConfig {
            reason: format!("failed to read {}: {}", path.display(), err),
        })?;
        let config = serde_json::from_str(&contents).map_err(|err| CheckError::InvalidConfig {
            reason: format!("failed to parse {}: {}", path.display(), err),
        })?;
        log::info!("[Config] Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Reject values the analysis cannot work with
    pub fn validate(&self) -> Result<(), CheckError> {
        let invalid = |reason: String| Err(CheckError::InvalidConfig { reason });
        let timing = &self.timing;
        let analysis = &self.analysis;

        if !(timing.frame_rate > 0.0) {
            return invalid(format!("frame_rate must be > 0 (got {})", timing.frame_rate));
        }
        if !(timing.tolerance_ms >= 0.0) {
            return invalid(format!(
                "tolerance_ms must be >= 0 (got {})",
                timing.tolerance_ms
            ));
        }
        if !(timing.search_half_width_ms >= 0.0 && timing.first_search_half_width_ms >= 0.0) {
            return invalid("search half-widths must be >= 0".to_string());
        }
        if analysis.sample_rate == 0 {
            return invalid("sample_rate must be > 0".to_string());
        }
        if analysis.n_fft < 2 {
            return invalid(format!("n_fft must be >= 2 (got {})", analysis.n_fft));
        }
        if analysis.hop_length == 0 || analysis.hop_length > analysis.n_fft {
            return invalid(format!(
                "hop_length must be in 1..={} (got {})",
                analysis.n_fft, analysis.hop_length
            ));
        }
        if analysis.n_mels == 0 {
            return invalid("n_mels must be > 0".to_string());
        }
        if analysis.hpss_kernel_size == 0 {
            return invalid("hpss_kernel_size must be > 0".to_string());
        }
        if !(analysis.hpss_power > 0.0) || !(analysis.hpss_margin >= 1.0) {
            return invalid("hpss_power must be > 0 and hpss_margin >= 1".to_string());
        }
        if !(analysis.top_db > 0.0) {
            return invalid("top_db must be > 0".to_string());
        }
        if analysis.smoothing_window == 0 {
            return invalid("smoothing_window must be >= 1".to_string());
        }
        Ok(())
    }
}
