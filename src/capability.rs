// Startup capability check
//
// Runs once before any clip is touched. Validates the configuration, then
// exercises the FFT plan and mel filterbank on a known input so a broken
// analysis stack fails fast with remediation text instead of producing
// garbage onsets.

use rustfft::num_complex::Complex;

use crate::analysis::features::{MelFilterbank, Stft};
use crate::config::AppConfig;
use crate::error::CheckError;

/// Facts about the analysis stack gathered by [`verify`]
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityReport {
    pub n_fft: usize,
    pub hop_length: usize,
    pub sample_rate: u32,
    pub mel_bands: usize,
    pub frame_duration_ms: f64,
}

/// Check that the configured analysis stack can run
///
/// # Errors
/// `CheckError::InvalidConfig` when the configuration fails validation,
/// `CheckError::DependencyUnavailable` when the FFT or mel stage misbehaves.
pub fn verify(config: &AppConfig) -> Result<CapabilityReport, CheckError> {
    config.validate()?;
    let analysis = &config.analysis;
    let stft = Stft::new(analysis.n_fft, analysis.hop_length);

    // Frame 0 is centered on sample 0, where the Hann weight is exactly one,
    // so a unit impulse there gives a flat magnitude-one spectrum.
    let mut impulse = vec![0.0f32; analysis.n_fft];
    impulse[0] = 1.0;
    let spectrogram = stft.forward(&impulse);
    let frame = spectrogram
        .frames
        .first()
        .ok_or_else(|| unavailable("FFT produced no frames for a one-window input"))?;
    check_flat_spectrum(frame)?;

    let restored = stft.inverse(&spectrogram, impulse.len());
    let round_trip_error = impulse
        .iter()
        .zip(restored.iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    if !(round_trip_error < 1e-3) {
        return Err(unavailable(&format!(
            "inverse FFT round trip error {round_trip_error} exceeds 1e-3"
        )));
    }

    let mel = MelFilterbank::new(analysis.sample_rate, analysis.n_fft, analysis.n_mels);
    if mel.active_bands() == 0 {
        return Err(unavailable("mel filterbank has no active bands"));
    }

    let report = CapabilityReport {
        n_fft: analysis.n_fft,
        hop_length: analysis.hop_length,
        sample_rate: analysis.sample_rate,
        mel_bands: mel.active_bands(),
        frame_duration_ms: analysis.frame_duration_ms(),
    };
    tracing::debug!(
        "[Capability] n_fft={} hop={} mel_bands={} frame={:.2} ms",
        report.n_fft,
        report.hop_length,
        report.mel_bands,
        report.frame_duration_ms
    );
    Ok(report)
}

/// Every bin must be finite with magnitude one
fn check_flat_spectrum(frame: &[Complex<f32>]) -> Result<(), CheckError> {
    for (bin, value) in frame.iter().enumerate() {
        let magnitude = value.norm();
        if !magnitude.is_finite() {
            return Err(unavailable(&format!("FFT bin {bin} is not finite")));
        }
        if (magnitude - 1.0).abs() > 1e-3 {
            return Err(unavailable(&format!(
                "FFT bin {bin} has magnitude {magnitude}, expected 1"
            )));
        }
    }
    Ok(())
}

fn unavailable(details: &str) -> CheckError {
    CheckError::DependencyUnavailable {
        details: details.to_string(),
    }
}
