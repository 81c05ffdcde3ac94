// EnvelopeExtractor - percussive onset-strength curve
//
// Algorithm:
// 1. Separate harmonic and percussive components (median-filter HPSS) and keep
//    only the percussive signal, so sustained tones and decays do not blur the
//    attack edge
// 2. STFT of the percussive signal -> power -> mel bands -> dB
// 3. Spectral flux: positive dB difference to the previous frame, averaged
//    over mel bands
// 4. Shift the flux so frame i lines up with time i * hop / sample_rate
// 5. Length-3 moving average to steady local maxima

use crate::analysis::features::{power_to_db, HpssSeparator, MelFilterbank, Stft};
use crate::config::AnalysisConfig;
use crate::error::CheckError;

/// Onset strength values with their frame times in milliseconds
///
/// Never empty; `values` and `times_ms` have equal length and `times_ms` is
/// non-decreasing.
#[derive(Debug, Clone, PartialEq)]
pub struct OnsetEnvelope {
    values: Vec<f32>,
    times_ms: Vec<f64>,
}

impl OnsetEnvelope {
    /// Pair values with times; `None` if empty, mismatched or out of order
    pub fn new(values: Vec<f32>, times_ms: Vec<f64>) -> Option<Self> {
        if values.is_empty() || values.len() != times_ms.len() {
            return None;
        }
        if times_ms.windows(2).any(|pair| !(pair[0] <= pair[1])) {
            return None;
        }
        Some(Self { values, times_ms })
    }

    /// Envelope sampled every `frame_ms` starting at 0 ms
    pub fn uniform(values: Vec<f32>, frame_ms: f64) -> Option<Self> {
        let times_ms = (0..values.len()).map(|i| i as f64 * frame_ms).collect();
        Self::new(values, times_ms)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn times_ms(&self) -> &[f64] {
        &self.times_ms
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Turns mono samples into an [`OnsetEnvelope`]
pub struct EnvelopeExtractor {
    config: AnalysisConfig,
    stft: Stft,
    hpss: HpssSeparator,
    mel: MelFilterbank,
}

impl EnvelopeExtractor {
    /// Create an extractor for samples at `config.sample_rate`
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            stft: Stft::new(config.n_fft, config.hop_length),
            hpss: HpssSeparator::new(
                config.hpss_kernel_size,
                config.hpss_power,
                config.hpss_margin,
            ),
            mel: MelFilterbank::new(config.sample_rate, config.n_fft, config.n_mels),
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Compute the smoothed percussive onset envelope of `samples`
    ///
    /// # Errors
    /// `CheckError::AnalysisFailed` for empty input or non-finite samples.
    pub fn extract(&self, samples: &[f32]) -> Result<OnsetEnvelope, CheckError> {
        if samples.is_empty() {
            return Err(CheckError::AnalysisFailed {
                reason: "no samples to analyze".to_string(),
            });
        }
        if let Some(idx) = samples.iter().position(|s| !s.is_finite()) {
            return Err(CheckError::AnalysisFailed {
                reason: format!("non-finite sample at index {}", idx),
            });
        }

        let percussive = self.hpss.percussive(&self.stft, samples);
        let strength = self.onset_strength(&percussive);
        let kernel = vec![1.0 / self.config.smoothing_window as f32; self.config.smoothing_window];
        let smoothed = convolve_same(&strength, &kernel);

        tracing::debug!(
            "[Envelope] {} samples -> {} frames ({:.2} ms/frame)",
            samples.len(),
            smoothed.len(),
            self.config.frame_duration_ms()
        );

        OnsetEnvelope::uniform(smoothed, self.config.frame_duration_ms()).ok_or_else(|| {
            CheckError::AnalysisFailed {
                reason: "onset envelope has no frames".to_string(),
            }
        })
    }

    /// Mean positive log-mel flux per frame, aligned to frame times
    fn onset_strength(&self, signal: &[f32]) -> Vec<f32> {
        let spectrogram = self.stft.forward(signal);
        let mut mel: Vec<Vec<f32>> = spectrogram
            .power()
            .iter()
            .map(|frame| self.mel.apply(frame))
            .collect();
        power_to_db(&mut mel, self.config.top_db);

        // Lag of one frame plus the half-window the centered STFT looks ahead
        let shift = 1 + self.config.n_fft / (2 * self.config.hop_length);
        let n_frames = mel.len();
        let n_mels = self.mel.n_mels() as f32;
        let mut strength = vec![0.0f32; n_frames];

        for t in 1..n_frames {
            let target = t - 1 + shift;
            if target >= n_frames {
                break;
            }
            let flux: f32 = mel[t]
                .iter()
                .zip(mel[t - 1].iter())
                .map(|(curr, prev)| (curr - prev).max(0.0))
                .sum();
            strength[target] = flux / n_mels;
        }

        strength
    }
}

/// Discrete convolution trimmed to the input length, zero beyond the edges
///
/// Matches the centered "same" mode: output `i` is aligned with the kernel's
/// middle tap (the left-of-middle tap for even kernels).
pub fn convolve_same(signal: &[f32], kernel: &[f32]) -> Vec<f32> {
    let n = signal.len() as isize;
    let offset = ((kernel.len() as isize) - 1) / 2;
    (0..n)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(j, &k)| {
                    let idx = i + offset - j as isize;
                    (0..n).contains(&idx).then(|| signal[idx as usize] * k)
                })
                .sum()
        })
        .collect()
}
