// Mel module - mel filterbank and log-power conversion
//
// Uses the Slaney mel scale (linear below 1 kHz, logarithmic above) with
// area-normalized triangular filters, so each band's weight reflects its
// bandwidth rather than its peak height.

/// One triangular mel filter, stored sparsely from its first non-zero bin
#[derive(Debug, Clone, PartialEq)]
struct MelBand {
    start: usize,
    weights: Vec<f32>,
}

/// Mel filterbank mapping `n_fft / 2 + 1` power bins onto `n_mels` bands
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    bands: Vec<MelBand>,
    n_bins: usize,
}

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert a frequency in Hz to Slaney mels
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert Slaney mels back to Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        mel * F_SP
    }
}

impl MelFilterbank {
    /// Build a filterbank spanning 0 Hz to Nyquist
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize) -> Self {
        let n_bins = n_fft / 2 + 1;
        let nyquist = sample_rate as f64 / 2.0;
        let fft_freqs: Vec<f64> = (0..n_bins)
            .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
            .collect();

        let max_mel = hz_to_mel(nyquist);
        let edges: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(max_mel * i as f64 / (n_mels + 1) as f64))
            .collect();

        let bands = (0..n_mels)
            .map(|m| {
                let (lo, center, hi) = (edges[m], edges[m + 1], edges[m + 2]);
                let enorm = 2.0 / (hi - lo);
                let weights: Vec<f64> = fft_freqs
                    .iter()
                    .map(|&f| {
                        let lower = (f - lo) / (center - lo);
                        let upper = (hi - f) / (hi - center);
                        lower.min(upper).max(0.0) * enorm
                    })
                    .collect();

                let start = weights.iter().position(|&w| w > 0.0).unwrap_or(0);
                let end = weights
                    .iter()
                    .rposition(|&w| w > 0.0)
                    .map_or(start, |last| last + 1);
                MelBand {
                    start,
                    weights: weights[start..end].iter().map(|&w| w as f32).collect(),
                }
            })
            .collect();

        Self { bands, n_bins }
    }

    pub fn n_mels(&self) -> usize {
        self.bands.len()
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Number of bands with at least one non-zero weight
    pub fn active_bands(&self) -> usize {
        self.bands.iter().filter(|b| !b.weights.is_empty()).count()
    }

    /// Project one power spectrum frame onto the mel bands
    pub fn apply(&self, power: &[f32]) -> Vec<f32> {
        self.bands
            .iter()
            .map(|band| {
                band.weights
                    .iter()
                    .zip(power.iter().skip(band.start))
                    .map(|(w, p)| w * p)
                    .sum()
            })
            .collect()
    }
}

/// Convert a power spectrogram to dB in place, keeping `top_db` below its peak
pub fn power_to_db(spec: &mut [Vec<f32>], top_db: f32) {
    const AMIN: f32 = 1e-10;
    let mut peak = f32::NEG_INFINITY;
    for value in spec.iter_mut().flat_map(|frame| frame.iter_mut()) {
        *value = 10.0 * value.max(AMIN).log10();
        peak = peak.max(*value);
    }

    let floor = peak - top_db;
    for value in spec.iter_mut().flat_map(|frame| frame.iter_mut()) {
        *value = value.max(floor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mel_scale_roundtrip_and_breakpoint() {
        assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-9);
        assert!((hz_to_mel(500.0) - 7.5).abs() < 1e-9);
        for hz in [0.0, 440.0, 1000.0, 4000.0, 22050.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 1e-6);
        }
    }

    #[test]
    fn test_filterbank_shape() {
        let bank = MelFilterbank::new(44_100, 2048, 128);
        assert_eq!(bank.n_mels(), 128);
        assert_eq!(bank.n_bins(), 1025);
        assert!(bank.active_bands() > 100);
    }

    #[test]
    fn test_tone_lands_in_one_region() {
        let bank = MelFilterbank::new(16_000, 512, 40);
        let mut power = vec![0.0f32; 257];
        power[64] = 1.0; // 2 kHz
        let bands = bank.apply(&power);
        let loudest = bands
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(m, _)| m)
            .unwrap();
        let center_hz = mel_to_hz(hz_to_mel(8000.0) * (loudest + 1) as f64 / 41.0);
        assert!((center_hz - 2000.0).abs() < 300.0, "center {center_hz}");
        assert_eq!(bands.iter().filter(|&&v| v > 0.0).count(), 2);
    }

    #[test]
    fn test_power_to_db_clips_dynamic_range() {
        let mut spec = vec![vec![1.0, 1e-3], vec![0.0, 1e-12]];
        power_to_db(&mut spec, 20.0);
        assert_eq!(spec[0][0], 0.0);
        assert!((spec[0][1] + 20.0).abs() < 1e-4);
        assert!((spec[1][0] + 20.0).abs() < 1e-4);
        assert!((spec[1][1] + 20.0).abs() < 1e-4);
    }
}
