// FFT module - short-time Fourier transform and its inverse
//
// Frames are centered: the signal is zero-padded by n_fft / 2 on both sides so
// frame t is centered on sample t * hop. Only the non-negative frequency bins
// (n_fft / 2 + 1) are kept; the inverse rebuilds the conjugate half.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Frame-major complex spectrogram: `frames[t][k]`
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    pub frames: Vec<Vec<Complex<f32>>>,
    pub n_bins: usize,
}

impl Spectrogram {
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    /// Magnitude of every cell, same layout as `frames`
    pub fn magnitudes(&self) -> Vec<Vec<f32>> {
        self.frames
            .iter()
            .map(|frame| frame.iter().map(|c| c.norm()).collect())
            .collect()
    }

    /// Squared magnitude of every cell, same layout as `frames`
    pub fn power(&self) -> Vec<Vec<f32>> {
        self.frames
            .iter()
            .map(|frame| frame.iter().map(|c| c.norm_sqr()).collect())
            .collect()
    }
}

/// STFT processor with pre-planned forward and inverse transforms
pub struct Stft {
    n_fft: usize,
    hop_length: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    /// Periodic Hann window (pre-computed)
    window: Vec<f32>,
}

impl Stft {
    /// Create a new STFT processor
    ///
    /// # Arguments
    /// * `n_fft` - Window and FFT size in samples
    /// * `hop_length` - Distance between frame centers in samples
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(n_fft);
        let inverse = planner.plan_fft_inverse(n_fft);

        Self {
            n_fft,
            hop_length: hop_length.max(1),
            forward,
            inverse,
            window: periodic_hann(n_fft),
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of frames produced for a signal of `len` samples
    pub fn frame_count(&self, len: usize) -> usize {
        let padded = len + 2 * (self.n_fft / 2);
        if padded < self.n_fft {
            return 0;
        }
        1 + (padded - self.n_fft) / self.hop_length
    }

    /// Forward transform of a whole signal
    pub fn forward(&self, signal: &[f32]) -> Spectrogram {
        let pad = self.n_fft / 2;
        let mut padded = vec![0.0f32; signal.len() + 2 * pad];
        padded[pad..pad + signal.len()].copy_from_slice(signal);

        let n_bins = self.n_bins();
        let mut scratch = vec![Complex::new(0.0, 0.0); self.forward.get_inplace_scratch_len()];
        let frames = (0..self.frame_count(signal.len()))
            .map(|t| {
                let start = t * self.hop_length;
                let mut buffer: Vec<Complex<f32>> = padded[start..start + self.n_fft]
                    .iter()
                    .zip(self.window.iter())
                    .map(|(sample, w)| Complex::new(sample * w, 0.0))
                    .collect();
                self.forward.process_with_scratch(&mut buffer, &mut scratch);
                buffer.truncate(n_bins);
                buffer
            })
            .collect();

        Spectrogram { frames, n_bins }
    }

    /// Inverse transform by windowed overlap-add
    ///
    /// The output is normalized by the summed squared window and trimmed to
    /// `length` samples, so `inverse(forward(x), x.len())` reconstructs `x`.
    pub fn inverse(&self, spectrogram: &Spectrogram, length: usize) -> Vec<f32> {
        let n_frames = spectrogram.n_frames();
        if n_frames == 0 {
            return vec![0.0; length];
        }

        let total = self.n_fft + self.hop_length * (n_frames - 1);
        let mut output = vec![0.0f32; total];
        let mut window_sum = vec![0.0f32; total];
        let mut scratch = vec![Complex::new(0.0, 0.0); self.inverse.get_inplace_scratch_len()];
        let scale = 1.0 / self.n_fft as f32;

        for (t, frame) in spectrogram.frames.iter().enumerate() {
            let mut buffer = self.hermitian_buffer(frame);
            self.inverse.process_with_scratch(&mut buffer, &mut scratch);

            let start = t * self.hop_length;
            for (i, (value, w)) in buffer.iter().zip(self.window.iter()).enumerate() {
                output[start + i] += value.re * scale * w;
                window_sum[start + i] += w * w;
            }
        }

        for (sample, &sum) in output.iter_mut().zip(window_sum.iter()) {
            if sum > f32::MIN_POSITIVE {
                *sample /= sum;
            }
        }

        let pad = self.n_fft / 2;
        let mut trimmed: Vec<f32> = output.into_iter().skip(pad).take(length).collect();
        trimmed.resize(length, 0.0);
        trimmed
    }

    /// Rebuild the full spectrum of a real signal from its non-negative bins
    fn hermitian_buffer(&self, half: &[Complex<f32>]) -> Vec<Complex<f32>> {
        let mut buffer = vec![Complex::new(0.0, 0.0); self.n_fft];
        let n_bins = self.n_bins().min(half.len());
        buffer[..n_bins].copy_from_slice(&half[..n_bins]);

        // DC and Nyquist carry no phase for a real signal
        buffer[0].im = 0.0;
        if self.n_fft % 2 == 0 && n_bins == self.n_bins() {
            buffer[self.n_fft / 2].im = 0.0;
        }

        for k in 1..n_bins {
            let mirror = self.n_fft - k;
            if mirror >= n_bins {
                buffer[mirror] = half[k].conj();
            }
        }
        buffer
    }
}

/// Periodic Hann window of length `n`
///
/// Periodic (denominator `n`, not `n - 1`) so overlapping windows sum to a
/// constant, which the overlap-add inverse relies on.
pub fn periodic_hann(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 * (1.0 - ((2.0 * std::f32::consts::PI * i as f32) / n as f32).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count_matches_centered_framing() {
        let stft = Stft::new(2048, 256);
        assert_eq!(stft.frame_count(0), 1);
        assert_eq!(stft.frame_count(44_100), 1 + 44_100 / 256);
        assert_eq!(stft.forward(&vec![0.0; 1000]).n_frames(), 1 + 1000 / 256);
    }

    #[test]
    fn test_sine_peaks_in_expected_bin() {
        let sample_rate = 8000.0;
        let n_fft = 256;
        let bin = 16;
        let freq = bin as f32 * sample_rate / n_fft as f32;
        let signal: Vec<f32> = (0..2048)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect();

        let stft = Stft::new(n_fft, 64);
        let mags = stft.forward(&signal).magnitudes();
        let middle = &mags[mags.len() / 2];
        let peak = middle
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, _)| k)
            .unwrap();
        assert_eq!(peak, bin);
    }

    #[test]
    fn test_inverse_reconstructs_signal() {
        let signal: Vec<f32> = (0..3000)
            .map(|i| ((i as f32 * 0.013).sin() + (i as f32 * 0.29).cos() * 0.3) * 0.5)
            .collect();
        let stft = Stft::new(512, 128);
        let rebuilt = stft.inverse(&stft.forward(&signal), signal.len());

        assert_eq!(rebuilt.len(), signal.len());
        let max_err = signal
            .iter()
            .zip(rebuilt.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_err < 1e-3, "reconstruction error {max_err}");
    }

    #[test]
    fn test_periodic_hann_endpoints() {
        let window = periodic_hann(8);
        assert_eq!(window[0], 0.0);
        assert!((window[4] - 1.0).abs() < 1e-6);
        assert!(window[7] > 0.0);
    }
}
