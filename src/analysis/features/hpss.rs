// HPSS module - harmonic/percussive source separation
//
// Median filtering a magnitude spectrogram along time keeps sustained tonal
// energy (harmonic); filtering along frequency keeps broadband transients
// (percussive). A soft mask built from the two estimates is applied to the
// complex STFT and inverted back to a time-domain percussive signal.
//
// References:
// - Fitzgerald, D. (2010). Harmonic/percussive separation using median filtering
// - Driedger, J., Müller, M., Disch, S. (2014). Extending harmonic-percussive
//   separation of audio signals

use super::fft::{Spectrogram, Stft};

/// Median-filter harmonic/percussive separator
pub struct HpssSeparator {
    kernel_size: usize,
    power: f32,
    margin: f32,
}

impl HpssSeparator {
    /// # Arguments
    /// * `kernel_size` - Median filter length, in frames (harmonic) and bins (percussive)
    /// * `power` - Soft mask exponent
    /// * `margin` - Weight on the harmonic estimate when building the percussive mask
    pub fn new(kernel_size: usize, power: f32, margin: f32) -> Self {
        Self {
            kernel_size: kernel_size.max(1),
            power,
            margin,
        }
    }

    /// Percussive soft mask for a magnitude spectrogram (`mags[t][k]`)
    pub fn percussive_mask(&self, mags: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let harmonic = median_filter_time(mags, self.kernel_size);
        let percussive = median_filter_freq(mags, self.kernel_size);

        percussive
            .iter()
            .zip(harmonic.iter())
            .map(|(p_frame, h_frame)| {
                p_frame
                    .iter()
                    .zip(h_frame.iter())
                    .map(|(&p, &h)| soft_mask(p, h * self.margin, self.power))
                    .collect()
            })
            .collect()
    }

    /// Percussive component of `spectrogram`, still in the STFT domain
    pub fn percussive_spectrogram(&self, spectrogram: &Spectrogram) -> Spectrogram {
        let mask = self.percussive_mask(&spectrogram.magnitudes());
        let frames = spectrogram
            .frames
            .iter()
            .zip(mask.iter())
            .map(|(frame, m)| frame.iter().zip(m.iter()).map(|(c, &w)| c * w).collect())
            .collect();

        Spectrogram {
            frames,
            n_bins: spectrogram.n_bins,
        }
    }

    /// Time-domain percussive component of `signal`
    pub fn percussive(&self, stft: &Stft, signal: &[f32]) -> Vec<f32> {
        let spectrogram = stft.forward(signal);
        let percussive = self.percussive_spectrogram(&spectrogram);
        stft.inverse(&percussive, signal.len())
    }
}

/// `x^p / (x^p + reference^p)`, zero where both inputs vanish
fn soft_mask(x: f32, reference: f32, power: f32) -> f32 {
    let z = x.max(reference);
    if z < f32::MIN_POSITIVE {
        return 0.0;
    }
    let mask = (x / z).powf(power);
    let ref_mask = (reference / z).powf(power);
    mask / (mask + ref_mask)
}

/// Reflect an out-of-range index back into `0..n` (edge sample repeated)
fn reflect_index(i: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = i.rem_euclid(period) as usize;
    if m < n {
        m
    } else {
        2 * n - 1 - m
    }
}

/// Median of `values`; the upper median for even lengths
fn median_in_place(values: &mut [f32]) -> f32 {
    let mid = values.len() / 2;
    let (_, median, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    *median
}

/// Median of a sliding window centered on each index of `line`
fn median_filter_line(line: &[f32], size: usize, out: &mut [f32], window: &mut Vec<f32>) {
    let n = line.len();
    let half = (size / 2) as isize;
    for (i, slot) in out.iter_mut().enumerate() {
        window.clear();
        let start = i as isize - half;
        window.extend((0..size as isize).map(|offset| line[reflect_index(start + offset, n)]));
        *slot = median_in_place(window);
    }
}

/// Median filter each frequency bin across time
fn median_filter_time(mags: &[Vec<f32>], size: usize) -> Vec<Vec<f32>> {
    let n_frames = mags.len();
    let n_bins = mags.first().map_or(0, Vec::len);
    let mut out = vec![vec![0.0f32; n_bins]; n_frames];
    let mut line = vec![0.0f32; n_frames];
    let mut filtered = vec![0.0f32; n_frames];
    let mut window = Vec::with_capacity(size);

    for k in 0..n_bins {
        for (t, frame) in mags.iter().enumerate() {
            line[t] = frame[k];
        }
        median_filter_line(&line, size, &mut filtered, &mut window);
        for (t, value) in filtered.iter().enumerate() {
            out[t][k] = *value;
        }
    }
    out
}

/// Median filter each frame across frequency
fn median_filter_freq(mags: &[Vec<f32>], size: usize) -> Vec<Vec<f32>> {
    let mut window = Vec::with_capacity(size);
    mags.iter()
        .map(|frame| {
            let mut filtered = vec![0.0f32; frame.len()];
            median_filter_line(frame, size, &mut filtered, &mut window);
            filtered
        })
        .collect()
}
