// WAV loading - decode, down-mix to mono, resample to the analysis rate
//
// Integer PCM is scaled to [-1, 1] by its full-scale value. Multi-channel
// files are averaged to mono. Files at another sample rate are resampled by
// linear interpolation.

use std::path::Path;

use crate::error::CheckError;

/// Decoded mono clip at the requested sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Sample rate stored in the file before resampling
    pub source_sample_rate: u32,
}

/// Load `path` as mono samples at `target_sample_rate`
///
/// # Errors
/// `CheckError::AudioLoad` when the file cannot be opened or decoded,
/// `CheckError::EmptyAudio` when it holds no samples.
pub fn load_mono(path: &Path, target_sample_rate: u32) -> Result<LoadedClip, CheckError> {
    let (interleaved, channels, source_sample_rate) = read_wav(path)?;
    let mono = downmix(&interleaved, channels);
    if mono.is_empty() {
        return Err(CheckError::EmptyAudio {
            path: path.to_path_buf(),
        });
    }

    let samples = if source_sample_rate == target_sample_rate {
        mono
    } else {
        tracing::debug!(
            "[Loader] Resampling {} from {} Hz to {} Hz",
            path.display(),
            source_sample_rate,
            target_sample_rate
        );
        resample_linear(&mono, source_sample_rate, target_sample_rate)
    };

    Ok(LoadedClip {
        samples,
        sample_rate: target_sample_rate,
        source_sample_rate,
    })
}

fn read_wav(path: &Path) -> Result<(Vec<f32>, u16, u32), CheckError> {
    let load_error = |reason: String| CheckError::AudioLoad {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader =
        hound::WavReader::open(path).map_err(|err| load_error(format!("failed to open: {err}")))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(load_error("zero channels".to_string()));
    }

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(|err| load_error(format!("error reading: {err}"))))
            .collect::<Result<Vec<f32>, _>>()?,
        hound::SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if !(1..=32).contains(&bits) {
                return Err(load_error(format!("unsupported bits_per_sample={bits}")));
            }
            let full_scale = ((1i64 << (bits - 1)) - 1).max(1) as f32;
            reader
                .samples::<i32>()
                .map(|sample| {
                    sample
                        .map(|value| value as f32 / full_scale)
                        .map_err(|err| load_error(format!("error reading: {err}")))
                })
                .collect::<Result<Vec<f32>, _>>()?
        }
    };

    Ok((samples, spec.channels, spec.sample_rate))
}

/// Average interleaved frames down to one channel
fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Linear-interpolation resampler; output length scales with the rate ratio
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() || from_rate == to_rate || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).round().max(1.0) as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = (pos.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64).clamp(0.0, 1.0) as f32;
            (1.0 - frac) * samples[idx] + frac * samples[next]
        })
        .collect()
}
