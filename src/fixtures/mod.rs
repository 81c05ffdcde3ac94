//! Deterministic synthetic clips for tests and the `synth` CLI command.
//!
//! A click track is a set of identical noise bursts, optionally each followed
//! by a decaying sine that stands in for a piano-like sustain. Noise comes
//! from a seeded generator so the same spec always renders the same samples.

use std::f32::consts::PI;
use std::path::Path;

use anyhow::{Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::analysis::ClipSpec;

/// Decaying sine started at every onset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    pub frequency_hz: f32,
    pub amplitude: f32,
    pub decay_ms: f32,
}

impl Default for ToneSpec {
    fn default() -> Self {
        Self {
            frequency_hz: 220.0,
            amplitude: 0.3,
            decay_ms: 150.0,
        }
    }
}

/// Description of a synthetic click track
#[derive(Debug, Clone, PartialEq)]
pub struct ClickTrack {
    pub sample_rate: u32,
    pub onsets_ms: Vec<f64>,
    /// Silence kept after the last onset
    pub tail_ms: f64,
    pub click_amplitude: f32,
    pub click_decay_ms: f32,
    pub tone: Option<ToneSpec>,
    pub seed: u64,
}

impl ClickTrack {
    pub fn new(sample_rate: u32, onsets_ms: Vec<f64>) -> Self {
        Self {
            sample_rate,
            onsets_ms,
            tail_ms: 600.0,
            click_amplitude: 0.8,
            click_decay_ms: 4.0,
            tone: None,
            seed: 0x5A5A_FFF0,
        }
    }

    /// Three clicks at the exact frame positions a correct render would use
    pub fn for_clip(spec: ClipSpec, frame_rate: f64, lead_in_ms: f64, sample_rate: u32) -> Self {
        let frame_ms = 1000.0 / frame_rate;
        let onsets = vec![
            lead_in_ms,
            lead_in_ms + spec.beat_frames as f64 * frame_ms,
            lead_in_ms + spec.total_frames() as f64 * frame_ms,
        ];
        Self::new(sample_rate, onsets)
    }

    pub fn with_tone(mut self, tone: ToneSpec) -> Self {
        self.tone = Some(tone);
        self
    }

    /// Render the track to mono samples
    pub fn render(&self) -> Vec<f32> {
        let last = self.onsets_ms.iter().copied().fold(0.0f64, f64::max);
        let mut samples = vec![0.0f32; self.ms_to_samples(last + self.tail_ms)];
        let click = self.click_template();

        for &onset_ms in &self.onsets_ms {
            let start = self.ms_to_samples(onset_ms);
            for (sample, value) in samples.iter_mut().skip(start).zip(click.iter()) {
                *sample += value;
            }

            if let Some(tone) = self.tone {
                let decay = tone.decay_ms / 1000.0 * self.sample_rate as f32;
                for (i, sample) in samples.iter_mut().skip(start).enumerate() {
                    let envelope = tone.amplitude * (-(i as f32) / decay).exp();
                    if envelope < 1e-4 {
                        break;
                    }
                    let phase = 2.0 * PI * tone.frequency_hz * i as f32 / self.sample_rate as f32;
                    *sample += envelope * phase.sin();
                }
            }
        }

        samples
    }

    /// One exponentially decaying noise burst, shared by every onset
    fn click_template(&self) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let decay = self.click_decay_ms / 1000.0 * self.sample_rate as f32;
        let len = (decay * 5.0).ceil().max(1.0) as usize;
        (0..len)
            .map(|i| {
                let noise: f32 = rng.gen_range(-1.0..1.0);
                noise * self.click_amplitude * (-(i as f32) / decay).exp()
            })
            .collect()
    }

    fn ms_to_samples(&self, ms: f64) -> usize {
        (ms / 1000.0 * self.sample_rate as f64).round().max(0.0) as usize
    }
}

/// Write mono samples as a 32-bit float WAV file
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating {}", path.display()))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    writer
        .finalize()
        .with_context(|| format!("finalizing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_clip_places_onsets_on_frames() {
        let spec = ClipSpec::parse("clip_12_18.wav").unwrap();
        let track = ClickTrack::for_clip(spec, 30.0, 35.0, 44_100);
        assert_eq!(track.onsets_ms.len(), 3);
        assert!((track.onsets_ms[1] - 435.0).abs() < 1e-9);
        assert!((track.onsets_ms[2] - 1035.0).abs() < 1e-9);
    }

    #[test]
    fn test_render_is_deterministic() {
        let track = ClickTrack::new(44_100, vec![35.0, 435.0]).with_tone(ToneSpec::default());
        assert_eq!(track.render(), track.render());
    }

    #[test]
    fn test_render_is_silent_before_first_click() {
        let track = ClickTrack::new(44_100, vec![100.0, 300.0]);
        let samples = track.render();
        assert_eq!(samples.len(), (0.9 * 44_100.0f64).round() as usize);
        assert!(samples[..4_410].iter().all(|s| *s == 0.0));
        assert!(samples[4_410..4_500].iter().any(|s| s.abs() > 0.1));
    }

    #[test]
    fn test_write_wav_creates_readable_file() {
        let path = std::env::temp_dir().join(format!(
            "cycle_check_fixture_{}_2_3.wav",
            std::process::id()
        ));
        let samples = ClickTrack::new(22_050, vec![10.0]).render();
        write_wav(&path, &samples, 22_050).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 22_050);
        assert_eq!(reader.len() as usize, samples.len());
        let _ = std::fs::remove_file(&path);
    }
}
