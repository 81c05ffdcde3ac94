// Spectral building blocks for the onset envelope
//
// - fft: centered STFT and overlap-add inverse
// - hpss: median-filter harmonic/percussive separation
// - mel: Slaney mel filterbank and dB conversion

pub mod fft;
pub mod hpss;
pub mod mel;

pub use fft::{Spectrogram, Stft};
pub use hpss::HpssSeparator;
pub use mel::{power_to_db, MelFilterbank};
