// Audio input for the checker: WAV decoding only, no playback or capture

pub mod loader;

pub use loader::{load_mono, resample_linear, LoadedClip};
