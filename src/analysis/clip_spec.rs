// ClipSpec - frame counts encoded in clip filenames
//
// Rendered clips are named `<anything>_<beat>_<decay>.wav`, where `beat` and
// `decay` are frame counts at the clip frame rate. The three onsets of a clip
// sit at 0, `beat` and `beat + decay` frames after the first onset.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

use crate::error::CheckError;

static CLIP_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"_(\d+)_(\d+)\.wav$").expect("clip filename pattern is a valid regex")
});

/// Beat and decay frame counts of one clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClipSpec {
    pub beat_frames: u32,
    pub decay_frames: u32,
}

/// Expected gaps between the three onsets of a clip, in whole milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExpectedDeltas {
    pub first_gap_ms: i64,
    pub second_gap_ms: i64,
}

impl ClipSpec {
    /// Parse the clip spec from a path or bare filename
    ///
    /// # Errors
    /// `CheckError::MalformedInput` when the name does not end in
    /// `_<digits>_<digits>.wav`, a count overflows `u32`, or both counts are zero.
    pub fn parse<P: AsRef<Path>>(path: P) -> Result<Self, CheckError> {
        let path = path.as_ref();
        let malformed = || CheckError::MalformedInput {
            path: path.to_path_buf(),
        };

        let name = path.to_string_lossy();
        let caps = CLIP_NAME_RE.captures(&name).ok_or_else(malformed)?;
        let beat_frames: u32 = caps[1].parse().map_err(|_| malformed())?;
        let decay_frames: u32 = caps[2].parse().map_err(|_| malformed())?;

        if beat_frames == 0 && decay_frames == 0 {
            return Err(malformed());
        }

        Ok(Self {
            beat_frames,
            decay_frames,
        })
    }

    pub fn total_frames(&self) -> u64 {
        self.beat_frames as u64 + self.decay_frames as u64
    }

    /// Derive the expected onset gaps at `frame_rate` frames per second
    ///
    /// The total is rounded first and the first gap is rounded against it; the
    /// second gap is the remainder, so the two always sum to the rounded total.
    pub fn expected_deltas(&self, frame_rate: f64) -> ExpectedDeltas {
        let total = self.total_frames() as f64;
        let total_ms = (total / frame_rate * 1000.0).round() as i64;
        let first_gap_ms = (self.beat_frames as f64 / total * total_ms as f64).round() as i64;

        ExpectedDeltas {
            first_gap_ms,
            second_gap_ms: total_ms - first_gap_ms,
        }
    }
}

impl ExpectedDeltas {
    pub fn total_ms(&self) -> i64 {
        self.first_gap_ms + self.second_gap_ms
    }
}
