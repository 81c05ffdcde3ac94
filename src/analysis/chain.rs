// OnsetChain - three windowed searches anchored on the previous onset
//
// The first onset is searched in a wide window around the expected render
// lead-in. Each later search is centered on the previous measured onset plus
// the expected gap, which absorbs small render jitter without letting the
// search drift onto a neighbouring hit.

use serde::Serialize;

use crate::analysis::clip_spec::ExpectedDeltas;
use crate::analysis::envelope::OnsetEnvelope;
use crate::analysis::onset::WindowedOnsetLocator;
use crate::config::TimingConfig;

/// Measured onset times of one clip, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OnsetTriple {
    pub t1: f64,
    pub t2: f64,
    pub t3: f64,
}

impl OnsetTriple {
    /// Measured (first, second) gaps in milliseconds
    pub fn gaps(&self) -> (f64, f64) {
        (self.t2 - self.t1, self.t3 - self.t2)
    }
}

/// One step of the search: where to look relative to the previous onset
#[derive(Debug, Clone, Copy, PartialEq)]
enum SearchAnchor {
    /// Absolute center, used for the first onset
    Absolute(f64),
    /// Offset from the previously measured onset
    AfterPrevious(f64),
}

pub struct OnsetChain {
    timing: TimingConfig,
}

impl OnsetChain {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            timing: timing.clone(),
        }
    }

    /// Locate the three onsets of a clip with the given expected gaps
    pub fn chain(&self, envelope: &OnsetEnvelope, expected: &ExpectedDeltas) -> OnsetTriple {
        let locator = WindowedOnsetLocator::new(envelope);
        let steps = [
            (
                SearchAnchor::Absolute(self.timing.first_onset_center_ms),
                self.timing.first_search_half_width_ms,
            ),
            (
                SearchAnchor::AfterPrevious(expected.first_gap_ms as f64),
                self.timing.search_half_width_ms,
            ),
            (
                SearchAnchor::AfterPrevious(expected.second_gap_ms as f64),
                self.timing.search_half_width_ms,
            ),
        ];

        let mut onsets = [0.0f64; 3];
        for (i, (anchor, half_width)) in steps.into_iter().enumerate() {
            let center = match anchor {
                SearchAnchor::Absolute(center) => center,
                SearchAnchor::AfterPrevious(gap) => onsets[i - 1] + gap,
            };
            let pick = locator.pick(center, half_width);
            tracing::debug!(
                "[Chain] onset {} at {:.1} ms (window {:.1} +/- {:.1} ms, in_window={})",
                i + 1,
                pick.time_ms,
                center,
                half_width,
                pick.in_window
            );
            onsets[i] = pick.time_ms;
        }

        OnsetTriple {
            t1: onsets[0],
            t2: onsets[1],
            t3: onsets[2],
        }
    }
}
