// ToleranceChecker - compare measured onset gaps with the expected ones
//
// Only the gaps are checked, never the absolute position of the first onset,
// so a constant render lead-in does not fail a clip.

use serde::Serialize;

use crate::analysis::chain::OnsetTriple;
use crate::analysis::clip_spec::ExpectedDeltas;

/// Outcome of checking one clip
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToleranceVerdict {
    pub measured_gap1: f64,
    pub measured_gap2: f64,
    pub error1: f64,
    pub error2: f64,
    pub passed: bool,
}

impl ToleranceVerdict {
    /// Larger of the two gap errors
    pub fn worst_error(&self) -> f64 {
        self.error1.max(self.error2)
    }
}

pub struct ToleranceChecker {
    tolerance_ms: f64,
}

impl ToleranceChecker {
    pub fn new(tolerance_ms: f64) -> Self {
        Self { tolerance_ms }
    }

    /// Errors equal to the tolerance pass
    pub fn check(&self, measured: &OnsetTriple, expected: &ExpectedDeltas) -> ToleranceVerdict {
        let (measured_gap1, measured_gap2) = measured.gaps();
        let error1 = (measured_gap1 - expected.first_gap_ms as f64).abs();
        let error2 = (measured_gap2 - expected.second_gap_ms as f64).abs();

        ToleranceVerdict {
            measured_gap1,
            measured_gap2,
            error1,
            error2,
            passed: error1 <= self.tolerance_ms && error2 <= self.tolerance_ms,
        }
    }
}

/// Running maximum of gap errors across a batch
///
/// Starts at 0 and never decreases; `merge` is associative and commutative
/// so partial accumulators can be combined in any order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WorstError(f64);

impl WorstError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold both gap errors of a verdict into the maximum
    pub fn fold(&mut self, verdict: &ToleranceVerdict) {
        self.0 = self.0.max(verdict.error1).max(verdict.error2);
    }

    pub fn merge(self, other: WorstError) -> WorstError {
        WorstError(self.0.max(other.0))
    }

    pub fn value_ms(&self) -> f64 {
        self.0
    }
}
