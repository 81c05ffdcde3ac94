// Onset timing analysis
//
// Per-clip pipeline, each stage a pure function of its inputs:
//
//   filename ──ClipSpec──> ExpectedDeltas ─────────────┐
//   samples ──EnvelopeExtractor──> OnsetEnvelope ──OnsetChain──> OnsetTriple
//                                                       │
//                                   ToleranceChecker <──┘──> ToleranceVerdict
//
// The envelope lives only for the duration of one `measure` call.

pub mod chain;
pub mod clip_spec;
pub mod envelope;
pub mod features;
pub mod onset;
pub mod tolerance;

pub use chain::{OnsetChain, OnsetTriple};
pub use clip_spec::{ClipSpec, ExpectedDeltas};
pub use envelope::{EnvelopeExtractor, OnsetEnvelope};
pub use onset::{locate, OnsetPick, WindowedOnsetLocator};
pub use tolerance::{ToleranceChecker, ToleranceVerdict, WorstError};

use serde::Serialize;

use crate::config::AppConfig;
use crate::error::CheckError;

/// Everything measured for one clip
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClipMeasurement {
    pub spec: ClipSpec,
    pub expected: ExpectedDeltas,
    pub onsets: OnsetTriple,
    pub verdict: ToleranceVerdict,
}

/// Extractor, chain and checker wired from one configuration
pub struct OnsetPipeline {
    extractor: EnvelopeExtractor,
    chain: OnsetChain,
    checker: ToleranceChecker,
    frame_rate: f64,
}

impl OnsetPipeline {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            extractor: EnvelopeExtractor::new(&config.analysis),
            chain: OnsetChain::new(&config.timing),
            checker: ToleranceChecker::new(config.timing.tolerance_ms),
            frame_rate: config.timing.frame_rate,
        }
    }

    /// Sample rate the pipeline expects its input at
    pub fn sample_rate(&self) -> u32 {
        self.extractor.config().sample_rate
    }

    /// Locate the three onsets in `samples`
    pub fn measure(
        &self,
        samples: &[f32],
        expected: &ExpectedDeltas,
    ) -> Result<OnsetTriple, CheckError> {
        let envelope = self.extractor.extract(samples)?;
        Ok(self.chain.chain(&envelope, expected))
    }

    /// Measure `samples` and judge them against the clip's expected gaps
    pub fn check(&self, samples: &[f32], spec: ClipSpec) -> Result<ClipMeasurement, CheckError> {
        let expected = spec.expected_deltas(self.frame_rate);
        let onsets = self.measure(samples, &expected)?;
        let verdict = self.checker.check(&onsets, &expected);

        Ok(ClipMeasurement {
            spec,
            expected,
            onsets,
            verdict,
        })
    }
}
